//! # finger_link
//!
//! Carries finger angle vectors to a servo hand over a byte stream.
//!
//! ## Wire format
//!
//! One UTF‑8 line per frame: five space-separated integers, thumb first, each
//! angle truncated toward zero, terminated by `\n`:
//!
//! ```text
//! 900 2075 1950 1080 520
//! ```
//!
//! Nothing is read back from the peer.
//!
//! ## Transports
//!
//! | Type | Use |
//! |---|---|
//! | [`TcpTransport`] | persistent connection to the actuator |
//! | [`NullTransport`] | dry runs; drops every line |
//!
//! The `angle_sink` binary is a reference peer that listens for a sender and
//! logs each decoded vector.

use std::io;

pub mod transport;
pub mod wire;

pub use transport::{send_angles, NullTransport, TcpTransport, Transport};
pub use wire::{decode_line, encode_line, to_wire, WireAngles};

/// Errors raised while talking to the peer.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("send failed: {0}")]
    Send(#[from] io::Error),

    #[error("malformed angle line {line:?}: {reason}")]
    Decode { line: String, reason: String },
}
