//! Byte-stream transports to the servo hand.

use std::fmt;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};

use finger_pose::AngleVector;
use tracing::{debug, info, warn};

use crate::wire::encode_line;
use crate::LinkError;

// ════════════════════════════════════════════════════════════════════════════
// Transport trait
// ════════════════════════════════════════════════════════════════════════════

/// Ordered, reliable sink for encoded frames.
///
/// `send` blocks until the bytes are handed to the OS (or fails).
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Human-readable peer description for logs.
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> { (**self).send(bytes) }
    fn describe(&self) -> String { (**self).describe() }
}

/// Encode one frame and send it as a `\n`-terminated line.
///
/// Returns the line (without terminator) for logging.
pub fn send_angles<T: Transport + ?Sized>(
    transport: &mut T,
    angles:    &AngleVector,
) -> Result<String, LinkError> {
    let line = encode_line(angles);
    let mut bytes = Vec::with_capacity(line.len() + 1);
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    transport.send(&bytes)?;
    Ok(line)
}

// ── TCP backend ───────────────────────────────────────────────────────────

/// A single persistent TCP connection, opened once.
pub struct TcpTransport {
    stream: TcpStream,
    peer:   String,
}

impl TcpTransport {
    /// Connect to the peer.  No retry; a failure here is for the caller to
    /// handle.
    pub fn connect<A: ToSocketAddrs + fmt::Display>(addr: A) -> Result<Self, LinkError> {
        let peer = addr.to_string();
        let stream = TcpStream::connect(&addr)
            .map_err(|source| LinkError::Connect { addr: peer.clone(), source })?;

        // One short line per frame; don't let Nagle batch them.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, "could not disable Nagle: {}", e);
        }

        info!(peer = %peer, "connected");
        Ok(TcpTransport { stream, peer })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn describe(&self) -> String { format!("tcp://{}", self.peer) }
}

// ── null backend (dry run) ────────────────────────────────────────────────

/// Accepts and discards everything.
#[derive(Debug, Default)]
pub struct NullTransport {
    sent: u64,
}

impl NullTransport {
    pub fn new() -> Self { NullTransport::default() }

    /// Number of frames swallowed so far.
    pub fn sent(&self) -> u64 { self.sent }
}

impl Transport for NullTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.sent += 1;
        debug!(bytes = bytes.len(), "null transport dropped frame");
        Ok(())
    }

    fn describe(&self) -> String { "null (dry run)".to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decode_line;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn null_transport_counts_frames() {
        let mut t = NullTransport::new();
        send_angles(&mut t, &[1.0; 5]).unwrap();
        send_angles(&mut t, &[2.0; 5]).unwrap();
        assert_eq!(t.sent(), 2);
    }

    #[test]
    fn boxed_transport_forwards() {
        let mut t: Box<dyn Transport> = Box::new(NullTransport::new());
        let line = send_angles(&mut t, &[900.4, 2100.0, 2000.0, 2100.0, 1600.0]).unwrap();
        assert_eq!(line, "900 2100 2000 2100 1600");
        assert!(t.describe().contains("null"));
    }

    #[test]
    fn tcp_lines_arrive_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            BufReader::new(sock)
                .lines()
                .map(|l| decode_line(&l.unwrap()).unwrap())
                .collect::<Vec<_>>()
        });

        {
            let mut t = TcpTransport::connect(addr).unwrap();
            send_angles(&mut t, &[900.0, 2075.0, 1950.0, 1080.0, 520.0]).unwrap();
            send_angles(&mut t, &[1000.0, 2000.0, 1900.0, 1100.0, 600.0]).unwrap();
            assert!(t.describe().starts_with("tcp://127.0.0.1:"));
        }

        let got = reader.join().unwrap();
        assert_eq!(got, vec![
            [900, 2075, 1950, 1080, 520],
            [1000, 2000, 1900, 1100, 600],
        ]);
    }

    #[test]
    fn connect_failure_names_the_peer() {
        // Bind then drop to get a port with nothing listening.
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        match TcpTransport::connect(addr) {
            Err(LinkError::Connect { addr: a, .. }) => assert_eq!(a, addr.to_string()),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
