//! angle_sink — stand-in for the servo hand.
//!
//! Listens for a sender, decodes each angle line and logs it.  Useful for
//! checking a rig end to end before the real actuator is attached.

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result};
use clap::Parser;
use finger_link::decode_line;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "angle_sink")]
#[command(about = "Receive and log finger angle lines from hand_servo")]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Exit after the first sender disconnects.
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("binding {}", args.listen))?;
    info!(addr = %args.listen, "waiting for sender");

    for conn in listener.incoming() {
        let stream = match conn {
            Ok(s)  => s,
            Err(e) => { warn!("accept failed: {}", e); continue; }
        };
        let frames = serve(stream);
        info!(frames, "sender disconnected");
        if args.once { break; }
    }
    Ok(())
}

/// Log every line from one sender until it hangs up.  Returns the number of
/// well-formed frames received.
fn serve(stream: TcpStream) -> u64 {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "?".into());
    info!(peer = %peer, "sender connected");

    let mut frames = 0u64;
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(l)  => l,
            Err(e) => { warn!(peer = %peer, "read failed: {}", e); break; }
        };
        match decode_line(&line) {
            Ok([thumb, index, middle, ring, pinky]) => {
                frames += 1;
                info!(frame = frames, thumb, index, middle, ring, pinky, "angles");
            }
            Err(e) => warn!(peer = %peer, "{}", e),
        }
    }
    frames
}
