//! hand_servo — command-line entry point.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use finger_link::{NullTransport, TcpTransport, Transport};
use hand_servo::config::ServoConfig;
use hand_servo::control::{measure_pose, ControlLoop};
use hand_servo::source::{HandSource, JsonLinesSource, SimHandSource};
use hand_servo::visualizer::Visualizer;
use tracing::{info, warn};

/// Frame size reported by the simulated hand.
const SIM_WIDTH:  u32 = 640;
const SIM_HEIGHT: u32 = 480;

#[derive(Parser, Debug)]
#[command(name = "hand_servo")]
#[command(about = "Stream calibrated finger angles from hand landmarks to a servo hand")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the control loop.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Don't connect; log the lines instead of sending them.
        #[arg(long)]
        dry_run: bool,

        /// Don't open the debug window.
        #[arg(long)]
        no_window: bool,

        /// Stop after this many frames (at least 1).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_frames: Option<u64>,
    },

    /// Average a held pose into a calibration vector (printed as JSON).
    Measure {
        #[command(flatten)]
        common: CommonArgs,

        /// Frames with a visible hand to average over (at least 1).
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        frames: u64,
    },

    /// Print the effective configuration as JSON.
    ShowConfig {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Synthetic hand.
    Sim,
    /// JSON lines from `--input`.
    Json,
    /// JSON lines from standard input.
    Stdin,
    /// LeapMotion controller (requires the `leap` feature).
    Leap,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON config file; missing fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where landmarks come from.
    #[arg(short, long, value_enum, default_value_t = SourceKind::Sim)]
    source: SourceKind,

    /// Landmark file for `--source json`.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Simulated camera frame rate (0 = unpaced).
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Simulated wrist → index-MCP distance in pixels.
    #[arg(long, default_value_t = 100.0)]
    sim_palm: f64,

    /// Simulated frames per open → closed → open cycle.
    #[arg(long, default_value_t = 90)]
    sim_period: u32,

    /// Hide the simulated hand for LEN frames out of every EVERY.
    #[arg(long, num_args = 2, value_names = ["EVERY", "LEN"])]
    sim_dropout: Option<Vec<u64>>,

    /// Override the peer address (`host:port`).
    #[arg(long)]
    peer: Option<String>,

    /// Override the dead-band.
    #[arg(long)]
    deadband: Option<f64>,

    /// Override the per-frame step cap.
    #[arg(long)]
    max_step: Option<f64>,
}

impl CommonArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn config(&self) -> Result<ServoConfig> {
        let mut cfg = match &self.config {
            Some(path) => ServoConfig::load(path)?,
            None       => ServoConfig::default(),
        };
        if let Some(peer) = &self.peer   { cfg.peer = peer.clone(); }
        if let Some(v) = self.deadband   { cfg.deadband = v; }
        if let Some(v) = self.max_step   { cfg.max_step = v; }
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    fn open_source(&self, cfg: &ServoConfig) -> Result<Box<dyn HandSource>> {
        let max_hands = cfg.effective_max_hands();
        let source: Box<dyn HandSource> = match self.source {
            SourceKind::Sim => {
                let mut sim = SimHandSource::new(SIM_WIDTH, SIM_HEIGHT)
                    .fps(self.fps)
                    .palm_px(self.sim_palm)
                    .period(self.sim_period);
                if let Some([every, len]) = self.sim_dropout.as_deref().and_then(|v| <[u64; 2]>::try_from(v).ok()) {
                    sim = sim.dropout(every, len);
                }
                Box::new(sim)
            }
            SourceKind::Json => {
                let path = self.input.as_ref().context("--source json needs --input <file>")?;
                let src = JsonLinesSource::open(path)
                    .with_context(|| format!("opening landmarks {}", path.display()))?;
                Box::new(src.max_hands(max_hands).min_score(cfg.detection_confidence))
            }
            SourceKind::Stdin => Box::new(
                JsonLinesSource::stdin()
                    .max_hands(max_hands)
                    .min_score(cfg.detection_confidence),
            ),
            SourceKind::Leap => open_leap(max_hands)?,
        };
        Ok(source)
    }
}

#[cfg(feature = "leap")]
fn open_leap(max_hands: usize) -> Result<Box<dyn HandSource>> {
    let src = hand_servo::source::LeapHandSource::open(SIM_WIDTH, SIM_HEIGHT, max_hands)
        .context("opening LeapMotion controller")?;
    Ok(Box::new(src))
}

#[cfg(not(feature = "leap"))]
fn open_leap(_max_hands: usize) -> Result<Box<dyn HandSource>> {
    bail!("this build has no LeapMotion support; rebuild with --features leap")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run { common, dry_run, no_window, max_frames } => {
            run(&common, dry_run, no_window, max_frames)
        }
        Command::Measure { common, frames } => measure(&common, frames),
        Command::ShowConfig { common } => {
            let cfg = common.config()?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(())
        }
    }
}

fn run(common: &CommonArgs, dry_run: bool, no_window: bool, max_frames: Option<u64>) -> Result<()> {
    let cfg = common.config()?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          hand_servo — landmarks → finger servo angles        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Source:  {:?}", common.source);
    println!("  Peer:    {}", if dry_run { "(dry run)" } else { cfg.peer.as_str() });
    println!("  Smooth:  deadband {}  max step {}", cfg.deadband, cfg.max_step);
    println!();

    let source = common.open_source(&cfg)?;
    let transport: Box<dyn Transport> = if dry_run {
        Box::new(NullTransport::new())
    } else {
        Box::new(TcpTransport::connect(cfg.peer.as_str()).context("connecting to servo hand")?)
    };

    let mut window = if no_window {
        None
    } else {
        match Visualizer::new() {
            Ok(v)  => Some(v),
            Err(e) => { warn!("no window ({}); running headless", e); None }
        }
    };

    let mut control = ControlLoop::from_config(source, transport, &cfg);
    let intervals = cfg.intervals;

    let frames = control.run(|report| {
        if let Some(vis) = window.as_mut() {
            vis.render(report, &intervals);
            if !vis.is_open() || vis.wants_quit() {
                info!("window closed");
                return false;
            }
        }
        max_frames.map_or(true, |max| report.frame < max)
    })?;

    info!(frames, "done");
    Ok(())
}

fn measure(common: &CommonArgs, frames: u64) -> Result<()> {
    let frames = usize::try_from(frames).context("--frames is too large")?;
    let cfg = common.config()?;
    let mut source = common.open_source(&cfg)?;

    info!(frames, source = %source.describe(), "hold the pose steady");
    match measure_pose(&mut source, frames, cfg.hand_index)? {
        Some(vector) => {
            println!("{}", serde_json::to_string(&vector)?);
            Ok(())
        }
        None => bail!("no measurable hand seen before the source ended"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(args: &[&str]) -> CommonArgs {
        let argv = ["hand_servo", "show-config"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::ShowConfig { common } => common,
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn zero_frame_counts_are_rejected() {
        assert!(Cli::try_parse_from(["hand_servo", "run", "--max-frames", "0"]).is_err());
        assert!(Cli::try_parse_from(["hand_servo", "measure", "--frames", "0"]).is_err());
        assert!(Cli::try_parse_from(["hand_servo", "run", "--max-frames", "1"]).is_ok());
    }

    #[test]
    fn sim_flags_shape_the_simulated_hand() {
        let args = common(&["--fps", "0", "--sim-palm", "150", "--sim-dropout", "3", "1"]);
        let cfg = args.config().unwrap();
        let mut src = args.open_source(&cfg).unwrap();

        assert!(src.next_frame().unwrap().unwrap().hands.is_empty());
        let hand = src.next_frame().unwrap().unwrap().hand(0);
        assert!((hand.length_between(0, 5) - 150.0).abs() <= 1.0);
        assert!(src.describe().contains("palm 150px"));
    }

    #[test]
    fn flags_override_config() {
        let cfg = common(&["--peer", "10.1.2.3:9000", "--max-step", "40"]).config().unwrap();
        assert_eq!(cfg.peer, "10.1.2.3:9000");
        assert_eq!(cfg.max_step, 40.0);
    }

    #[test]
    fn json_source_needs_input() {
        let args = common(&["--source", "json"]);
        let cfg = args.config().unwrap();
        assert!(args.open_source(&cfg).is_err());
    }
}
