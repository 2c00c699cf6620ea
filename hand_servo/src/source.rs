//! Landmark sources: where each frame's hands come from.
//!
//! The control loop pulls one [`HandFrame`] at a time through the
//! [`HandSource`] trait and doesn't care whether it came from the simulator,
//! a recorded/piped detector stream, or LeapMotion hardware.
//!
//! | Source | Ends? | Blocks |
//! |---|---|---|
//! | [`SimHandSource`] | never | one frame interval |
//! | [`JsonLinesSource`] | at end of input | until a line arrives |
//! | `LeapHandSource` (feature `leap`) | never | until a tracking event |

use std::f64::consts::TAU;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use finger_pose::{LandmarkSnapshot, LANDMARK_COUNT};
use serde::Deserialize;
use tracing::{debug, warn};

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the detector saw in one video frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandFrame {
    pub width:  u32,
    pub height: u32,
    /// One snapshot per detected hand, in detector order.
    pub hands:  Vec<LandmarkSnapshot>,
}

impl HandFrame {
    /// Snapshot of hand `index`, or an empty snapshot when it wasn't seen.
    pub fn hand(&self, index: usize) -> LandmarkSnapshot {
        self.hands.get(index).cloned().unwrap_or_default()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("reading landmark stream: {0}")]
    Io(#[from] io::Error),

    #[error("landmark stream line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("hand tracking device: {0}")]
    Device(String),
}

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Blocking, pull-based supply of frames.
pub trait HandSource {
    /// Wait for the next frame.  `Ok(None)` means the source has run out.
    fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

impl<S: HandSource + ?Sized> HandSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError> { (**self).next_frame() }
    fn describe(&self) -> String { (**self).describe() }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: synthetic hand, always available
// ════════════════════════════════════════════════════════════════════════════

/// Per finger: `(distance / palm, angle from vertical)` of the first joint
/// after the wrist.  The index MCP sits at exactly one palm length.
const BASE_JOINTS: [(f64, f64); 5] = [
    (0.35, -0.75),
    (1.00, -0.25),
    (0.97, -0.05),
    (0.92,  0.13),
    (0.85,  0.30),
];

/// Wrist → tip distance (in palm lengths) for a fully curled finger.
const TIP_CLOSED: [f64; 5] = [0.52, 0.80, 0.62, 0.60, 0.70];
/// Wrist → tip distance (in palm lengths) for a fully extended finger.
const TIP_OPEN:   [f64; 5] = [1.45, 2.05, 2.10, 2.00, 1.75];
/// Phase offset of each finger's open/close cycle, in cycles.
const PHASE:      [f64; 5] = [0.0, 0.1, 0.2, 0.3, 0.4];

/// A synthetic right hand, palm toward the camera, whose fingers open and
/// close on staggered cycles.
///
/// The hand optionally drops out for a few frames at a fixed cadence so the
/// "no hand" path gets exercised too.
pub struct SimHandSource {
    width:          u32,
    height:         u32,
    palm_px:        f64,
    period_frames:  f64,
    frame_interval: Option<Duration>,
    dropout:        Option<(u64, u64)>,
    frame:          u64,
}

impl SimHandSource {
    pub fn new(width: u32, height: u32) -> Self {
        SimHandSource {
            width,
            height,
            palm_px:        100.0,
            period_frames:  90.0,
            frame_interval: None,
            dropout:        None,
            frame:          0,
        }
    }

    /// Wrist → index-MCP distance in pixels.
    pub fn palm_px(mut self, px: f64) -> Self { self.palm_px = px; self }

    /// Frames per full open → closed → open cycle.
    pub fn period(mut self, frames: u32) -> Self { self.period_frames = frames.max(1) as f64; self }

    /// Pace frames like a camera at `fps`; 0 means as fast as possible.
    pub fn fps(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        self
    }

    /// Hide the hand for `len` frames out of every `every`.
    pub fn dropout(mut self, every: u64, len: u64) -> Self {
        self.dropout = (every > 0 && len > 0).then_some((every, len.min(every)));
        self
    }

    /// Extension of finger `i` at frame `n`: 0 = curled, 1 = straight.
    fn extension(&self, i: usize, n: u64) -> f64 {
        let cycles = n as f64 / self.period_frames + PHASE[i];
        0.5 - 0.5 * (TAU * cycles).cos()
    }

    fn hand_at(&self, n: u64) -> LandmarkSnapshot {
        let wrist = (self.width as f64 / 2.0, self.height as f64 * 0.85);
        let at = |dist: f64, angle: f64| -> (f64, f64) {
            (wrist.0 + dist * angle.sin(), wrist.1 - dist * angle.cos())
        };

        let mut pts = [(0i32, 0i32); LANDMARK_COUNT];
        pts[0] = (wrist.0.round() as i32, wrist.1.round() as i32);

        for i in 0..5 {
            let (base_f, angle) = BASE_JOINTS[i];
            let ext = self.extension(i, n);
            let tip_f = TIP_CLOSED[i] + (TIP_OPEN[i] - TIP_CLOSED[i]) * ext;

            let base = at(base_f * self.palm_px, angle);
            let tip  = at(tip_f * self.palm_px, angle);
            for k in 0..4 {
                let t = k as f64 / 3.0;
                let x = base.0 + (tip.0 - base.0) * t;
                let y = base.1 + (tip.1 - base.1) * t;
                pts[1 + i * 4 + k] = (x.round() as i32, y.round() as i32);
            }
        }
        LandmarkSnapshot::from_points(&pts)
    }

    fn hand_visible(&self, n: u64) -> bool {
        match self.dropout {
            Some((every, len)) => n % every >= len,
            None => true,
        }
    }
}

impl HandSource for SimHandSource {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError> {
        if let Some(dt) = self.frame_interval {
            thread::sleep(dt);
        }
        let n = self.frame;
        self.frame += 1;

        let hands = if self.hand_visible(n) { vec![self.hand_at(n)] } else { Vec::new() };
        Ok(Some(HandFrame { width: self.width, height: self.height, hands }))
    }

    fn describe(&self) -> String {
        format!("simulated hand ({}x{}, palm {:.0}px)", self.width, self.height, self.palm_px)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource: detector output, one JSON object per line
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct PointJson {
    x: f64,
    y: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default = "full_score")]
    score:     f32,
    landmarks: Vec<PointJson>,
}

fn full_score() -> f32 { 1.0 }

#[derive(Deserialize, Debug)]
struct FrameJson {
    width:  u32,
    height: u32,
    #[serde(default)]
    hands:  Vec<HandJson>,
    #[serde(default)]
    error:  Option<String>,
}

/// Frames produced by an external detector as JSON lines:
///
/// ```json
/// {"width":640,"height":480,"hands":[{"score":0.93,"landmarks":[{"x":0.51,"y":0.82}, ...]}]}
/// ```
///
/// Coordinates are fractions of the image size (extra fields such as `z` are
/// ignored).  Hands below `min_score` or without exactly 21 landmarks are
/// dropped; at most `max_hands` are kept.  A line carrying `"error"` yields a
/// frame with no hands.
pub struct JsonLinesSource<R> {
    reader:    R,
    label:     String,
    line_no:   usize,
    max_hands: usize,
    min_score: f32,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(JsonLinesSource::new(BufReader::new(file), path.display().to_string()))
    }
}

impl JsonLinesSource<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        JsonLinesSource::new(io::stdin().lock(), "stdin".to_string())
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, label: String) -> Self {
        JsonLinesSource { reader, label, line_no: 0, max_hands: 2, min_score: 0.0 }
    }

    pub fn max_hands(mut self, n: usize) -> Self { self.max_hands = n; self }

    pub fn min_score(mut self, score: f32) -> Self { self.min_score = score; self }

    fn parse(&self, text: &str) -> Result<HandFrame, SourceError> {
        let raw: FrameJson = serde_json::from_str(text)
            .map_err(|source| SourceError::Json { line: self.line_no, source })?;

        if let Some(err) = raw.error {
            warn!(line = self.line_no, "detector error: {}", err);
            return Ok(HandFrame { width: raw.width, height: raw.height, hands: Vec::new() });
        }

        let mut hands = Vec::new();
        for hand in raw.hands {
            if hand.score < self.min_score {
                debug!(line = self.line_no, score = hand.score, "hand below confidence");
                continue;
            }
            if hand.landmarks.len() != LANDMARK_COUNT {
                warn!(
                    line = self.line_no,
                    "expected {} landmarks, got {}", LANDMARK_COUNT, hand.landmarks.len()
                );
                continue;
            }
            let pts: Vec<(f64, f64)> = hand.landmarks.iter().map(|p| (p.x, p.y)).collect();
            hands.push(LandmarkSnapshot::from_normalized(&pts, raw.width, raw.height));
            if hands.len() == self.max_hands {
                break;
            }
        }
        Ok(HandFrame { width: raw.width, height: raw.height, hands })
    }
}

impl<R: BufRead> HandSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if !buf.trim().is_empty() {
                return self.parse(buf.trim()).map(Some);
            }
        }
    }

    fn describe(&self) -> String { format!("JSON landmarks from {}", self.label) }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a LeapMotion controller.
///
/// Joint positions (millimetres above the device) are projected onto a
/// virtual image: x in `[-200, 200]` mm spans the width, height above the
/// device in `[50, 450]` mm spans the image bottom to top.  Depth is dropped.
///
/// Landmark mapping per digit `k` (thumb = 0): `1+4k` metacarpal end,
/// `2+4k` intermediate start, `3+4k` distal start, `4+4k` tip.  The index
/// metacarpal's carpal end stands in for the wrist.
#[cfg(feature = "leap")]
pub struct LeapHandSource {
    connection: leaprs::Connection,
    width:      u32,
    height:     u32,
    max_hands:  usize,
}

#[cfg(feature = "leap")]
impl LeapHandSource {
    pub fn open(width: u32, height: u32, max_hands: usize) -> Result<Self, SourceError> {
        use leaprs::*;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SourceError::Device(format!("creating LeapC connection: {:?}", e)))?;
        connection
            .open()
            .map_err(|e| SourceError::Device(format!("opening LeapMotion device: {:?}", e)))?;

        Ok(LeapHandSource { connection, width, height, max_hands })
    }
}

#[cfg(feature = "leap")]
fn leap_project(x_mm: f32, y_mm: f32, width: u32, height: u32) -> (i32, i32) {
    const HALF_SPAN: f32 = 200.0;
    const Y_FLOOR:   f32 = 50.0;
    const Y_SPAN:    f32 = 400.0;
    let px = (x_mm + HALF_SPAN) / (2.0 * HALF_SPAN) * width as f32;
    let py = (1.0 - (y_mm - Y_FLOOR) / Y_SPAN) * height as f32;
    (px as i32, py as i32)
}

#[cfg(feature = "leap")]
fn leap_snapshot(hand: &leaprs::Hand, width: u32, height: u32) -> Option<LandmarkSnapshot> {
    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 { return None; }

    let mut pts = [(0i32, 0i32); LANDMARK_COUNT];
    let wrist = digits[1].metacarpal().prev_joint();
    pts[0] = leap_project(wrist.x, wrist.y, width, height);

    for (k, digit) in digits.iter().take(5).enumerate() {
        let joints = [
            digit.metacarpal().next_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (j, p) in joints.iter().enumerate() {
            pts[1 + 4 * k + j] = leap_project(p.x, p.y, width, height);
        }
    }
    Some(LandmarkSnapshot::from_points(&pts))
}

#[cfg(feature = "leap")]
impl HandSource for LeapHandSource {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError> {
        use leaprs::*;

        let (width, height, max_hands) = (self.width, self.height, self.max_hands);
        loop {
            let msg = match self.connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let tracked: Vec<_> = frame.hands().collect();
                let hands: Vec<LandmarkSnapshot> = tracked
                    .iter()
                    .filter_map(|h| leap_snapshot(h, width, height))
                    .take(max_hands)
                    .collect();
                return Ok(Some(HandFrame { width, height, hands }));
            }
        }
    }

    fn describe(&self) -> String { "LeapMotion controller".to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
