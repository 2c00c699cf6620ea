//! The per-frame control loop.
//!
//! One iteration:
//!
//! 1. pull a [`HandFrame`] from the source (blocks),
//! 2. pick the configured hand (empty snapshot if absent),
//! 3. normalize → map → smooth in-process,
//! 4. send the smoothed vector as one line (blocks).
//!
//! Everything runs on the caller's thread.  The only state carried between
//! iterations is the last emitted vector, owned by [`Pipeline`].

use finger_link::{send_angles, LinkError, Transport};
use finger_pose::{
    compute_angles, normalize, reference_lengths, smooth, AngleInterval, AngleVector,
    CalibrationStore, CalibrationVector, LandmarkSnapshot, PoseError, FINGER_COUNT,
};
use tracing::{debug, info, warn};

use crate::config::ServoConfig;
use crate::source::{HandSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

// ════════════════════════════════════════════════════════════════════════════
// Pipeline: snapshot in, smoothed angles out
// ════════════════════════════════════════════════════════════════════════════

/// What one frame produced.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    /// Normalization constant (0 when no hand).
    pub d:       f64,
    /// Mapped angles before smoothing; `None` when the frame was skipped.
    pub raw:     Option<AngleVector>,
    /// Angles to send.
    pub emitted: AngleVector,
}

/// Calibration, target ranges and smoothing state.
pub struct Pipeline {
    calibration: CalibrationStore,
    intervals:   [AngleInterval; FINGER_COUNT],
    deadband:    f64,
    max_step:    f64,
    last:        AngleVector,
}

impl Pipeline {
    pub fn new(
        calibration: CalibrationStore,
        intervals:   [AngleInterval; FINGER_COUNT],
        deadband:    f64,
        max_step:    f64,
    ) -> Self {
        Pipeline { calibration, intervals, deadband, max_step, last: [0.0; FINGER_COUNT] }
    }

    pub fn from_config(cfg: &ServoConfig) -> Self {
        Pipeline::new(cfg.calibration_store(), cfg.intervals, cfg.deadband, cfg.max_step)
    }

    /// Run one snapshot through the pipeline.
    ///
    /// When no normalization is available (no hand, or a degenerate palm
    /// measurement) the previous output is repeated unchanged.
    pub fn process(&mut self, snapshot: &LandmarkSnapshot) -> FrameOutcome {
        let d = normalize(snapshot);
        let mapped = compute_angles(
            snapshot, d, &self.intervals, self.calibration.open(), self.calibration.closed(),
        );

        match mapped {
            Ok(raw) => {
                self.last = smooth(&raw, &self.last, self.deadband, self.max_step);
                FrameOutcome { d, raw: Some(raw), emitted: self.last }
            }
            Err(PoseError::InvalidNormalization(_)) if snapshot.is_empty() => {
                debug!("no hand; holding previous angles");
                FrameOutcome { d, raw: None, emitted: self.last }
            }
            Err(e) => {
                warn!("skipping frame: {}", e);
                FrameOutcome { d, raw: None, emitted: self.last }
            }
        }
    }

    pub fn last(&self)        -> &AngleVector { &self.last }
    pub fn intervals(&self)   -> &[AngleInterval; FINGER_COUNT] { &self.intervals }
    pub fn calibration(&self) -> &CalibrationStore { &self.calibration }
}

// ════════════════════════════════════════════════════════════════════════════
// ControlLoop
// ════════════════════════════════════════════════════════════════════════════

/// Everything about one completed iteration, for display and logging.
#[derive(Clone, Debug)]
pub struct FrameReport {
    /// 1-based frame counter.
    pub frame:    u64,
    pub width:    u32,
    pub height:   u32,
    /// Snapshot that drove this frame (empty if the hand was absent).
    pub snapshot: LandmarkSnapshot,
    pub outcome:  FrameOutcome,
    /// Line sent to the peer, without terminator.
    pub line:     String,
}

pub struct ControlLoop<S, T> {
    source:     S,
    transport:  T,
    pipeline:   Pipeline,
    hand_index: usize,
    frames:     u64,
}

impl<S: HandSource, T: Transport> ControlLoop<S, T> {
    pub fn new(source: S, transport: T, pipeline: Pipeline, hand_index: usize) -> Self {
        ControlLoop { source, transport, pipeline, hand_index, frames: 0 }
    }

    /// Build from config; warns if the calibration is incomplete.
    pub fn from_config(source: S, transport: T, cfg: &ServoConfig) -> Self {
        let pipeline = Pipeline::from_config(cfg);
        if !pipeline.calibration().is_calibrated() {
            warn!(
                status = ?pipeline.calibration().status(),
                "calibration incomplete; the missing side reads as zero lengths"
            );
        }
        ControlLoop::new(source, transport, pipeline, cfg.hand_index)
    }

    /// Run exactly one iteration.  `Ok(None)` once the source is exhausted.
    pub fn step(&mut self) -> Result<Option<FrameReport>, LoopError> {
        let frame = match self.source.next_frame()? {
            Some(f) => f,
            None    => return Ok(None),
        };

        let snapshot = frame.hand(self.hand_index);
        let outcome  = self.pipeline.process(&snapshot);
        let line     = send_angles(&mut self.transport, &outcome.emitted)?;

        self.frames += 1;
        debug!(frame = self.frames, d = outcome.d, "{}", line);

        Ok(Some(FrameReport {
            frame:  self.frames,
            width:  frame.width,
            height: frame.height,
            snapshot,
            outcome,
            line,
        }))
    }

    /// Loop until the source runs out or `keep_going` returns false.
    ///
    /// `keep_going` sees every completed frame; it is the only cancellation
    /// point.  Source and transport failures end the loop with an error.
    /// Returns the number of frames sent.
    pub fn run<F>(&mut self, mut keep_going: F) -> Result<u64, LoopError>
    where
        F: FnMut(&FrameReport) -> bool,
    {
        info!(
            source = %self.source.describe(),
            transport = %self.transport.describe(),
            "control loop started"
        );
        while let Some(report) = self.step()? {
            if !keep_going(&report) {
                break;
            }
        }
        info!(frames = self.frames, "control loop finished");
        Ok(self.frames)
    }

    pub fn frames(&self)    -> u64 { self.frames }
    pub fn pipeline(&self)  -> &Pipeline { &self.pipeline }
    pub fn transport(&self) -> &T { &self.transport }
}

// ════════════════════════════════════════════════════════════════════════════
// Calibration capture
// ════════════════════════════════════════════════════════════════════════════

/// Average the current pose's reference-scale finger lengths over up to
/// `frames` frames in which the hand is visible.
///
/// Hold the hand fully open (or closed) while this runs and use the result as
/// the open (or closed) calibration vector.  Returns `None` if no usable frame
/// arrived before the source ran out.
pub fn measure_pose<S: HandSource + ?Sized>(
    source:     &mut S,
    frames:     usize,
    hand_index: usize,
) -> Result<Option<CalibrationVector>, SourceError> {
    let mut sum = [0.0; FINGER_COUNT];
    let mut used = 0usize;
    let mut seen = 0usize;

    while used < frames {
        let frame = match source.next_frame()? {
            Some(f) => f,
            None    => break,
        };
        seen += 1;

        let snapshot = frame.hand(hand_index);
        match reference_lengths(&snapshot, normalize(&snapshot)) {
            Ok(lengths) => {
                for (acc, len) in sum.iter_mut().zip(lengths) {
                    *acc += len;
                }
                used += 1;
            }
            Err(e) => debug!(frame = seen, "not measurable: {}", e),
        }
    }

    if used == 0 {
        return Ok(None);
    }
    info!(used, seen, "calibration sample complete");
    Ok(Some(CalibrationVector::new(sum.map(|s| s / used as f64))))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{HandFrame, SimHandSource};
    use approx::assert_relative_eq;
    use finger_link::decode_line;
    use finger_pose::{Landmark, MAIN_DISTANCE};
    use std::collections::VecDeque;
    use std::io;

    // ── test doubles ──────────────────────────────────────────────────────

    struct Scripted(VecDeque<Result<HandFrame, SourceError>>);

    impl Scripted {
        fn frames(frames: Vec<HandFrame>) -> Self {
            Scripted(frames.into_iter().map(Ok).collect())
        }
    }

    impl HandSource for Scripted {
        fn next_frame(&mut self) -> Result<Option<HandFrame>, SourceError> {
            self.0.pop_front().transpose()
        }
        fn describe(&self) -> String { "scripted".into() }
    }

    #[derive(Default)]
    struct Recording {
        lines:     Vec<String>,
        fail_from: Option<usize>,
    }

    impl Transport for Recording {
        fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            if self.fail_from.is_some_and(|n| self.lines.len() >= n) {
                return Err(LinkError::Send(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")));
            }
            self.lines.push(String::from_utf8(bytes.to_vec()).unwrap());
            Ok(())
        }
        fn describe(&self) -> String { "recording".into() }
    }

    // ── fixtures ──────────────────────────────────────────────────────────

    /// Wrist at (300, 400), index MCP 100px above it, all five fingertips
    /// `tip_len` pixels above the wrist.
    fn hand(tip_len: i32) -> LandmarkSnapshot {
        let mut pts = vec![(300, 400); 21];
        pts[5] = (300, 300);
        for tip in [4, 8, 12, 16, 20] {
            pts[tip] = (300, 400 - tip_len);
        }
        LandmarkSnapshot::from_points(&pts)
    }

    fn frame_with(hands: Vec<LandmarkSnapshot>) -> HandFrame {
        HandFrame { width: 640, height: 480, hands }
    }

    fn uniform_config(open: f64, closed: f64) -> ServoConfig {
        ServoConfig {
            open_calibration:   Some(CalibrationVector::new([open; 5])),
            closed_calibration: Some(CalibrationVector::new([closed; 5])),
            intervals:          [AngleInterval::new(0.0, 1000.0); 5],
            ..ServoConfig::default()
        }
    }

    fn sent(lp: &ControlLoop<Scripted, Recording>) -> Vec<[i64; 5]> {
        lp.transport().lines.iter().map(|l| decode_line(l).unwrap()).collect()
    }

    // ── pipeline ──────────────────────────────────────────────────────────

    #[test]
    fn cold_start_slews_from_zero() {
        // Fully open hand → target 1000 on every finger; first frames ramp.
        let cfg = uniform_config(300.0, 100.0);
        let mut p = Pipeline::from_config(&cfg);
        let open = hand(400);
        let first = p.process(&open);
        assert_eq!(first.raw, Some([1000.0; 5]));
        assert_eq!(first.emitted, [100.0; 5]);
        assert_eq!(p.process(&open).emitted, [200.0; 5]);
    }

    #[test]
    fn missing_hand_repeats_previous_output() {
        let mut p = Pipeline::from_config(&uniform_config(300.0, 100.0));
        p.process(&hand(400));
        let before = *p.last();
        let out = p.process(&LandmarkSnapshot::empty());
        assert_eq!(out.d, 0.0);
        assert!(out.raw.is_none());
        assert_eq!(out.emitted, before);
    }

    #[test]
    fn partial_hand_without_palm_reference_is_skipped() {
        let mut p = Pipeline::from_config(&uniform_config(300.0, 100.0));
        let snap = LandmarkSnapshot::new(vec![Landmark::new(0, 1, 1), Landmark::new(8, 1, 90)]).unwrap();
        let out = p.process(&snap);
        assert!(out.raw.is_none());
        assert_eq!(out.emitted, [0.0; 5]);
    }

    #[test]
    fn hand_too_close_to_camera_holds_previous_output() {
        let mut p = Pipeline::from_config(&uniform_config(300.0, 100.0));
        p.process(&hand(400));
        p.process(&hand(400));
        assert_eq!(*p.last(), [200.0; 5]);

        // 400px palm, fully open fingers.
        let mut pts = vec![(0, -200); 21];
        pts[0] = (0, 400);
        pts[5] = (0, 0);
        let out = p.process(&LandmarkSnapshot::from_points(&pts));
        assert!(out.d < 0.0);
        assert!(out.raw.is_none());
        assert_eq!(out.emitted, [200.0; 5]);
    }

    #[test]
    fn uncalibrated_fingers_drift_to_mid_range() {
        let cfg = ServoConfig {
            open_calibration:   None,
            closed_calibration: None,
            intervals:          [AngleInterval::new(0.0, 100.0); 5],
            ..ServoConfig::default()
        };
        let mut p = Pipeline::from_config(&cfg);
        assert!(!p.calibration().is_calibrated());
        assert_eq!(p.process(&hand(150)).emitted, [50.0; 5]);
    }

    // ── loop ──────────────────────────────────────────────────────────────

    #[test]
    fn runs_until_source_is_exhausted() {
        let frames = vec![frame_with(vec![hand(400)]); 4];
        let mut lp = ControlLoop::from_config(
            Scripted::frames(frames), Recording::default(), &uniform_config(300.0, 100.0),
        );
        let n = lp.run(|_| true).unwrap();
        assert_eq!(n, 4);
        assert_eq!(sent(&lp), vec![[100; 5], [200; 5], [300; 5], [400; 5]]);
        assert!(lp.transport().lines.iter().all(|l| l.ends_with('\n')));
    }

    #[test]
    fn keep_going_stops_the_loop() {
        let frames = vec![frame_with(vec![hand(400)]); 10];
        let mut lp = ControlLoop::from_config(
            Scripted::frames(frames), Recording::default(), &uniform_config(300.0, 100.0),
        );
        let n = lp.run(|r| r.frame < 3).unwrap();
        assert_eq!(n, 3);
        assert_eq!(lp.transport().lines.len(), 3);
    }

    #[test]
    fn no_hand_frames_still_send() {
        let frames = vec![
            frame_with(vec![hand(400)]),
            frame_with(vec![]),
            frame_with(vec![hand(400)]),
        ];
        let mut lp = ControlLoop::from_config(
            Scripted::frames(frames), Recording::default(), &uniform_config(300.0, 100.0),
        );
        lp.run(|_| true).unwrap();
        assert_eq!(sent(&lp), vec![[100; 5], [100; 5], [200; 5]]);
    }

    #[test]
    fn follows_configured_hand_index() {
        let cfg = ServoConfig { hand_index: 1, ..uniform_config(300.0, 100.0) };
        // Hand 0 fully open, hand 1 fully closed.
        let frames = vec![frame_with(vec![hand(400), hand(50)])];
        let mut lp = ControlLoop::from_config(Scripted::frames(frames), Recording::default(), &cfg);
        let report = lp.step().unwrap().unwrap();
        assert_eq!(report.outcome.raw, Some([0.0; 5]));
        assert_eq!(report.line, "0 0 0 0 0");
    }

    #[test]
    fn source_failure_is_fatal() {
        let src = Scripted(VecDeque::from(vec![
            Ok(frame_with(vec![hand(400)])),
            Err(SourceError::Device("camera unplugged".into())),
            Ok(frame_with(vec![hand(400)])),
        ]));
        let mut lp = ControlLoop::from_config(src, Recording::default(), &uniform_config(300.0, 100.0));
        let err = lp.run(|_| true).unwrap_err();
        assert!(matches!(err, LoopError::Source(SourceError::Device(_))));
        assert_eq!(lp.frames(), 1);
    }

    #[test]
    fn transport_failure_is_fatal() {
        let frames = vec![frame_with(vec![hand(400)]); 5];
        let rec = Recording { fail_from: Some(2), ..Recording::default() };
        let mut lp = ControlLoop::from_config(Scripted::frames(frames), rec, &uniform_config(300.0, 100.0));
        let err = lp.run(|_| true).unwrap_err();
        assert!(matches!(err, LoopError::Link(LinkError::Send(_))));
        assert_eq!(lp.transport().lines.len(), 2);
    }

    #[test]
    fn simulated_hand_stays_inside_intervals() {
        let cfg = ServoConfig::default();
        let mut lp = ControlLoop::from_config(
            SimHandSource::new(640, 480).period(30),
            Recording::default(),
            &cfg,
        );
        let mut reports = Vec::new();
        lp.run(|r| { reports.push(r.clone()); r.frame < 120 }).unwrap();
        for r in &reports {
            let raw = r.outcome.raw.expect("simulated hand is always visible");
            for (v, iv) in raw.iter().zip(cfg.intervals.iter()) {
                assert!(iv.contains(*v), "{} outside {:?}", v, iv);
            }
        }
    }

    // ── calibration capture ───────────────────────────────────────────────

    #[test]
    fn measure_averages_visible_frames() {
        let d = normalize(&hand(200));
        let frames = vec![
            frame_with(vec![]),
            frame_with(vec![hand(200)]),
            frame_with(vec![hand(220)]),
            frame_with(vec![hand(999)]),
        ];
        let v = measure_pose(&mut Scripted::frames(frames), 2, 0).unwrap().unwrap();
        let expected = 210.0 * d / MAIN_DISTANCE;
        for f in v.as_array() {
            assert_relative_eq!(*f, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn measure_without_hand_is_none() {
        let frames = vec![frame_with(vec![]); 3];
        assert!(measure_pose(&mut Scripted::frames(frames), 5, 0).unwrap().is_none());
    }
}
