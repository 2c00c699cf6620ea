//! Palm-scale normalization.
//!
//! The wrist → index-MCP distance shrinks as the hand moves away from the
//! camera.  A cubic fitted on a reference rig turns that pixel distance into
//! a constant `d` which rescales calibration lengths into the current frame.

use crate::landmark::{LandmarkSnapshot, Segment, INDEX_MCP, WRIST};

/// Cubic coefficients, highest power first.  Empirically fitted; keep as is.
const CUBIC: [f64; 4] = [-0.0000062, 0.0045176, -1.1921533, 135.7189041];

/// Evaluate the palm-scale cubic at a wrist → index-MCP distance `x` (pixels).
pub fn palm_scale(x: f64) -> f64 {
    let [a, b, c, k] = CUBIC;
    a * x.powi(3) + b * x.powi(2) + c * x + k
}

/// The wrist → index-MCP segment, if both landmarks are present.
pub fn reference_segment(snapshot: &LandmarkSnapshot) -> Option<Segment> {
    snapshot.segment(WRIST, INDEX_MCP)
}

/// Normalization constant `d` for a snapshot.
///
/// Returns `0.0` when the reference landmarks are missing (including the
/// empty, no-hand snapshot).  Zero means "no normalization available" and
/// must not be divided by.
pub fn normalize(snapshot: &LandmarkSnapshot) -> f64 {
    match reference_segment(snapshot) {
        Some(seg) => palm_scale(seg.length()),
        None      => 0.0,
    }
}
