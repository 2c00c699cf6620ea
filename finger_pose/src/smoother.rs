//! Frame-to-frame smoothing for the emitted angle stream.
//!
//! Each finger is handled on its own, with three regions:
//!
//! | `|raw - last|` | Output |
//! |---|---|
//! | `> max_step` | `last` moved by exactly `max_step` toward `raw` |
//! | `< deadband` | `last` (held) |
//! | otherwise | `raw` |
//!
//! The caller owns `last`: frame N's output is frame N+1's `last`.  Start
//! from all zeros; the first frame is not treated specially, so it slews up
//! from zero like any other.

use crate::mapper::AngleVector;

/// Changes smaller than this are treated as jitter.
pub const DEFAULT_DEADBAND: f64 = 10.0;

/// Largest change allowed between consecutive frames.
pub const DEFAULT_MAX_STEP: f64 = 100.0;

/// Smooth a single finger.
pub fn smooth_one(raw: f64, last: f64, deadband: f64, max_step: f64) -> f64 {
    let diff = raw - last;
    if diff.abs() > max_step {
        if diff > 0.0 { last + max_step } else { last - max_step }
    } else if diff.abs() < deadband {
        last
    } else {
        raw
    }
}

/// Smooth every finger of one frame.
pub fn smooth(raw: &AngleVector, last: &AngleVector, deadband: f64, max_step: f64) -> AngleVector {
    std::array::from_fn(|i| smooth_one(raw[i], last[i], deadband, max_step))
}
