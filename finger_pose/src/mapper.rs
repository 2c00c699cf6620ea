//! Finger lengths → target angles.
//!
//! For each finger the wrist → tip pixel length is compared against the
//! closed-hand and open-hand calibration lengths, rescaled into the current
//! frame by the normalization constant `d`:
//!
//! ```text
//! low_bound  = MAIN_DISTANCE * closed[i] / d
//! high_bound = MAIN_DISTANCE * open[i]   / d
//! ```
//!
//! The length is then mapped (clamped) from `[low_bound, high_bound]` onto the
//! finger's [`AngleInterval`].

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationVector;
use crate::finger::{FingerIndex, FINGER_COUNT};
use crate::interp::interp_clamped;
use crate::landmark::LandmarkSnapshot;
use crate::PoseError;

/// Value of `d` at which calibration vectors were measured.
pub const MAIN_DISTANCE: f64 = 35.0;

/// One angle per finger, thumb first.
pub type AngleVector = [f64; FINGER_COUNT];

// ════════════════════════════════════════════════════════════════════════════
// AngleInterval
// ════════════════════════════════════════════════════════════════════════════

/// Output range for one finger.
///
/// `low` is produced for a fully closed finger and `high` for a fully open
/// one; `low > high` is fine for servos mounted the other way round.
/// Serialized as `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct AngleInterval {
    pub low:  f64,
    pub high: f64,
}

impl AngleInterval {
    pub fn new(low: f64, high: f64) -> Self { AngleInterval { low, high } }

    pub fn midpoint(&self) -> f64 { (self.low + self.high) / 2.0 }

    /// True if `v` lies between the endpoints, in either order.
    pub fn contains(&self, v: f64) -> bool {
        let (lo, hi) = if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        };
        v >= lo && v <= hi
    }
}

impl From<[f64; 2]> for AngleInterval {
    fn from([low, high]: [f64; 2]) -> Self { AngleInterval { low, high } }
}

impl From<AngleInterval> for [f64; 2] {
    fn from(i: AngleInterval) -> Self { [i.low, i.high] }
}

// ════════════════════════════════════════════════════════════════════════════
// Mapping
// ════════════════════════════════════════════════════════════════════════════

/// `d` must be positive and finite.  The cubic crosses zero for palms wider
/// than about 367px, past which the bounds change sign and stop meaning
/// anything.
fn check_normalization(d: f64) -> Result<(), PoseError> {
    if !(d > 0.0 && d.is_finite()) {
        return Err(PoseError::InvalidNormalization(d));
    }
    Ok(())
}

/// Wrist → tip pixel length of every finger; zero for missing landmarks.
pub fn finger_lengths(snapshot: &LandmarkSnapshot) -> [f64; FINGER_COUNT] {
    FingerIndex::ALL.map(|finger| {
        let (base, tip) = finger.endpoints();
        snapshot.length_between(base, tip)
    })
}

/// `(low_bound, high_bound)` for one finger in the current frame's pixels.
pub fn finger_bounds(
    finger: FingerIndex,
    d:      f64,
    open:   &CalibrationVector,
    closed: &CalibrationVector,
) -> (f64, f64) {
    (
        MAIN_DISTANCE * closed[finger] / d,
        MAIN_DISTANCE * open[finger] / d,
    )
}

/// Map a hand snapshot onto one angle per finger.
///
/// Fingers whose open and closed calibration are equal have no usable range
/// and report the midpoint of their interval.  A missing landmark counts as
/// zero length, which clamps to the closed end.
///
/// Fails only when `d` is not a positive finite number.
pub fn compute_angles(
    snapshot:  &LandmarkSnapshot,
    d:         f64,
    intervals: &[AngleInterval; FINGER_COUNT],
    open:      &CalibrationVector,
    closed:    &CalibrationVector,
) -> Result<AngleVector, PoseError> {
    check_normalization(d)?;

    let lengths = finger_lengths(snapshot);
    Ok(FingerIndex::ALL.map(|finger| {
        let i = finger.position();
        let bounds = finger_bounds(finger, d, open, closed);
        interp_clamped(lengths[i], bounds, (intervals[i].low, intervals[i].high))
    }))
}

/// Current finger lengths rescaled to the reference palm scale.
///
/// This is what a calibration vector stores: hold the hand fully open (or
/// closed), average a few frames of this, and use the result as the open
/// (or closed) vector.
pub fn reference_lengths(
    snapshot: &LandmarkSnapshot,
    d:        f64,
) -> Result<[f64; FINGER_COUNT], PoseError> {
    check_normalization(d)?;
    Ok(finger_lengths(snapshot).map(|len| len * d / MAIN_DISTANCE))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
