//! # finger_pose
//!
//! Turns one frame of 2‑D hand landmarks into five finger bend angles that are
//! safe to send to a servo hand.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |---|---|---|
//! | Palm scale | [`normalize`] | normalization constant `d` |
//! | Finger lengths → angles | [`mapper`] | raw [`AngleVector`] |
//! | Dead-band + slew cap | [`smoother`] | emitted [`AngleVector`] |
//!
//! Calibration (the open-hand and closed-hand reference lengths) lives in a
//! [`CalibrationStore`]; the finger → landmark table lives in [`finger`].
//!
//! Every stage is a pure function of its inputs.  The only state carried
//! between frames is the previous emitted vector, which the caller threads
//! through [`smooth`].
//!
//! ## Quick start
//!
//! ```rust
//! use finger_pose::{
//!     compute_angles, normalize, smooth, AngleInterval, CalibrationStore,
//!     CalibrationVector, LandmarkSnapshot, DEFAULT_DEADBAND, DEFAULT_MAX_STEP,
//! };
//!
//! let mut store = CalibrationStore::default();
//! store.set_open(CalibrationVector::new([220.0, 314.0, 322.0, 305.0, 268.0]));
//! store.set_closed(CalibrationVector::new([92.0, 137.0, 109.0, 103.0, 119.0]));
//!
//! let intervals = [AngleInterval::new(900.0, 2000.0); 5];
//! let snapshot = LandmarkSnapshot::empty();
//!
//! let d = normalize(&snapshot);
//! let raw = compute_angles(&snapshot, d, &intervals, store.open(), store.closed());
//! // No hand → no normalization available; the caller keeps its last output.
//! assert!(raw.is_err());
//!
//! let last = [0.0; 5];
//! let out = smooth(&[250.0; 5], &last, DEFAULT_DEADBAND, DEFAULT_MAX_STEP);
//! assert_eq!(out, [100.0; 5]);
//! ```

pub mod calibration;
pub mod finger;
pub mod interp;
pub mod landmark;
pub mod mapper;
pub mod normalize;
pub mod smoother;

pub use calibration::{CalibrationStatus, CalibrationStore, CalibrationVector};
pub use finger::{FingerIndex, FINGER_COUNT};
pub use landmark::{Landmark, LandmarkSnapshot, Segment, LANDMARK_COUNT};
pub use mapper::{
    compute_angles, finger_lengths, reference_lengths, AngleInterval, AngleVector,
    MAIN_DISTANCE,
};
pub use normalize::{normalize, palm_scale, reference_segment};
pub use smoother::{smooth, smooth_one, DEFAULT_DEADBAND, DEFAULT_MAX_STEP};

// ════════════════════════════════════════════════════════════════════════════
// PoseError
// ════════════════════════════════════════════════════════════════════════════

/// Errors raised by the pose pipeline.
///
/// All of them are per-frame or per-configuration conditions; none should
/// take down a control loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoseError {
    /// A calibration vector did not have one value per finger.
    #[error("calibration vector needs {expected} values, got {found}")]
    CalibrationLength { expected: usize, found: usize },

    /// The normalization constant was not positive and finite, so finger
    /// bounds cannot be scaled into the current frame.
    #[error("normalization distance {0} is unusable")]
    InvalidNormalization(f64),

    /// A landmark id outside the 21-point hand model.
    #[error("landmark id {0} is outside 0..=20")]
    LandmarkId(u8),

    /// The same landmark id appeared twice in one snapshot.
    #[error("landmark id {0} appears more than once")]
    DuplicateLandmark(u8),
}
