//! Open-hand / closed-hand calibration.
//!
//! Each [`CalibrationVector`] holds one reference length per finger, measured
//! at the reference palm scale (where `d` equals [`MAIN_DISTANCE`]).  The
//! store only tracks whether each vector has been supplied; range checks are
//! left to whoever produced the numbers.
//!
//! [`MAIN_DISTANCE`]: crate::MAIN_DISTANCE

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::finger::{FingerIndex, FINGER_COUNT};
use crate::PoseError;

// ════════════════════════════════════════════════════════════════════════════
// CalibrationVector
// ════════════════════════════════════════════════════════════════════════════

/// One reference length per finger, thumb first.
///
/// Serialized as a plain list of five numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct CalibrationVector([f64; FINGER_COUNT]);

impl CalibrationVector {
    pub const ZERO: CalibrationVector = CalibrationVector([0.0; FINGER_COUNT]);

    pub fn new(values: [f64; FINGER_COUNT]) -> Self { CalibrationVector(values) }

    pub fn get(&self, finger: FingerIndex) -> f64 { self.0[finger.position()] }

    pub fn as_array(&self) -> &[f64; FINGER_COUNT] { &self.0 }
}

impl Index<FingerIndex> for CalibrationVector {
    type Output = f64;
    fn index(&self, finger: FingerIndex) -> &f64 { &self.0[finger.position()] }
}

impl TryFrom<&[f64]> for CalibrationVector {
    type Error = PoseError;

    fn try_from(values: &[f64]) -> Result<Self, PoseError> {
        let arr: [f64; FINGER_COUNT] = values.try_into().map_err(|_| {
            PoseError::CalibrationLength { expected: FINGER_COUNT, found: values.len() }
        })?;
        Ok(CalibrationVector(arr))
    }
}

impl TryFrom<Vec<f64>> for CalibrationVector {
    type Error = PoseError;
    fn try_from(values: Vec<f64>) -> Result<Self, PoseError> {
        CalibrationVector::try_from(values.as_slice())
    }
}

impl From<CalibrationVector> for Vec<f64> {
    fn from(v: CalibrationVector) -> Vec<f64> { v.0.to_vec() }
}

// ════════════════════════════════════════════════════════════════════════════
// CalibrationStore
// ════════════════════════════════════════════════════════════════════════════

/// Which of the two calibration vectors have been supplied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationStatus {
    pub open:   bool,
    pub closed: bool,
}

impl CalibrationStatus {
    pub fn is_complete(&self) -> bool { self.open && self.closed }
}

/// Holds the open-hand and closed-hand calibration vectors.
///
/// Unset vectors read as all zeros, which the mapper treats as degenerate
/// calibration for every finger.  Once a vector is set the store stays
/// calibrated for that side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationStore {
    open:   CalibrationVector,
    closed: CalibrationVector,
    status: CalibrationStatus,
}

impl CalibrationStore {
    /// A store with both vectors already supplied.
    pub fn with_vectors(open: CalibrationVector, closed: CalibrationVector) -> Self {
        let mut store = CalibrationStore::default();
        store.set_open(open);
        store.set_closed(closed);
        store
    }

    pub fn set_open(&mut self, vec: CalibrationVector) {
        self.open = vec;
        self.status.open = true;
    }

    pub fn set_closed(&mut self, vec: CalibrationVector) {
        self.closed = vec;
        self.status.closed = true;
    }

    pub fn open(&self)   -> &CalibrationVector { &self.open }
    pub fn closed(&self) -> &CalibrationVector { &self.closed }
    pub fn status(&self) -> CalibrationStatus  { self.status }

    /// True once both vectors have been set at least once.
    pub fn is_calibrated(&self) -> bool { self.status.is_complete() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
