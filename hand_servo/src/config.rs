//! Static configuration, read once at start-up.
//!
//! Every field has a default, so a config file only needs the values that
//! differ from the reference rig.  Example:
//!
//! ```json
//! {
//!   "peer": "192.168.1.40:8080",
//!   "open_calibration":   [220.8, 313.9, 321.7, 305.4, 267.6],
//!   "closed_calibration": [91.6, 136.8, 109.2, 103.4, 119.0],
//!   "intervals": [[900, 2000], [2100, 1000], [2000, 900], [2100, 1050], [1600, 500]],
//!   "deadband": 10,
//!   "max_step": 100
//! }
//! ```
//!
//! Setting a calibration vector to `null` leaves that side uncalibrated.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use finger_pose::{
    AngleInterval, CalibrationStore, CalibrationVector, DEFAULT_DEADBAND, DEFAULT_MAX_STEP,
    FINGER_COUNT,
};
use serde::{Deserialize, Serialize};

/// Open-hand lengths measured on the reference rig.
pub const REFERENCE_OPEN: [f64; FINGER_COUNT] = [
    220.8144349364321, 313.91217024475304, 321.6902734197762, 305.3764276390367, 267.58657184119033,
];

/// Closed-hand lengths measured on the reference rig.
pub const REFERENCE_CLOSED: [f64; FINGER_COUNT] = [
    91.61020907050903, 136.75120479061457, 109.19050480887186, 103.4123087657179, 118.99583473857281,
];

/// Servo ranges of the reference hand, closed end first.
pub const REFERENCE_INTERVALS: [AngleInterval; FINGER_COUNT] = [
    AngleInterval { low: 900.0,  high: 2000.0 },
    AngleInterval { low: 2100.0, high: 1000.0 },
    AngleInterval { low: 2000.0, high: 900.0  },
    AngleInterval { low: 2100.0, high: 1050.0 },
    AngleInterval { low: 1600.0, high: 500.0  },
];

/// Hand count the two-hand closing mode always uses.
const DOCTOR_STRANGE_HANDS: usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// ServoConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServoConfig {
    /// `host:port` of the servo hand.
    pub peer: String,

    pub open_calibration:   Option<CalibrationVector>,
    pub closed_calibration: Option<CalibrationVector>,

    /// Target range per finger, thumb first.
    pub intervals: [AngleInterval; FINGER_COUNT],

    /// Smaller changes than this are held.
    pub deadband: f64,
    /// Largest change per frame.
    pub max_step: f64,

    /// Most hands the detector reports per frame.
    pub max_hands: usize,
    /// Which detected hand drives the servos.
    pub hand_index: usize,

    /// Passed to the detector; JSON sources also drop hands scoring below it.
    pub detection_confidence: f32,
    /// Reserved for detector front-ends that track between frames.  None of
    /// the built-in sources read it; it is only range-checked.
    pub tracking_confidence:  f32,

    /// Two-hand closing mode.  Only forces `max_hands` to 2.
    pub doctor_strange_closing: bool,
}

impl Default for ServoConfig {
    fn default() -> Self {
        ServoConfig {
            peer:                   "127.0.0.1:8080".to_string(),
            open_calibration:       Some(CalibrationVector::new(REFERENCE_OPEN)),
            closed_calibration:     Some(CalibrationVector::new(REFERENCE_CLOSED)),
            intervals:              REFERENCE_INTERVALS,
            deadband:               DEFAULT_DEADBAND,
            max_step:               DEFAULT_MAX_STEP,
            max_hands:              2,
            hand_index:             0,
            detection_confidence:   0.5,
            tracking_confidence:    0.5,
            doctor_strange_closing: false,
        }
    }
}

impl ServoConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.max_step > 0.0) {
            bail!("max_step must be positive, got {}", self.max_step);
        }
        if !(self.deadband >= 0.0) {
            bail!("deadband must be non-negative, got {}", self.deadband);
        }
        if self.effective_max_hands() == 0 {
            bail!("max_hands must be at least 1");
        }
        if self.hand_index >= self.effective_max_hands() {
            bail!(
                "hand_index {} is out of range for {} hand(s)",
                self.hand_index, self.effective_max_hands()
            );
        }
        for (name, v) in [
            ("detection_confidence", self.detection_confidence),
            ("tracking_confidence",  self.tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("{} must be within 0..=1, got {}", name, v);
            }
        }
        Ok(())
    }

    pub fn effective_max_hands(&self) -> usize {
        if self.doctor_strange_closing { DOCTOR_STRANGE_HANDS } else { self.max_hands }
    }

    /// Calibration store holding whichever vectors are configured.
    pub fn calibration_store(&self) -> CalibrationStore {
        let mut store = CalibrationStore::default();
        if let Some(open) = self.open_calibration {
            store.set_open(open);
        }
        if let Some(closed) = self.closed_calibration {
            store.set_closed(closed);
        }
        store
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_the_reference_rig() {
        let cfg = ServoConfig::default();
        assert_eq!(cfg.deadband, 10.0);
        assert_eq!(cfg.max_step, 100.0);
        assert_eq!(cfg.intervals[1], AngleInterval::new(2100.0, 1000.0));
        assert!(cfg.calibration_store().is_calibrated());
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: ServoConfig = serde_json::from_str(r#"{"peer": "10.0.0.7:9000", "deadband": 4}"#).unwrap();
        assert_eq!(cfg.peer, "10.0.0.7:9000");
        assert_eq!(cfg.deadband, 4.0);
        assert_eq!(cfg.max_step, DEFAULT_MAX_STEP);
        assert_eq!(cfg.open_calibration, Some(CalibrationVector::new(REFERENCE_OPEN)));
    }

    #[test]
    fn null_calibration_leaves_store_uncalibrated() {
        let cfg: ServoConfig = serde_json::from_str(r#"{"closed_calibration": null}"#).unwrap();
        let store = cfg.calibration_store();
        assert!(!store.is_calibrated());
        assert!(store.status().open);
        assert_eq!(*store.closed(), CalibrationVector::ZERO);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<ServoConfig, _> = serde_json::from_str(r#"{"maxstep": 5}"#);
        assert!(res.is_err());
    }

    #[test]
    fn wrong_calibration_length_is_rejected() {
        let res: Result<ServoConfig, _> = serde_json::from_str(r#"{"open_calibration": [1, 2, 3]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut cfg = ServoConfig { max_step: 0.0, ..ServoConfig::default() };
        assert!(cfg.validate().is_err());
        cfg.max_step = 100.0;
        cfg.deadband = -1.0;
        assert!(cfg.validate().is_err());
        cfg.deadband = 10.0;
        cfg.hand_index = 2;
        assert!(cfg.validate().is_err());
        cfg.hand_index = 0;
        cfg.detection_confidence = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tracking_confidence_is_range_checked() {
        let cfg: ServoConfig = serde_json::from_str(r#"{"tracking_confidence": 0.8}"#).unwrap();
        assert_eq!(cfg.tracking_confidence, 0.8);
        cfg.validate().unwrap();
        let cfg = ServoConfig { tracking_confidence: -0.1, ..ServoConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn doctor_strange_forces_two_hands() {
        let cfg = ServoConfig { max_hands: 1, doctor_strange_closing: true, ..ServoConfig::default() };
        assert_eq!(cfg.effective_max_hands(), 2);
        let cfg = ServoConfig { max_hands: 4, doctor_strange_closing: true, ..ServoConfig::default() };
        assert_eq!(cfg.effective_max_hands(), 2);
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("hand_servo_cfg_{}.json", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            write!(f, r#"{{"max_step": 50, "hand_index": 1}}"#).unwrap();
        }
        let cfg = ServoConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.max_step, 50.0);
        assert_eq!(cfg.hand_index, 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn load_missing_file_names_path() {
        let err = ServoConfig::load(Path::new("/nonexistent/servo.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/servo.json"));
    }
}
