//! Hand landmarks in pixel space and the per-frame snapshot that holds them.
//!
//! Landmark ids follow the 21-point hand model:
//!
//! | Ids | Part |
//! |---|---|
//! | 0 | wrist |
//! | 1–4 | thumb (CMC → tip) |
//! | 5–8 | index (MCP → tip) |
//! | 9–12 | middle |
//! | 13–16 | ring |
//! | 17–20 | pinky |

use crate::PoseError;

/// Number of landmarks in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:     u8 = 0;
pub const INDEX_MCP: u8 = 5;

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One tracked point, in integer pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Landmark {
    pub id: u8,
    pub x:  i32,
    pub y:  i32,
}

impl Landmark {
    pub fn new(id: u8, x: i32, y: i32) -> Self {
        Landmark { id, x, y }
    }

    /// Convert a detector point given as a fraction of the image size.
    ///
    /// Pixel coordinates are truncated toward zero.
    pub fn from_normalized(id: u8, nx: f64, ny: f64, width: u32, height: u32) -> Self {
        Landmark {
            id,
            x: (nx * width as f64) as i32,
            y: (ny * height as f64) as i32,
        }
    }

    pub fn position(&self) -> (i32, i32) { (self.x, self.y) }
}

// ════════════════════════════════════════════════════════════════════════════
// Segment
// ════════════════════════════════════════════════════════════════════════════

/// A straight line between two landmarks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub from: (i32, i32),
    pub to:   (i32, i32),
}

impl Segment {
    /// Euclidean length in pixels.
    pub fn length(&self) -> f64 {
        let dx = self.to.0 as f64 - self.from.0 as f64;
        let dy = self.to.1 as f64 - self.from.1 as f64;
        dx.hypot(dy)
    }

    /// Integer midpoint, rounded toward negative infinity.
    pub fn midpoint(&self) -> (i32, i32) {
        let mid = |a: i32, b: i32| (a as i64 + b as i64).div_euclid(2) as i32;
        (mid(self.from.0, self.to.0), mid(self.from.1, self.to.1))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSnapshot
// ════════════════════════════════════════════════════════════════════════════

/// All landmarks of one detected hand in one frame.
///
/// May be empty (no hand).  Ids are unique and within `0..=20`; a detector
/// normally supplies all 21, but partial snapshots are allowed and any
/// measurement touching a missing id reads as zero length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkSnapshot {
    landmarks: Vec<Landmark>,
}

impl LandmarkSnapshot {
    /// A snapshot with no hand in it.
    pub fn empty() -> Self { LandmarkSnapshot::default() }

    /// Build a snapshot, rejecting out-of-range or repeated ids.
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, PoseError> {
        let mut seen = [false; LANDMARK_COUNT];
        for lm in &landmarks {
            let slot = seen
                .get_mut(lm.id as usize)
                .ok_or(PoseError::LandmarkId(lm.id))?;
            if *slot {
                return Err(PoseError::DuplicateLandmark(lm.id));
            }
            *slot = true;
        }
        Ok(LandmarkSnapshot { landmarks })
    }

    /// Build a snapshot from points listed in id order (`points[i]` is id `i`).
    ///
    /// Extra points beyond the 21-point model are ignored.
    pub fn from_points(points: &[(i32, i32)]) -> Self {
        let landmarks = points
            .iter()
            .take(LANDMARK_COUNT)
            .enumerate()
            .map(|(id, &(x, y))| Landmark::new(id as u8, x, y))
            .collect();
        LandmarkSnapshot { landmarks }
    }

    /// Build a snapshot from normalized detector points listed in id order.
    pub fn from_normalized(points: &[(f64, f64)], width: u32, height: u32) -> Self {
        let landmarks = points
            .iter()
            .take(LANDMARK_COUNT)
            .enumerate()
            .map(|(id, &(nx, ny))| Landmark::from_normalized(id as u8, nx, ny, width, height))
            .collect();
        LandmarkSnapshot { landmarks }
    }

    pub fn is_empty(&self) -> bool { self.landmarks.is_empty() }
    pub fn len(&self)      -> usize { self.landmarks.len() }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> { self.landmarks.iter() }

    pub fn get(&self, id: u8) -> Option<&Landmark> {
        self.landmarks.iter().find(|lm| lm.id == id)
    }

    /// Segment between two landmarks, if both are present.
    pub fn segment(&self, first: u8, second: u8) -> Option<Segment> {
        let a = self.get(first)?;
        let b = self.get(second)?;
        Some(Segment { from: a.position(), to: b.position() })
    }

    /// Pixel distance between two landmarks; zero when either is missing.
    pub fn length_between(&self, first: u8, second: u8) -> f64 {
        self.segment(first, second).map_or(0.0, |s| s.length())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
