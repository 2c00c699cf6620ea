//! Finger identities and their fixed landmark chains.

use std::fmt;

/// Number of fingers tracked per hand.
pub const FINGER_COUNT: usize = 5;

// ════════════════════════════════════════════════════════════════════════════
// FingerIndex
// ════════════════════════════════════════════════════════════════════════════

/// One finger of the hand, in wire order (thumb first).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FingerIndex {
    Thumb  = 0,
    Index  = 1,
    Middle = 2,
    Ring   = 3,
    Pinky  = 4,
}

/// Landmark ids from the wrist to the tip of each finger, in finger order.
const CHAINS: [[u8; 5]; FINGER_COUNT] = [
    [0, 1, 2, 3, 4],
    [0, 5, 6, 7, 8],
    [0, 9, 10, 11, 12],
    [0, 13, 14, 15, 16],
    [0, 17, 18, 19, 20],
];

impl FingerIndex {
    /// All fingers in wire order.
    pub const ALL: [FingerIndex; FINGER_COUNT] = [
        FingerIndex::Thumb,
        FingerIndex::Index,
        FingerIndex::Middle,
        FingerIndex::Ring,
        FingerIndex::Pinky,
    ];

    /// Position of this finger in every per-finger array.
    pub fn position(self) -> usize { self as usize }

    /// Full wrist-to-tip landmark chain.
    pub fn chain(self) -> &'static [u8; 5] { &CHAINS[self.position()] }

    /// `(base, tip)` landmark ids whose distance is the finger's length.
    pub fn endpoints(self) -> (u8, u8) {
        let chain = self.chain();
        (chain[0], chain[chain.len() - 1])
    }

    pub fn name(self) -> &'static str {
        match self {
            FingerIndex::Thumb  => "thumb",
            FingerIndex::Index  => "index",
            FingerIndex::Middle => "middle",
            FingerIndex::Ring   => "ring",
            FingerIndex::Pinky  => "pinky",
        }
    }
}

impl fmt::Display for FingerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_wrist_and_tip() {
        assert_eq!(FingerIndex::Thumb.endpoints(),  (0, 4));
        assert_eq!(FingerIndex::Index.endpoints(),  (0, 8));
        assert_eq!(FingerIndex::Middle.endpoints(), (0, 12));
        assert_eq!(FingerIndex::Ring.endpoints(),   (0, 16));
        assert_eq!(FingerIndex::Pinky.endpoints(),  (0, 20));
    }

    #[test]
    fn positions_follow_wire_order() {
        for (i, f) in FingerIndex::ALL.iter().enumerate() {
            assert_eq!(f.position(), i);
        }
    }

    #[test]
    fn chains_cover_every_landmark_once_besides_wrist() {
        let mut seen = [0u8; 21];
        for f in FingerIndex::ALL {
            for &id in &f.chain()[1..] {
                seen[id as usize] += 1;
            }
        }
        assert_eq!(seen[0], 0);
        assert!(seen[1..].iter().all(|&n| n == 1));
    }
}
