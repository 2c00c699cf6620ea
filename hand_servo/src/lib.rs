//! # hand_servo
//!
//! Drives a servo hand from live hand landmarks.  Each frame the tracked
//! hand's finger lengths are turned into five calibrated, slew-limited angles
//! and streamed to the hand as one text line over TCP.
//!
//! ## Frame flow
//!
//! | Step | Where |
//! |---|---|
//! | Pull landmarks | [`source::HandSource`] |
//! | Palm scale, angle mapping, smoothing | [`control::Pipeline`] (via `finger_pose`) |
//! | Encode and send | `finger_link::send_angles` |
//! | Draw | [`visualizer::Visualizer`] |
//!
//! ## Landmark sources
//!
//! * (default) **Simulation**: a synthetic hand opening and closing its
//!   fingers, or a JSON-lines stream from an external detector (file or
//!   stdin).
//! * `leap` feature: **Hardware**, a LeapMotion controller via LeapC.
//!
//! ## Window keys
//!
//! | Key | Action |
//! |---|---|
//! | `Esc` | Quit |
//! | `Q` | Quit |

pub mod config;
pub mod control;
pub mod source;
pub mod visualizer;
