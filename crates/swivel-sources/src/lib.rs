//! `swivel-sources` – the secondary offset producers.
//!
//! Each producer runs continuously on its own thread, independent of the
//! motion loop's cadence, and publishes `(offset, valid, timestamp)` through
//! an [`OffsetCell`][swivel_hal::OffsetCell].  The motion loop polls the
//! cell; the producers never touch the tick path.
//!
//! # Modules
//!
//! - [`face`] – [`FaceTracker`][face::FaceTracker]: frame-driven face
//!   following with exponential smoothing and a fixed linear fade-out after
//!   tracking loss.
//! - [`wobble`] – [`SpeechWobbler`][wobble::SpeechWobbler]: converts a
//!   streaming speech-activity signal into a small oscillating head offset
//!   with attack/release amplitude ramps.

pub mod face;
pub mod wobble;

pub use face::{FaceOffsetFilter, FaceTracker};
pub use wobble::{SpeechWobbler, WobbleState};
