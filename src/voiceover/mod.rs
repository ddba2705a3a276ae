/*!
 * Voiceover slicing, stitching and cut validation.
 */

pub mod slicer;
pub mod stitcher;
pub mod validation;

pub use slicer::{VoSegment, VoiceoverSlicer};
pub use stitcher::{StitchResult, VoiceoverStitcher};
pub use validation::{DriftClass, ValidationReport};
