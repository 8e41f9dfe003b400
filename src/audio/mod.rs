//! Audio decoding, resampling and segmentation for in-process inference.

mod decode;
mod resample;
mod segment;

pub use decode::{DecodedAudio, decode_audio_file};
pub use resample::resample;
pub use segment::{Segment, split_segments};
