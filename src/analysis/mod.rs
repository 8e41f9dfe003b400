//! Result aggregation: location filtering and ranking.

pub mod location;
pub mod normalize;
mod types;

pub use location::{LocationFields, LocationHint};
pub use normalize::{NormalizeOptions, normalize};
pub use types::{AnalysisResult, RankedBird, RawDetection, SpeciesName};
