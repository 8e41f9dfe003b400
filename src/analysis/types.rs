//! Detection and result type definitions.

use crate::constants::LABEL_SEPARATOR;
use serde::{Deserialize, Serialize};

/// One prediction produced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Species label, `ScientificName_CommonName`.
    pub species: String,
    /// Confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Segment start within the clip, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f32>,
    /// Segment end within the clip, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f32>,
}

impl RawDetection {
    /// Detection without a time span.
    pub fn new(species: impl Into<String>, confidence: f32) -> Self {
        Self {
            species: species.into(),
            confidence,
            start_time: None,
            end_time: None,
        }
    }

    /// Attach the segment this detection came from.
    #[must_use]
    pub const fn with_span(mut self, start_time: f32, end_time: f32) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }
}

/// Species label split into its name parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesName {
    /// Scientific name.
    pub scientific: String,
    /// Common name.
    pub common: String,
}

impl SpeciesName {
    /// Parse species label in `BirdNET` format.
    ///
    /// Labels are `ScientificName_CommonName` and are split on the first
    /// separator, so a common name containing `_` stays intact while a
    /// scientific name containing one is split wrongly. Labels without a
    /// separator use the raw label for both parts.
    pub fn from_label(label: &str) -> Self {
        label.split_once(LABEL_SEPARATOR).map_or_else(
            || Self {
                scientific: label.to_string(),
                common: label.to_string(),
            },
            |(scientific, common)| Self {
                scientific: scientific.to_string(),
                common: common.to_string(),
            },
        )
    }
}

/// Client-facing, deduplicated species result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBird {
    /// Scientific name.
    pub scientific_name: String,
    /// Common name.
    pub common_name: String,
    /// Best confidence as a percentage, one decimal.
    pub confidence: f64,
    /// Start of the best-scoring segment, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f32>,
    /// End of the best-scoring segment, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f32>,
}

/// Outcome of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Species ordered by descending confidence.
    pub birds: Vec<RankedBird>,
    /// Whether a location species filter was applied.
    pub location_used: bool,
    /// Raw detections returned by the classifier, before filtering and
    /// deduplication.
    pub total_detections: usize,
}
