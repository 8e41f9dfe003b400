//! Turns raw per-segment detections into a ranked species list.

use crate::analysis::types::{RankedBird, RawDetection, SpeciesName};
use crate::constants::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_CONFIDENCE};
use std::collections::HashMap;

/// Cutoff and cap applied by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Detections below this confidence are discarded.
    pub min_confidence: f32,
    /// Maximum number of species returned.
    pub max_results: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Deduplicate, rank and cap detections.
///
/// Each species keeps its highest-confidence detection (the first one on
/// ties). Ordering uses the raw confidence, so rounding to a percentage
/// can never reorder results. The output depends only on the input order
/// and values.
pub fn normalize(detections: &[RawDetection], options: &NormalizeOptions) -> Vec<RankedBird> {
    let mut best: Vec<&RawDetection> = Vec::new();
    let mut index_by_species: HashMap<&str, usize> = HashMap::new();

    // NaN confidences fail the comparison and are dropped
    for detection in detections
        .iter()
        .filter(|d| d.confidence >= options.min_confidence)
    {
        match index_by_species.get(detection.species.as_str()) {
            Some(&idx) => {
                if detection.confidence > best[idx].confidence {
                    best[idx] = detection;
                }
            }
            None => {
                index_by_species.insert(detection.species.as_str(), best.len());
                best.push(detection);
            }
        }
    }

    // sort_by is stable: equal confidences keep first-seen order
    best.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    best.truncate(options.max_results);

    best.into_iter().map(to_ranked).collect()
}

fn to_ranked(detection: &RawDetection) -> RankedBird {
    let name = SpeciesName::from_label(&detection.species);
    RankedBird {
        scientific_name: name.scientific,
        common_name: name.common,
        confidence: to_percent(detection.confidence),
        start_time: detection.start_time,
        end_time: detection.end_time,
    }
}

/// Confidence in [0,1] as a percentage with one decimal.
pub fn to_percent(confidence: f32) -> f64 {
    (f64::from(confidence) * 1000.0).round() / 10.0
}
