//! Location species model on top of the birdnet-onnx meta model.

use crate::error::{Error, Result};
use crate::utils::date::week_to_month_day;
use birdnet_onnx::RangeFilter;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Meta model answering "which species occur here this week".
pub struct LocationModel {
    inner: RangeFilter,
    threshold: f32,
}

impl LocationModel {
    /// Load the meta model, aligned with the classifier's labels.
    pub fn load(
        meta_model_path: &Path,
        classifier_labels: &[String],
        threshold: f32,
    ) -> Result<Self> {
        let inner = RangeFilter::builder()
            .model_path(meta_model_path.to_string_lossy().to_string())
            .from_classifier_labels(classifier_labels)
            .threshold(threshold)
            .build()
            .map_err(|e| Error::RangeFilterBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { inner, threshold })
    }

    /// Labels scoring at least the threshold at the location and week.
    pub fn expected_species(
        &self,
        latitude: f64,
        longitude: f64,
        week: u32,
    ) -> Result<HashSet<String>> {
        let (month, day) = week_to_month_day(week);

        #[allow(clippy::cast_possible_truncation)]
        let scores = self
            .inner
            .predict(latitude as f32, longitude as f32, month, day)
            .map_err(|e| Error::RangeFilterPredict {
                reason: e.to_string(),
            })?;

        let species: HashSet<String> = scores
            .into_iter()
            .filter(|s| s.score >= self.threshold)
            .map(|s| s.species)
            .collect();

        debug!(
            "Meta model: {} species above {} for week {} ({}/{})",
            species.len(),
            self.threshold,
            week,
            month,
            day
        );

        Ok(species)
    }
}
