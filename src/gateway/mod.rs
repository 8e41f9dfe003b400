//! Request orchestration: validation, readiness gating, classification,
//! filtering and ranking.

mod form;
mod upload;

pub use form::{AnalyzeForm, AudioUpload};
pub use upload::StagedAudio;

use crate::analysis::location::{expected_species, retain_expected};
use crate::analysis::{AnalysisResult, LocationFields, LocationHint, NormalizeOptions, normalize};
use crate::classifier::{Classifier, ClassifierKind};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::supervisor::Readiness;
use crate::utils::species_list::load_species_list;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Per-request limits and result shaping.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Largest accepted audio part.
    pub max_upload_bytes: u64,
    /// Where uploads are staged (system temp dir when `None`).
    pub temp_dir: Option<PathBuf>,
    /// Timeout for one classification.
    pub request_timeout: Duration,
    /// Timeout for a species-occurrence lookup.
    pub filter_timeout: Duration,
    /// How long a request may wait for a backend that is not ready yet.
    pub ready_wait: Duration,
    /// Cutoff and cap for ranked results.
    pub normalize: NormalizeOptions,
    /// Static allow-list used when no location filter applies.
    pub species_list: Option<HashSet<String>>,
}

impl GatewaySettings {
    /// Settings from the loaded configuration. Reads the species list file
    /// if one is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let species_list = config
            .results
            .species_list_file
            .as_deref()
            .map(load_species_list)
            .transpose()?;

        if let Some(list) = &species_list {
            info!("Loaded species list with {} entries", list.len());
        }

        Ok(Self {
            max_upload_bytes: config.server.max_upload_bytes,
            temp_dir: config.server.temp_dir.clone(),
            request_timeout: config.backend.request_timeout(),
            filter_timeout: config.backend.filter_timeout(),
            ready_wait: config.backend.ready_wait(),
            normalize: NormalizeOptions {
                min_confidence: config.results.min_confidence,
                max_results: config.results.max_results,
            },
            species_list,
        })
    }
}

/// Handles analysis requests against one classifier.
#[derive(Clone)]
pub struct AnalysisGateway {
    classifier: Arc<dyn Classifier>,
    readiness: Readiness,
    settings: Arc<GatewaySettings>,
}

impl AnalysisGateway {
    /// Create a gateway.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        readiness: Readiness,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            classifier,
            readiness,
            settings: Arc::new(settings),
        }
    }

    /// Readiness handle.
    pub const fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Backend kind.
    pub fn classifier_kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    /// Settings in effect.
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Analyze one upload.
    ///
    /// Checks run in order: audio present and location well-formed, backend
    /// ready, upload within the size limit. The staged file and the
    /// classifier call live in a detached task, so a dropped client does not
    /// cancel classification and the file is removed when the task ends.
    pub async fn analyze(&self, form: AnalyzeForm) -> Result<AnalysisResult> {
        let AnalyzeForm {
            audio,
            location,
            body_truncated,
        } = form;

        let audio = match audio {
            Some(audio) if audio.size == 0 && !body_truncated => {
                return Err(invalid("Uploaded audio file is empty"));
            }
            None if !body_truncated => return Err(invalid("No audio file provided")),
            audio => audio,
        };
        let location = LocationHint::from_fields(&location, chrono::Local::now().date_naive())?;

        self.ensure_ready().await?;

        let audio = match audio {
            Some(audio) if !body_truncated && audio.size <= self.settings.max_upload_bytes => audio,
            _ => {
                return Err(Error::PayloadTooLarge {
                    limit: self.settings.max_upload_bytes,
                });
            }
        };

        let upload_bytes = audio.size;
        let staged = StagedAudio::write(
            self.settings.temp_dir.as_deref(),
            audio.file_name.as_deref(),
            audio.data,
        )
        .await?;

        let classifier = Arc::clone(&self.classifier);
        let settings = Arc::clone(&self.settings);
        let started = Instant::now();

        let result = tokio::spawn(async move {
            let result = run_pipeline(classifier.as_ref(), &settings, &staged, location).await;
            drop(staged);
            result
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("analysis task failed: {e}"),
        })??;

        info!(
            upload_bytes,
            total_detections = result.total_detections,
            species = result.birds.len(),
            location_used = result.location_used,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Analysis complete"
        );

        Ok(result)
    }

    /// Species plausible at a location and week.
    pub async fn species(&self, fields: &LocationFields) -> Result<(u32, Vec<String>)> {
        let hint = LocationHint::from_fields(fields, chrono::Local::now().date_naive())?
            .ok_or_else(|| invalid("lat and lon are required"))?;

        self.ensure_ready().await?;

        let lookup = self.classifier.expected_species(hint.latitude, hint.longitude, hint.week);
        let species = tokio::time::timeout(self.settings.filter_timeout, lookup)
            .await
            .map_err(|_| Error::BackendTimeout {
                timeout_secs: self.settings.filter_timeout.as_secs(),
            })??;

        let mut species: Vec<String> = species.into_iter().collect();
        species.sort();
        Ok((hint.week, species))
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.readiness.wait_ready(self.settings.ready_wait).await {
            return Ok(());
        }
        Err(Error::BackendUnavailable {
            state: self.readiness.state().to_string(),
        })
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidRequest {
        message: message.to_string(),
    }
}

async fn run_pipeline(
    classifier: &dyn Classifier,
    settings: &GatewaySettings,
    staged: &StagedAudio,
    location: Option<LocationHint>,
) -> Result<AnalysisResult> {
    let detections = tokio::time::timeout(
        settings.request_timeout,
        classifier.classify(staged.path(), location.as_ref()),
    )
    .await
    .map_err(|_| Error::BackendTimeout {
        timeout_secs: settings.request_timeout.as_secs(),
    })?
    .map_err(Error::into_classifier_failure)?;

    let total_detections = detections.len();
    debug!("Classifier returned {total_detections} detections");

    let allowed = match &location {
        Some(hint) => expected_species(classifier, hint, settings.filter_timeout).await,
        None => None,
    };
    let location_used = allowed.is_some();

    let detections = match (allowed, &settings.species_list) {
        (Some(allowed), _) => retain_expected(detections, &allowed),
        (None, Some(list)) => retain_expected(detections, list),
        (None, None) => detections,
    };

    Ok(AnalysisResult {
        birds: normalize(&detections, &settings.normalize),
        location_used,
        total_detections,
    })
}
