//! BirdNET model loaded into the gateway process.

use super::range_filter::LocationModel;
use super::{Classifier, ClassifierKind};
use crate::analysis::{LocationHint, RawDetection};
use crate::audio::{decode_audio_file, resample, split_segments};
use crate::config::{InferenceDevice, ModelConfig};
use crate::constants::model::MODEL_MIN_CONFIDENCE;
use crate::error::{Error, Result};
use async_trait::async_trait;
use birdnet_onnx::{
    ClassifierBuilder, ExecutionProviderInfo, InferenceOptions, available_execution_providers,
    ort_execution_providers,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// GPU providers tried in order by `auto` and `gpu`.
const GPU_PRIORITY: [(ExecutionProviderInfo, &str); 6] = [
    (ExecutionProviderInfo::TensorRt, "TensorRT"),
    (ExecutionProviderInfo::Cuda, "CUDA"),
    (ExecutionProviderInfo::DirectMl, "DirectML"),
    (ExecutionProviderInfo::CoreMl, "CoreML"),
    (ExecutionProviderInfo::Rocm, "ROCm"),
    (ExecutionProviderInfo::OpenVino, "OpenVINO"),
];

struct LoadedModel {
    classifier: Mutex<birdnet_onnx::Classifier>,
    location: Option<Mutex<LocationModel>>,
    sample_rate: u32,
    segment_duration: f32,
}

/// In-process classifier. Not ready until [`Classifier::initialize`] has
/// loaded the model.
pub struct OnnxClassifier {
    config: ModelConfig,
    model: OnceLock<Arc<LoadedModel>>,
}

impl OnnxClassifier {
    /// Create an unloaded classifier.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            model: OnceLock::new(),
        }
    }

    fn loaded(&self) -> Result<Arc<LoadedModel>> {
        self.model
            .get()
            .cloned()
            .ok_or_else(|| Error::BackendUnavailable {
                state: "model not loaded".to_string(),
            })
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "model lock poisoned".to_string(),
    }
}

fn join_error(e: &tokio::task::JoinError) -> Error {
    Error::Internal {
        message: format!("inference task failed: {e}"),
    }
}

fn add_execution_provider(
    builder: ClassifierBuilder,
    provider: ExecutionProviderInfo,
) -> ClassifierBuilder {
    use ort_execution_providers::{
        CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
        OpenVINOExecutionProvider, ROCmExecutionProvider,
    };

    match provider {
        ExecutionProviderInfo::TensorRt => builder.with_tensorrt(),
        ExecutionProviderInfo::Cuda => builder.execution_provider(CUDAExecutionProvider::default()),
        ExecutionProviderInfo::DirectMl => {
            builder.execution_provider(DirectMLExecutionProvider::default())
        }
        ExecutionProviderInfo::CoreMl => {
            builder.execution_provider(CoreMLExecutionProvider::default())
        }
        ExecutionProviderInfo::Rocm => builder.execution_provider(ROCmExecutionProvider::default()),
        ExecutionProviderInfo::OpenVino => {
            builder.execution_provider(OpenVINOExecutionProvider::default())
        }
        _ => builder,
    }
}

fn select_device(
    builder: ClassifierBuilder,
    device: InferenceDevice,
) -> (ClassifierBuilder, &'static str) {
    if device == InferenceDevice::Cpu {
        return (builder, "CPU");
    }

    let available = available_execution_providers();
    debug!("Available execution providers: {available:?}");

    match GPU_PRIORITY.iter().find(|(p, _)| available.contains(p)) {
        Some(&(provider, name)) => {
            info!("Selected {name} execution provider");
            (add_execution_provider(builder, provider), name)
        }
        None if device == InferenceDevice::Gpu => {
            warn!("GPU requested but no GPU providers available, using CPU");
            (builder, "CPU (GPU fallback)")
        }
        None => (builder, "CPU"),
    }
}

fn load_model(config: &ModelConfig) -> Result<LoadedModel> {
    let started = Instant::now();

    if !config.path.exists() {
        return Err(Error::ModelFileNotFound {
            path: config.path.clone(),
        });
    }
    if !config.labels.exists() {
        return Err(Error::LabelsFileNotFound {
            path: config.labels.clone(),
        });
    }

    let builder = ClassifierBuilder::new()
        .model_path(config.path.to_string_lossy().to_string())
        .labels_path(config.labels.to_string_lossy().to_string())
        .top_k(config.top_k)
        .min_confidence(MODEL_MIN_CONFIDENCE);

    let (builder, device) = select_device(builder, config.device);

    let classifier = builder.build().map_err(|e| Error::ClassifierBuild {
        reason: e.to_string(),
    })?;

    let sample_rate = classifier.config().sample_rate;
    let segment_duration = classifier.config().segment_duration;

    let location = config
        .meta_model
        .as_deref()
        .map(|path| LocationModel::load(path, classifier.labels(), config.range_threshold))
        .transpose()?
        .map(Mutex::new);

    info!(
        "Loaded model {} in {:.1}s (sample rate {} Hz, segment {}s, device {}, meta model: {})",
        config.path.display(),
        started.elapsed().as_secs_f32(),
        sample_rate,
        segment_duration,
        device,
        if location.is_some() { "yes" } else { "no" }
    );

    Ok(LoadedModel {
        classifier: Mutex::new(classifier),
        location,
        sample_rate,
        segment_duration,
    })
}

impl LoadedModel {
    fn classify_file(
        &self,
        path: &Path,
        overlap: f32,
        batch_size: usize,
    ) -> Result<Vec<RawDetection>> {
        let audio = decode_audio_file(path)?;
        let duration = audio.duration_secs();
        let samples = resample(audio.samples, audio.sample_rate, self.sample_rate)?;
        let segments = split_segments(&samples, self.sample_rate, self.segment_duration, overlap);

        debug!(
            "Classifying {:.1}s of audio in {} segments",
            duration,
            segments.len()
        );

        let classifier = self.classifier.lock().map_err(|_| poisoned())?;
        let options = InferenceOptions::default();
        let mut detections = Vec::new();

        for batch in segments.chunks(batch_size.max(1)) {
            let inputs: Vec<&[f32]> = batch.iter().map(|s| s.samples.as_slice()).collect();
            let results = classifier
                .predict_batch(&inputs, &options)
                .map_err(|e| Error::Inference {
                    reason: e.to_string(),
                })?;

            for (segment, result) in batch.iter().zip(results) {
                detections.extend(result.predictions.into_iter().map(|p| {
                    RawDetection::new(p.species, p.confidence)
                        .with_span(segment.start_time, segment.end_time)
                }));
            }
        }

        Ok(detections)
    }
}

#[async_trait]
impl Classifier for OnnxClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::InProcess
    }

    async fn initialize(&self) -> Result<()> {
        if self.model.get().is_some() {
            return Ok(());
        }

        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || load_model(&config))
            .await
            .map_err(|e| join_error(&e))??;

        // A concurrent initialize may have won; either model is equivalent
        let _ = self.model.set(Arc::new(loaded));
        Ok(())
    }

    async fn probe(&self) -> bool {
        self.model.get().is_some()
    }

    async fn classify(
        &self,
        audio: &Path,
        _location: Option<&LocationHint>,
    ) -> Result<Vec<RawDetection>> {
        let model = self.loaded()?;
        let path: PathBuf = audio.to_path_buf();
        let overlap = self.config.overlap;
        let batch_size = self.config.batch_size;

        tokio::task::spawn_blocking(move || model.classify_file(&path, overlap, batch_size))
            .await
            .map_err(|e| join_error(&e))?
    }

    async fn expected_species(
        &self,
        latitude: f64,
        longitude: f64,
        week: u32,
    ) -> Result<HashSet<String>> {
        let model = self.loaded()?;
        if model.location.is_none() {
            return Err(Error::MetaModelMissing);
        }

        tokio::task::spawn_blocking(move || {
            let location = model.location.as_ref().ok_or(Error::MetaModelMissing)?;
            let location = location.lock().map_err(|_| poisoned())?;
            location.expected_species(latitude, longitude, week)
        })
        .await
        .map_err(|e| join_error(&e))?
    }
}
