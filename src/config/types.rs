//! Configuration type definitions.

use crate::constants::{
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_CONFIDENCE, backend, model, range_filter, server,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Classifier backend settings.
    pub backend: BackendConfig,

    /// In-process model settings (used when `backend.mode = "local"`).
    pub model: Option<ModelConfig>,

    /// Result shaping settings.
    pub results: ResultsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Maximum accepted audio upload in bytes.
    pub max_upload_bytes: u64,

    /// Directory for staged uploads (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            max_upload_bytes: server::DEFAULT_MAX_UPLOAD_BYTES,
            temp_dir: None,
        }
    }
}

/// Where the classifier runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Classifier reached over HTTP.
    #[default]
    Remote,
    /// Classifier loaded into this process.
    Local,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Classifier backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Where the classifier runs.
    pub mode: BackendMode,

    /// Base URL of the remote classifier.
    pub url: String,

    /// Timeout for one classification call.
    pub request_timeout_secs: u64,

    /// Time allowed for the backend to become ready at startup.
    pub ready_timeout_secs: u64,

    /// Timeout for species-occurrence lookups.
    pub filter_timeout_secs: u64,

    /// Time allowed for an owned backend process to exit on shutdown.
    pub shutdown_timeout_secs: u64,

    /// Interval between readiness probes.
    pub poll_interval_ms: u64,

    /// How long a request may wait for a not-yet-ready backend (0 = reject
    /// immediately).
    pub ready_wait_ms: u64,

    /// Locally managed backend process, if the gateway should launch one.
    pub process: Option<ProcessConfig>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Remote,
            url: backend::DEFAULT_URL.to_string(),
            request_timeout_secs: backend::DEFAULT_REQUEST_TIMEOUT_SECS,
            ready_timeout_secs: backend::DEFAULT_READY_TIMEOUT_SECS,
            filter_timeout_secs: backend::DEFAULT_FILTER_TIMEOUT_SECS,
            shutdown_timeout_secs: backend::DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            poll_interval_ms: backend::DEFAULT_POLL_INTERVAL_MS,
            ready_wait_ms: 0,
            process: None,
        }
    }
}

impl BackendConfig {
    /// Classification timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Startup readiness window.
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Species lookup timeout.
    pub const fn filter_timeout(&self) -> Duration {
        Duration::from_secs(self.filter_timeout_secs)
    }

    /// Owned process shutdown allowance.
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Readiness poll interval.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request readiness wait.
    pub const fn ready_wait(&self) -> Duration {
        Duration::from_millis(self.ready_wait_ms)
    }
}

/// A backend process launched and owned by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable to run.
    pub command: String,

    /// Arguments, including the bind address the backend should use.
    pub args: Vec<String>,

    /// Working directory.
    pub working_dir: Option<PathBuf>,

    /// Extra environment (locale, model paths).
    pub env: BTreeMap<String, String>,
}

/// In-process model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: PathBuf,

    /// Path to the labels file.
    pub labels: PathBuf,

    /// Optional meta model for location-based species lists.
    #[serde(default)]
    pub meta_model: Option<PathBuf>,

    /// Execution device.
    #[serde(default)]
    pub device: InferenceDevice,

    /// Segments per inference batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Segment overlap in seconds.
    #[serde(default = "default_overlap")]
    pub overlap: f32,

    /// Predictions kept per segment.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum location score for a species to count as expected.
    #[serde(default = "default_range_threshold")]
    pub range_threshold: f32,
}

const fn default_batch_size() -> usize {
    model::DEFAULT_BATCH_SIZE
}

const fn default_overlap() -> f32 {
    model::DEFAULT_OVERLAP
}

const fn default_top_k() -> usize {
    model::DEFAULT_TOP_K
}

const fn default_range_threshold() -> f32 {
    range_filter::DEFAULT_THRESHOLD
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Use a GPU provider if one is available, else CPU.
    #[default]
    Auto,
    /// Prefer GPU, warn when falling back to CPU.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

/// Result shaping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Detections below this confidence are discarded.
    pub min_confidence: f32,

    /// Maximum number of species returned.
    pub max_results: usize,

    /// Static allow-list applied when no location hint is used.
    pub species_list_file: Option<PathBuf>,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_results: DEFAULT_MAX_RESULTS,
            species_list_file: None,
        }
    }
}
