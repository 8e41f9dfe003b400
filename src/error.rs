//! Error types for birda-gateway.

/// Result type alias for birda-gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for birda-gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Failed to read species list file.
    #[error("failed to read species list file '{path}'")]
    SpeciesListRead {
        /// Path to the species list file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // Request errors
    /// The client request is malformed (missing audio, bad location fields).
    #[error("{message}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// Uploaded audio exceeds the configured size limit.
    #[error("audio upload exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: u64,
    },

    // Backend errors
    /// The classifier is not ready to serve requests yet.
    #[error("classifier backend is not ready ({state})")]
    BackendUnavailable {
        /// Readiness state at the time of the request.
        state: String,
    },

    /// The classifier did not answer within the configured timeout.
    #[error("classifier backend timed out after {timeout_secs}s")]
    BackendTimeout {
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },

    /// The classifier could not be reached.
    #[error("classifier backend at '{url}' is unreachable")]
    BackendUnreachable {
        /// Address that was dialed.
        url: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The classifier answered with a failure payload.
    #[error("classifier error: {message}")]
    ClassifierInternal {
        /// Message reported by the classifier.
        message: String,
    },

    /// Failed to launch the locally managed backend process.
    #[error("failed to start backend process '{command}'")]
    BackendSpawn {
        /// Command that was launched.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to build the HTTP client for the remote backend.
    #[error("failed to build HTTP client: {reason}")]
    HttpClientBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Failed to bind the listening socket.
    #[error("failed to bind to '{addr}'")]
    ServerBind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // In-process classifier errors
    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: std::path::PathBuf,
    },

    /// Labels file does not exist.
    #[error("labels file does not exist: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: std::path::PathBuf,
    },

    /// Meta model file not found.
    #[error("meta model file not found: {path}")]
    MetaModelNotFound {
        /// Path to the missing meta model file.
        path: std::path::PathBuf,
    },

    /// Failed to initialize ONNX runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Failed to build classifier.
    #[error("failed to build classifier: {reason}")]
    ClassifierBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Failed to open audio file.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: std::path::PathBuf,
    },

    /// Failed to resample audio.
    #[error("failed to resample audio: {reason}")]
    Resample {
        /// Description of the resampling failure.
        reason: String,
    },

    /// Failed to build range filter.
    #[error("failed to build range filter: {reason}")]
    RangeFilterBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Failed to predict location scores.
    #[error("failed to predict location scores: {reason}")]
    RangeFilterPredict {
        /// Description of the prediction failure.
        reason: String,
    },

    /// Location filtering requested but no meta model is configured.
    #[error("location filtering requires a meta model (none configured)")]
    MetaModelMissing,

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Fold in-process decode and inference failures into
    /// [`Error::ClassifierInternal`], so a failed classification reads the
    /// same whichever backend produced it.
    #[must_use]
    pub fn into_classifier_failure(self) -> Self {
        match self {
            e @ (Self::Inference { .. }
            | Self::AudioOpen { .. }
            | Self::AudioDecode { .. }
            | Self::NoAudioTracks { .. }
            | Self::Resample { .. }) => Self::ClassifierInternal {
                message: e.to_string(),
            },
            other => other,
        }
    }

    /// Whether the caller may retry the same request later.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. }
                | Self::BackendTimeout { .. }
                | Self::BackendUnreachable { .. }
        )
    }
}
