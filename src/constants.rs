//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "birda-gateway";

/// Configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default minimum confidence threshold for detections.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.1;

/// Default maximum number of species returned per analysis.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Separator between scientific and common name in species labels.
pub const LABEL_SEPARATOR: char = '_';

/// Sentinel coordinate value meaning "not set".
pub const UNSET_COORDINATE: f64 = -1.0;

/// HTTP server defaults.
pub mod server {
    /// Default listen host.
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Default listen port.
    pub const DEFAULT_PORT: u16 = 5000;

    /// Default upload size limit in bytes (16 MiB).
    pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

    /// Extra body allowance on top of the upload limit for multipart
    /// boundaries and the text fields.
    pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

    /// Seconds a client is told to wait before retrying a not-ready backend.
    pub const RETRY_AFTER_SECS: u64 = 5;

    /// Prefix for staged upload files.
    pub const UPLOAD_FILE_PREFIX: &str = "birda-upload-";

    /// Extension used when the upload has no usable one.
    pub const DEFAULT_UPLOAD_EXTENSION: &str = "wav";
}

/// Classifier backend defaults.
pub mod backend {
    /// Default remote backend address.
    pub const DEFAULT_URL: &str = "http://127.0.0.1:8080";

    /// Default timeout for one classification call, in seconds.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Default time allowed for the backend to become ready at startup.
    pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;

    /// Default timeout for species-occurrence lookups, in seconds.
    pub const DEFAULT_FILTER_TIMEOUT_SECS: u64 = 10;

    /// Default time to wait for an owned backend process to exit.
    pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

    /// Default readiness poll interval in milliseconds.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

    /// Timeout for a single readiness probe.
    pub const PROBE_TIMEOUT_MS: u64 = 2000;

    /// Backend health path.
    pub const HEALTH_PATH: &str = "health";

    /// Backend classification path.
    pub const CLASSIFY_PATH: &str = "classify";

    /// Backend species-occurrence path.
    pub const SPECIES_PATH: &str = "species";
}

/// In-process model defaults.
pub mod model {
    /// Default segment overlap in seconds.
    pub const DEFAULT_OVERLAP: f32 = 0.0;

    /// Default batch size for inference.
    pub const DEFAULT_BATCH_SIZE: usize = 8;

    /// Default number of top predictions kept per segment.
    pub const DEFAULT_TOP_K: usize = 5;

    /// Confidence floor applied inside the model; the result cutoff is
    /// applied later by the normalizer.
    pub const MODEL_MIN_CONFIDENCE: f32 = 0.01;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}

/// Range filter constants.
pub mod range_filter {
    /// `BirdNET` uses 48 weeks per year.
    pub const WEEKS_PER_YEAR: u32 = 48;

    /// Days per `BirdNET` week (365.25 / 48).
    pub const DAYS_PER_WEEK: f32 = 7.6;

    /// First day of the year (January 1st) for week-to-day offset calculation.
    pub const YEAR_START_DAY: f32 = 1.0;

    /// Default range filter threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.03;
}

/// Calendar constants.
pub mod calendar {
    /// Days in each month (non-leap year).
    pub const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
}
