//! Classification backends.
//!
//! The gateway talks to one [`Classifier`]: either a remote HTTP service
//! ([`HttpClassifier`]) or a BirdNET model loaded into this process
//! ([`OnnxClassifier`]).

mod local;
mod range_filter;
mod remote;

pub use local::OnnxClassifier;
pub use remote::HttpClassifier;

use crate::analysis::{LocationHint, RawDetection};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Which kind of backend serves classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Remote HTTP service.
    Remote,
    /// Model loaded into this process.
    InProcess,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::InProcess => write!(f, "in-process"),
        }
    }
}

/// A species classification engine.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Backend kind, reported by `/health`.
    fn kind(&self) -> ClassifierKind;

    /// One-time, possibly slow, setup such as model loading.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Cheap readiness check. Must not run inference.
    async fn probe(&self) -> bool;

    /// Classify one staged audio file.
    async fn classify(
        &self,
        audio: &Path,
        location: Option<&LocationHint>,
    ) -> Result<Vec<RawDetection>>;

    /// Species labels plausible at a location and week.
    async fn expected_species(&self, latitude: f64, longitude: f64, week: u32)
    -> Result<HashSet<String>>;
}
