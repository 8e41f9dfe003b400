//! Shared helpers for gateway integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use birda_gateway::analysis::{LocationHint, NormalizeOptions, RawDetection};
use birda_gateway::classifier::{Classifier, ClassifierKind};
use birda_gateway::error::{Error, Result};
use birda_gateway::gateway::{AnalysisGateway, GatewaySettings};
use birda_gateway::server::{AppState, build_router};
use birda_gateway::supervisor::Readiness;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOUNDARY: &str = "birda-test-boundary";

/// Scripted classifier.
#[derive(Default)]
pub struct StubClassifier {
    pub detections: Vec<RawDetection>,
    pub classify_error: Option<String>,
    pub inference_error: Option<String>,
    pub classify_delay: Option<Duration>,
    pub expected: Option<HashSet<String>>,
    pub classify_calls: AtomicUsize,
    pub species_calls: AtomicUsize,
    pub saw_audio_file: AtomicBool,
    pub last_location: Mutex<Option<LocationHint>>,
}

impl StubClassifier {
    pub fn with_detections(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            ..Self::default()
        }
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn species_calls(&self) -> usize {
        self.species_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Remote
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn classify(
        &self,
        audio: &Path,
        location: Option<&LocationHint>,
    ) -> Result<Vec<RawDetection>> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.saw_audio_file.store(audio.exists(), Ordering::SeqCst);
        *self.last_location.lock().unwrap() = location.copied();

        if let Some(delay) = self.classify_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.classify_error {
            return Err(Error::ClassifierInternal {
                message: message.clone(),
            });
        }
        if let Some(reason) = &self.inference_error {
            return Err(Error::Inference {
                reason: reason.clone(),
            });
        }
        Ok(self.detections.clone())
    }

    async fn expected_species(
        &self,
        _latitude: f64,
        _longitude: f64,
        _week: u32,
    ) -> Result<HashSet<String>> {
        self.species_calls.fetch_add(1, Ordering::SeqCst);
        self.expected.clone().ok_or_else(|| Error::ClassifierInternal {
            message: "species lookup unavailable".to_string(),
        })
    }
}

pub fn settings(temp_dir: &Path) -> GatewaySettings {
    GatewaySettings {
        max_upload_bytes: 1024 * 1024,
        temp_dir: Some(temp_dir.to_path_buf()),
        request_timeout: Duration::from_secs(5),
        filter_timeout: Duration::from_secs(5),
        ready_wait: Duration::ZERO,
        normalize: NormalizeOptions::default(),
        species_list: None,
    }
}

pub fn ready() -> Readiness {
    let readiness = Readiness::new();
    readiness.set_ready();
    readiness
}

pub fn app(
    classifier: Arc<StubClassifier>,
    readiness: Readiness,
    settings: GatewaySettings,
) -> Router {
    let gateway = AnalysisGateway::new(classifier, readiness, settings);
    build_router(AppState::new(gateway))
}

/// One multipart part.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, data) => {
                let disposition = format!("form-data; name=\"{name}\"; filename=\"{file_name}\"");
                body.extend_from_slice(
                    format!("Content-Disposition: {disposition}\r\n").as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn analyze_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
