//! Classifier reached over HTTP.

use super::{Classifier, ClassifierKind};
use crate::analysis::{LocationHint, RawDetection};
use crate::constants::backend::{CLASSIFY_PATH, HEALTH_PATH, PROBE_TIMEOUT_MS, SPECIES_PATH};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    detections: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    #[serde(default)]
    species: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP client for a remote classification service.
pub struct HttpClassifier {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpClassifier {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(base_url).map_err(|e| Error::HttpClientBuild {
            reason: format!("invalid backend URL '{base_url}': {e}"),
        })?;

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn transport_error(&self, url: String, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::BackendTimeout {
                timeout_secs: self.request_timeout.as_secs(),
            }
        } else {
            Error::BackendUnreachable {
                url,
                source: Box::new(error),
            }
        }
    }

    /// Map a non-success status to an error.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(Error::BackendUnavailable {
                state: "backend reports not ready".to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("backend returned {status}"));

        Err(Error::ClassifierInternal { message })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Remote
    }

    async fn probe(&self) -> bool {
        let url = self.endpoint(HEALTH_PATH);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_millis(PROBE_TIMEOUT_MS))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health probe to {url} failed: {e}");
                false
            }
        }
    }

    async fn classify(
        &self,
        audio: &Path,
        location: Option<&LocationHint>,
    ) -> Result<Vec<RawDetection>> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map_or_else(|| "audio".to_string(), |n| n.to_string_lossy().into_owned());

        let mut form = Form::new().part("audio", Part::bytes(bytes).file_name(file_name));
        if let Some(hint) = location {
            form = form
                .text("lat", hint.latitude.to_string())
                .text("lon", hint.longitude.to_string())
                .text("week", hint.week.to_string());
        }

        let url = self.endpoint(CLASSIFY_PATH);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(url.clone(), e))?;

        let body: ClassifyResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.transport_error(url, e)
                } else {
                    Error::ClassifierInternal {
                        message: format!("invalid classification response: {e}"),
                    }
                }
            })?;

        Ok(body.detections)
    }

    async fn expected_species(
        &self,
        latitude: f64,
        longitude: f64,
        week: u32,
    ) -> Result<HashSet<String>> {
        let url = format!(
            "{}?lat={latitude}&lon={longitude}&week={week}",
            self.endpoint(SPECIES_PATH)
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(url.clone(), e))?;

        let body: SpeciesResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::ClassifierInternal {
                message: format!("invalid species response: {e}"),
            })?;

        Ok(body.species.into_iter().collect())
    }
}
