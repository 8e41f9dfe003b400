//! Reading the `/analyze` multipart body.

use crate::analysis::LocationFields;
use crate::error::{Error, Result};
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tracing::debug;

/// The audio part of an upload.
#[derive(Debug, Clone, Default)]
pub struct AudioUpload {
    /// Client-declared file name.
    pub file_name: Option<String>,
    /// Client-declared content type.
    pub content_type: Option<String>,
    /// Bytes received, at most the upload limit.
    pub data: Vec<u8>,
    /// Total size of the part as sent.
    pub size: u64,
}

/// Parsed `/analyze` request.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeForm {
    /// The `audio` part, if sent.
    pub audio: Option<AudioUpload>,
    /// `lat`, `lon`, `week` and `date` fields.
    pub location: LocationFields,
    /// The body hit the transport limit before it was fully read.
    pub body_truncated: bool,
}

impl AnalyzeForm {
    /// Read all parts. Audio bytes beyond `max_upload_bytes` are counted but
    /// not kept, so the size check can run after the readiness gate.
    pub async fn read(mut multipart: Multipart, max_upload_bytes: u64) -> Result<Self> {
        let mut form = Self::default();

        loop {
            let mut field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return form.on_error(&e),
            };

            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "audio" if form.audio.is_some() => {
                    return Err(Error::InvalidRequest {
                        message: "Exactly one audio file is allowed".to_string(),
                    });
                }
                "audio" => {
                    let mut audio = AudioUpload {
                        file_name: field.file_name().map(str::to_string),
                        content_type: field.content_type().map(str::to_string),
                        ..AudioUpload::default()
                    };

                    loop {
                        match field.chunk().await {
                            Ok(Some(chunk)) => {
                                audio.size += chunk.len() as u64;
                                if audio.size <= max_upload_bytes {
                                    audio.data.extend_from_slice(&chunk);
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                form.audio = Some(audio);
                                return form.on_error(&e);
                            }
                        }
                    }
                    form.audio = Some(audio);
                }
                "lat" | "lon" | "week" | "date" => {
                    let value = match field.text().await {
                        Ok(value) => value,
                        Err(e) => return form.on_error(&e),
                    };
                    let slot = match name.as_str() {
                        "lat" => &mut form.location.lat,
                        "lon" => &mut form.location.lon,
                        "week" => &mut form.location.week,
                        _ => &mut form.location.date,
                    };
                    *slot = Some(value);
                }
                other => debug!("Ignoring multipart field '{other}'"),
            }
        }

        Ok(form)
    }

    fn on_error(mut self, error: &MultipartError) -> Result<Self> {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            self.body_truncated = true;
            return Ok(self);
        }
        Err(Error::InvalidRequest {
            message: format!("malformed multipart body: {}", error.body_text()),
        })
    }
}
