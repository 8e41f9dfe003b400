//! Configuration validation.

use crate::config::{BackendMode, Config, ModelConfig};
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_backend(config)?;
    validate_results(config)?;
    if config.backend.mode == BackendMode::Local {
        let model = config.model.as_ref().ok_or_else(|| Error::ConfigValidation {
            message: "backend.mode = \"local\" requires a [model] section".to_string(),
        })?;
        validate_model_config(model)?;
    }
    Ok(())
}

fn validation(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.max_upload_bytes == 0 {
        return Err(validation("server.max_upload_bytes must be at least 1"));
    }
    if config.server.host.trim().is_empty() {
        return Err(validation("server.host must not be empty"));
    }
    Ok(())
}

fn validate_backend(config: &Config) -> Result<()> {
    let backend = &config.backend;

    if backend.mode == BackendMode::Remote {
        let url = reqwest::Url::parse(&backend.url)
            .map_err(|e| validation(format!("backend.url '{}' is invalid: {e}", backend.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(validation(format!(
                "backend.url must use http or https, got '{}'",
                url.scheme()
            )));
        }
    }

    for (name, value) in [
        ("request_timeout_secs", backend.request_timeout_secs),
        ("ready_timeout_secs", backend.ready_timeout_secs),
        ("filter_timeout_secs", backend.filter_timeout_secs),
        ("poll_interval_ms", backend.poll_interval_ms),
    ] {
        if value == 0 {
            return Err(validation(format!("backend.{name} must be at least 1")));
        }
    }

    if let Some(process) = &backend.process
        && process.command.trim().is_empty()
    {
        return Err(validation("backend.process.command must not be empty"));
    }

    Ok(())
}

fn validate_results(config: &Config) -> Result<()> {
    let results = &config.results;

    if !(confidence::MIN..=confidence::MAX).contains(&results.min_confidence) {
        return Err(validation(format!(
            "results.min_confidence must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            results.min_confidence
        )));
    }

    if results.max_results == 0 {
        return Err(validation("results.max_results must be at least 1"));
    }

    Ok(())
}

/// Validate an in-process model configuration and check files exist.
pub fn validate_model_config(model: &ModelConfig) -> Result<()> {
    if !model.path.exists() {
        return Err(Error::ModelFileNotFound {
            path: model.path.clone(),
        });
    }

    if !model.labels.exists() {
        return Err(Error::LabelsFileNotFound {
            path: model.labels.clone(),
        });
    }

    if let Some(meta_path) = &model.meta_model
        && !meta_path.exists()
    {
        return Err(Error::MetaModelNotFound {
            path: meta_path.clone(),
        });
    }

    if model.batch_size == 0 {
        return Err(validation("model.batch_size must be at least 1"));
    }

    if model.overlap < 0.0 {
        return Err(validation(format!(
            "model.overlap must be non-negative, got {}",
            model.overlap
        )));
    }

    if !(confidence::MIN..=confidence::MAX).contains(&model.range_threshold) {
        return Err(validation(format!(
            "model.range_threshold must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            model.range_threshold
        )));
    }

    Ok(())
}
