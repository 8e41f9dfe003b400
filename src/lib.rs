//! Birda Gateway - HTTP front end for `BirdNET` bird species detection.
//!
//! Accepts uploaded audio clips, classifies them with a remote or
//! in-process `BirdNET` backend and returns a ranked species list.

#![warn(missing_docs)]

pub mod analysis;
pub mod audio;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod server;
pub mod supervisor;
pub mod utils;

use clap::Parser;
use classifier::{Classifier, HttpClassifier, OnnxClassifier};
use cli::{Cli, Command, ConfigAction, ServeArgs};
use config::{
    BackendMode, Config, load_config, resolve_config_path, save_config, validate_config,
};
use gateway::{AnalysisGateway, GatewaySettings};
use server::AppState;
use std::path::Path;
use std::sync::Arc;
use supervisor::{ClassifierSupervisor, SupervisorSettings};
use tracing::info;

pub use error::{Error, Result};

/// Main entry point for the gateway binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.serve.verbose, cli.serve.quiet);

    if let Some(Command::Config { action }) = cli.command {
        return handle_config_command(action, cli.serve.config.as_deref());
    }

    let mut config = load_config(cli.serve.config.as_deref())?;
    apply_overrides(&mut config, &cli.serve);
    validate_config(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

/// Start the backend supervisor and serve HTTP until shutdown.
pub async fn serve(config: Config) -> Result<()> {
    let settings = GatewaySettings::from_config(&config)?;
    let classifier = build_classifier(&config)?;

    info!(
        "Starting {} v{} ({} backend)",
        constants::APP_NAME,
        env!("CARGO_PKG_VERSION"),
        classifier.kind()
    );

    let supervisor = ClassifierSupervisor::new(
        Arc::clone(&classifier),
        SupervisorSettings::from(&config.backend),
    );
    supervisor.start().await?;

    let gateway = AnalysisGateway::new(classifier, supervisor.readiness(), settings);
    let addr = listen_addr(&config.server.host, config.server.port);
    let served = server::serve(&addr, AppState::new(gateway)).await;

    supervisor.stop().await;
    served
}

fn build_classifier(config: &Config) -> Result<Arc<dyn Classifier>> {
    match config.backend.mode {
        BackendMode::Remote => {
            info!("Using remote classifier at {}", config.backend.url);
            Ok(Arc::new(HttpClassifier::new(
                &config.backend.url,
                config.backend.request_timeout(),
            )?))
        }
        BackendMode::Local => {
            let model = config.model.clone().ok_or_else(|| Error::ConfigValidation {
                message: "backend.mode = \"local\" requires a [model] section".to_string(),
            })?;

            birdnet_onnx::init_runtime().map_err(|e| Error::RuntimeInitialization {
                reason: e.to_string(),
            })?;

            Ok(Arc::new(OnnxClassifier::new(model)))
        }
    }
}

fn listen_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut Config, args: &ServeArgs) {
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(limit) = args.max_upload_bytes {
        config.server.max_upload_bytes = limit;
    }
    if let Some(mode) = args.mode {
        config.backend.mode = mode;
    }
    if let Some(url) = &args.backend_url {
        config.backend.url.clone_from(url);
    }
    if let Some(secs) = args.request_timeout {
        config.backend.request_timeout_secs = secs;
    }
    if let Some(secs) = args.ready_timeout {
        config.backend.ready_timeout_secs = secs;
    }
    if let Some(min_confidence) = args.min_confidence {
        config.results.min_confidence = min_confidence;
    }
    if let Some(max_results) = args.max_results {
        config.results.max_results = max_results;
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default; provider fallback in auto mode is expected.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off,tower_http=info".to_string(),
            1 => "debug,ort=warn,hyper=info".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).init();
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(explicit)?;

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  Set [backend] url, or mode = \"local\" with a [model] section");
            }
        }
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            let contents = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{contents}");
        }
        ConfigAction::Path => println!("{}", path.display()),
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr() {
        assert_eq!(listen_addr("0.0.0.0", 5000), "0.0.0.0:5000");
        assert_eq!(listen_addr("::1", 5000), "[::1]:5000");
        assert_eq!(listen_addr("[::1]", 5000), "[::1]:5000");
    }

    #[test]
    fn test_cli_overrides_file_config() {
        let cli = Cli::try_parse_from([
            "birda-gateway",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--backend-url",
            "http://classifier:8080",
            "--max-results",
            "3",
        ])
        .unwrap();

        let mut config = Config::default();
        config.results.min_confidence = 0.4;
        apply_overrides(&mut config, &cli.serve);

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend.url, "http://classifier:8080");
        assert_eq!(config.results.max_results, 3);
        assert_eq!(config.results.min_confidence, 0.4);
    }

    #[test]
    fn test_local_mode_without_model_is_rejected() {
        let mut config = Config::default();
        config.backend.mode = BackendMode::Local;
        assert!(matches!(
            build_classifier(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_remote_classifier_built() {
        let classifier = build_classifier(&Config::default()).unwrap();
        assert_eq!(classifier.kind(), classifier::ClassifierKind::Remote);
    }
}
