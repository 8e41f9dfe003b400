//! Configuration file loading.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file.
///
/// Returns default config if the file does not exist.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load configuration from an explicit path, or the platform default.
///
/// An explicit path that does not exist is an error; a missing default
/// file yields the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) if !path.exists() => Err(Error::ConfigRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }),
        Some(path) => load_config_file(path),
        None => load_default_config(),
    }
}

/// Load configuration from the default platform-specific path.
///
/// Returns default config if no config file exists.
pub fn load_default_config() -> Result<Config> {
    super::config_file_path().map_or_else(|_| Ok(Config::default()), |path| load_config_file(&path))
}

/// Save configuration to a TOML file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    std::fs::write(path, contents).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::BackendMode;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_nonexistent_file_returns_default() {
        let config = load_config_file(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(matches!(result, Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8000
max_upload_bytes = 52428800

[backend]
mode = "remote"
url = "http://birdnet:8080"
request_timeout_secs = 30

[backend.process]
command = "python3"
args = ["-m", "birdnet_analyzer.server", "--port", "8080"]
env = {{ LC_ALL = "C.UTF-8" }}

[results]
min_confidence = 0.03
max_results = 15
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.backend.mode, BackendMode::Remote);
        assert_eq!(config.backend.url, "http://birdnet:8080");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.backend.poll_interval_ms, 1000);
        let process = config.backend.process.unwrap();
        assert_eq!(process.command, "python3");
        assert_eq!(process.env.get("LC_ALL").map(String::as_str), Some("C.UTF-8"));
        assert_eq!(config.results.min_confidence, 0.03);
        assert_eq!(config.results.max_results, 15);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = load_config_file(file.path());
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.port = 9000;
        save_config(&config, &path).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.server.port, 9000);
    }
}
