//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config, load_config_file, load_default_config, save_config};
pub use paths::{config_dir, config_file_path, resolve_config_path};
pub use types::{
    BackendConfig, BackendMode, Config, InferenceDevice, ModelConfig, ProcessConfig,
    ResultsConfig, ServerConfig,
};
pub use validate::{validate_config, validate_model_config};
