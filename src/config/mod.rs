// Configuration management module
// TOML settings plus interactive setup

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV, ChatConfig, Config, ConfigError, EmbeddingBackend, EmbeddingConfig, StoreBackend,
    StoreConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
