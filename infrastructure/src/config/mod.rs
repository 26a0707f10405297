//! Configuration file loading for horo
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables: `HORO_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./horo.toml` or `./.horo.toml`
//! 4. Global: `$XDG_CONFIG_HOME/horo/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAuthConfig, FileConfig, FileLoggingConfig, FileReconnectConfig,
    FileServerConfig, FileSessionConfig,
};
pub use loader::ConfigLoader;
