// Configuration module for the graph driver plugin
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable forcing the graph driver, ahead of any configured one
pub const DRIVER_ENV: &str = "DOCKER_DRIVER";

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PluginConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<PluginConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Let the environment override config values
pub fn apply_env_overrides(config: &mut PluginConfig) {
    if let Ok(driver) = std::env::var(DRIVER_ENV) {
        if !driver.is_empty() {
            config.driver.default_driver = Some(driver);
        }
    }
}
