// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PluginConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        let config = Self::parse(&content)?;
        Self::validate(&config)?;

        Ok(config)
    }

    /// Parse YAML content after substituting environment variables
    pub fn parse(content: &str) -> Result<PluginConfig> {
        let content = Self::substitute_env_vars(content)?;
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${GRAPH_ROOT:-/var/lib/docker} -> /var/lib/docker (if GRAPH_ROOT not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &PluginConfig) -> Result<()> {
        if config.driver.root.is_empty() {
            bail!("driver.root cannot be empty");
        }

        for option in &config.driver.options {
            match option.split_once('=') {
                Some((key, _)) if !key.trim().is_empty() => {}
                _ => bail!("driver.options entry '{}' must be key=value", option),
            }
        }

        if config.driver.priority.iter().any(|name| name.is_empty()) {
            bail!("driver.priority cannot contain empty names");
        }

        if config.plugin.name.is_empty() {
            bail!("plugin.name cannot be empty");
        }

        if config.plugin.address.is_empty() {
            bail!("plugin.address cannot be empty");
        }

        if config.plugin.transport == TransportKind::Tcp && !config.plugin.address.contains(':') {
            bail!(
                "plugin.address '{}' must be host:port for tcp transport",
                config.plugin.address
            );
        }

        if matches!(config.plugin.group.as_deref(), Some("")) {
            bail!("plugin.group cannot be empty, omit it or set it to null instead");
        }

        match config.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            unknown => bail!("Unknown logging.level: '{}'", unknown),
        }

        Ok(())
    }
}
