// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for the graph driver plugin

use serde::{Deserialize, Serialize};

use crate::driver::DEFAULT_PRIORITY;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub plugin: PluginSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Driver selection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    /// Root of the graph; each driver gets `<root>/<driver name>`
    #[serde(default = "default_root")]
    pub root: String,

    /// Raw `key=value` options handed to the driver constructor
    #[serde(default)]
    pub options: Vec<String>,

    /// Force this driver instead of running selection
    #[serde(default)]
    pub default_driver: Option<String>,

    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            options: Vec::new(),
            default_driver: None,
            priority: default_priority(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Unix,
    Tcp,
}

/// How the plugin is reached by the container runtime
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginSettings {
    /// Plugin name, used for the `.spec` file in TCP mode
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub transport: TransportKind,

    /// Unix: socket name or absolute path. TCP: `host:port`
    #[serde(default = "default_name")]
    pub address: String,

    /// Owning group of the unix socket
    #[serde(default = "default_group")]
    pub group: Option<String>,

    #[serde(default = "default_sock_dir")]
    pub sock_dir: String,

    #[serde(default = "default_spec_dir")]
    pub spec_dir: String,

    /// Answer `GraphDriver.Status` with the driver's own status pairs.
    /// When false the plugin answers with an empty object.
    #[serde(default)]
    pub status_from_driver: bool,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            transport: TransportKind::default(),
            address: default_name(),
            group: default_group(),
            sock_dir: default_sock_dir(),
            spec_dir: default_spec_dir(),
            status_from_driver: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,  // "trace", "debug", "info", "warn", "error"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_root() -> String { "/var/lib/docker".to_string() }
fn default_priority() -> Vec<String> { DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect() }
fn default_name() -> String { "graphdriver".to_string() }
fn default_group() -> Option<String> { Some("root".to_string()) }
fn default_sock_dir() -> String { "/run/docker/plugins".to_string() }
fn default_spec_dir() -> String { "/etc/docker/plugins".to_string() }
fn default_log_level() -> String { "info".to_string() }
