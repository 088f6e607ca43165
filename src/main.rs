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

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use graphdriver_plugin::config::{apply_env_overrides, ConfigLoader, TransportKind};
use graphdriver_plugin::{load_config, DriverRegistry, Handler, PluginConfig, PluginListener, VfsDriver};

/// Graph driver plugin - serve layer storage to a container runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short = 'D', long)]
    debug: bool,

    /// Set the logging level
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Path to use as the root of the graph driver
    #[arg(short = 'g', long)]
    graph: Option<String>,

    /// Set storage driver options (key=value, repeatable)
    #[arg(long = "storage-opt")]
    storage_opts: Vec<String>,

    /// Force the plugin to use a specific storage driver
    #[arg(short = 's', long)]
    storage_driver: Option<String>,

    /// Transport to listen on: unix or tcp
    #[arg(long)]
    transport: Option<String>,

    /// Socket name, socket path or host:port to listen on
    #[arg(short, long)]
    address: Option<String>,
}

impl Args {
    /// Command line flags win over the configuration file
    fn apply(&self, config: &mut PluginConfig) -> Result<()> {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }
        if let Some(graph) = &self.graph {
            config.driver.root = graph.clone();
        }
        if !self.storage_opts.is_empty() {
            config.driver.options = self.storage_opts.clone();
        }
        if let Some(driver) = &self.storage_driver {
            config.driver.default_driver = Some(driver.clone());
        }
        if let Some(transport) = &self.transport {
            config.plugin.transport = match transport.as_str() {
                "unix" => TransportKind::Unix,
                "tcp" => TransportKind::Tcp,
                other => bail!("Unknown transport '{}', expected unix or tcp", other),
            };
        }
        if let Some(address) = &self.address {
            config.plugin.address = address.clone();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PluginConfig::default(),
    };
    args.apply(&mut config)?;
    apply_env_overrides(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    // Initialize tracing with configured level
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => bail!("Unable to parse logging level: {}", other),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting graph driver plugin");
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    }
    info!("Graph root: {}", config.driver.root);

    let mut registry = DriverRegistry::with_priority(config.driver.priority.clone());
    VfsDriver::register(&mut registry)?;

    let driver = registry
        .select(
            Path::new(&config.driver.root),
            &config.driver.options,
            config.driver.default_driver.as_deref(),
        )
        .context("Failed to create graph driver")?;
    info!("Graph driver initialized: {}", driver.name());

    let handler = Handler::new(driver.clone())
        .with_status_from_driver(config.plugin.status_from_driver);

    let listener = PluginListener::bind(&config.plugin).await?;
    info!("Discovery artifact published at {}", listener.artifact().display());

    listener
        .serve(handler.router(), shutdown_signal())
        .await?;

    // Cleanup
    tokio::task::spawn_blocking(move || driver.cleanup())
        .await
        .context("Driver cleanup did not complete")?
        .context("Driver cleanup failed")?;

    for (operation, count) in handler.counters().snapshot() {
        info!("{} requests: {}", operation, count);
    }
    info!("Graph driver plugin shut down successfully");

    Ok(())
}
