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

// Socket binding and discovery publication
//
// The runtime finds plugins through the filesystem: either the unix socket
// itself under the plugin socket directory, or a `.spec` file naming a TCP
// address. Both are in place before the first connection is accepted.

use anyhow::{anyhow, bail, Context, Result};
use axum::Router;
use std::fs;
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::net::{TcpListener, UnixListener};
use tracing::{info, warn};

use crate::config::{PluginSettings, TransportKind};

/// Resolve the unix socket path for `address`
///
/// Absolute paths are used as they are; anything else names a socket
/// `<sock_dir>/<address>.sock`.
pub fn socket_path(sock_dir: &Path, address: &str) -> PathBuf {
    let path = Path::new(address);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        sock_dir.join(format!("{}.sock", address))
    }
}

/// Path of the discovery file for a TCP plugin
pub fn spec_path(spec_dir: &Path, name: &str) -> PathBuf {
    spec_dir.join(format!("{}.spec", name))
}

/// Bind a unix socket readable and writable by owner and `group` only
pub fn bind_unix(path: &Path, group: Option<&str>) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create socket directory {}", parent.display()))?;
    }

    remove_stale_socket(path)?;

    let gid = match group {
        Some(name) => Some(
            users::get_group_by_name(name)
                .ok_or_else(|| anyhow!("Group {} not found", name))?
                .gid(),
        ),
        None => None,
    };

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind socket {}", path.display()))?;

    if gid.is_some() {
        std::os::unix::fs::chown(path, None, gid)
            .with_context(|| format!("Failed to change group of {}", path.display()))?;
    }
    fs::set_permissions(path, fs::Permissions::from_mode(0o660))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))?;

    Ok(listener)
}

/// Clear the way for binding at `path`
///
/// Only a socket nobody answers on is removed. Any other file, or a socket
/// that still accepts connections, is left alone and reported.
fn remove_stale_socket(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to inspect {}", path.display()));
        }
    };

    if !metadata.file_type().is_socket() {
        bail!("{} exists and is not a socket", path.display());
    }
    if std::os::unix::net::UnixStream::connect(path).is_ok() {
        bail!("Socket {} is in use by another process", path.display());
    }

    warn!("Removing stale socket {}", path.display());
    fs::remove_file(path)
        .with_context(|| format!("Failed to remove stale socket {}", path.display()))
}

/// Write `<spec_dir>/<name>.spec` pointing at `addr`
///
/// The file is written next to its destination and renamed into place, so
/// readers never see a partial URL.
pub fn write_spec(spec_dir: &Path, name: &str, addr: SocketAddr) -> Result<PathBuf> {
    fs::create_dir_all(spec_dir)
        .with_context(|| format!("Failed to create spec directory {}", spec_dir.display()))?;

    let path = spec_path(spec_dir, name);
    let mut file = tempfile::NamedTempFile::new_in(spec_dir)
        .context("Failed to create temporary spec file")?;
    write!(file, "tcp://{}", addr).context("Failed to write spec file")?;
    file.as_file()
        .set_permissions(fs::Permissions::from_mode(0o644))
        .context("Failed to set spec file permissions")?;
    file.persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to publish spec file {}", path.display()))?;

    Ok(path)
}

enum BoundSocket {
    Unix(UnixListener),
    Tcp(TcpListener),
}

/// A bound listener whose discovery artifact is already published
pub struct PluginListener {
    socket: BoundSocket,
    artifact: PathBuf,
}

impl PluginListener {
    /// Bind the configured socket and publish its discovery artifact
    pub async fn bind(settings: &PluginSettings) -> Result<Self> {
        match settings.transport {
            TransportKind::Unix => {
                let path = socket_path(Path::new(&settings.sock_dir), &settings.address);
                let listener = bind_unix(&path, settings.group.as_deref())?;
                info!("Listening on unix socket {}", path.display());
                Ok(Self {
                    socket: BoundSocket::Unix(listener),
                    artifact: path,
                })
            }
            TransportKind::Tcp => {
                let listener = TcpListener::bind(&settings.address)
                    .await
                    .with_context(|| format!("Failed to bind {}", settings.address))?;
                let addr = listener.local_addr()?;
                let spec = write_spec(Path::new(&settings.spec_dir), &settings.name, addr)?;
                info!("Listening on tcp://{} (spec file {})", addr, spec.display());
                Ok(Self {
                    socket: BoundSocket::Tcp(listener),
                    artifact: spec,
                })
            }
        }
    }

    /// Socket file or spec file advertising this listener
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            BoundSocket::Unix(_) => None,
        }
    }

    /// Serve `router` until `shutdown` resolves, then withdraw the artifact
    pub async fn serve<F>(self, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = match self.socket {
            BoundSocket::Unix(listener) => {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await
            }
            BoundSocket::Tcp(listener) => {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await
            }
        };

        if let Err(e) = fs::remove_file(&self.artifact) {
            warn!("Failed to remove {}: {}", self.artifact.display(), e);
        }

        served.context("Plugin server failed")
    }
}
