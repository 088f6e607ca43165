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

// Graph driver trait for layer lifecycle management

use super::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Generic graph driver trait
///
/// This trait defines the capabilities a storage backend must offer so the
/// plugin can manage filesystem layers on behalf of the container runtime.
///
/// Methods are synchronous and may block on disk or device I/O. The plugin
/// never calls them from an async context directly.
///
/// Drivers are shared between concurrent requests without any locking.
/// Concurrent `get`/`put`/`remove` on the same layer id must be made safe by
/// the driver itself.
pub trait GraphDriver: Send + Sync {
    /// Create a new layer, optionally derived from `parent` (empty = no parent)
    fn create(&self, id: &str, parent: &str) -> Result<()>;

    /// Remove a layer and every resource attached to it
    fn remove(&self, id: &str) -> Result<()>;

    /// Make the layer available on the filesystem and return its mount path
    ///
    /// # Arguments
    /// * `id` - Layer id
    /// * `mount_label` - Security label to apply to the mount, may be empty
    ///
    /// Must be safe to call more than once; each call takes a reference
    /// that is released by `put`.
    fn get(&self, id: &str, mount_label: &str) -> Result<PathBuf>;

    /// Release one reference taken by `get`
    fn put(&self, id: &str) -> Result<()>;

    fn exists(&self, id: &str) -> bool;

    /// Free-form diagnostic pairs for display
    fn status(&self) -> Vec<(String, String)>;

    /// Backend specific facts about a layer
    fn metadata(&self, id: &str) -> Result<HashMap<String, String>>;

    /// Release every resource held by the driver before shutdown
    fn cleanup(&self) -> Result<()>;

    /// Get driver name identifier
    fn name(&self) -> &str;
}
