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

// Driver registry and selection policy

use super::backend::GraphDriver;
use super::error::{DriverError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drivers tried first, in this order, when no override is given
pub const DEFAULT_PRIORITY: &[&str] = &["vfs", "rbd"];

/// Constructor for a driver: receives the driver home directory and the
/// raw `key=value` options.
pub type InitFunc = Box<dyn Fn(&Path, &[String]) -> Result<Arc<dyn GraphDriver>> + Send + Sync>;

struct DriverDescriptor {
    name: String,
    init: InitFunc,
}

/// Set of known drivers plus the priority order used by `select`
///
/// Built once at startup and passed by reference; independent registries
/// never see each other's drivers.
pub struct DriverRegistry {
    drivers: Vec<DriverDescriptor>,
    priority: Vec<String>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::with_priority(DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_priority(priority: Vec<String>) -> Self {
        Self {
            drivers: Vec::new(),
            priority,
        }
    }

    /// Register a driver constructor under `name`
    ///
    /// Nothing is constructed here. A second registration of the same name
    /// fails and leaves the first one in place.
    pub fn register<F>(&mut self, name: &str, init: F) -> Result<()>
    where
        F: Fn(&Path, &[String]) -> Result<Arc<dyn GraphDriver>> + Send + Sync + 'static,
    {
        if self.contains(name) {
            return Err(DriverError::DuplicateName(name.to_string()));
        }
        debug!("Registered graph driver '{}'", name);
        self.drivers.push(DriverDescriptor {
            name: name.to_string(),
            init: Box::new(init),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.iter().any(|d| d.name == name)
    }

    /// Registered driver names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.drivers.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Construct the named driver with home directory `<root>/<name>`
    pub fn get_driver(
        &self,
        name: &str,
        root: &Path,
        options: &[String],
    ) -> Result<Arc<dyn GraphDriver>> {
        let descriptor = self
            .drivers
            .iter()
            .find(|d| d.name == name)
            .ok_or(DriverError::NotSupported)?;
        (descriptor.init)(&root.join(name), options)
    }

    /// Pick the driver for this process
    ///
    /// An override constructs only that driver and returns its error as is.
    /// Otherwise the priority list is tried in order, then every other
    /// registered driver. Soft errors move on to the next candidate, any
    /// other error stops selection.
    pub fn select(
        &self,
        root: &Path,
        options: &[String],
        override_name: Option<&str>,
    ) -> Result<Arc<dyn GraphDriver>> {
        if let Some(name) = override_name.filter(|n| !n.is_empty()) {
            info!("Using forced graph driver '{}'", name);
            return self.get_driver(name, root, options);
        }

        for name in &self.priority {
            if let Some(driver) = self.try_candidate(name, root, options)? {
                return Ok(driver);
            }
        }

        for descriptor in &self.drivers {
            if self.priority.contains(&descriptor.name) {
                continue;
            }
            if let Some(driver) = self.try_candidate(&descriptor.name, root, options)? {
                return Ok(driver);
            }
        }

        Err(DriverError::NoSupportedBackend)
    }

    /// `Ok(None)` on a soft failure, so the caller keeps looking
    fn try_candidate(
        &self,
        name: &str,
        root: &Path,
        options: &[String],
    ) -> Result<Option<Arc<dyn GraphDriver>>> {
        match self.get_driver(name, root, options) {
            Ok(driver) => {
                info!("Selected graph driver '{}'", name);
                Ok(Some(driver))
            }
            Err(e) if e.is_soft() => {
                warn!("Skipping graph driver '{}': {}", name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
