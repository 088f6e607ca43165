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

// VFS driver: every layer is a plain directory, children are full copies

use super::backend::GraphDriver;
use super::error::{DriverError, Result};
use super::registry::DriverRegistry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DRIVER_NAME: &str = "vfs";

/// Directory-copy graph driver
pub struct VfsDriver {
    home: PathBuf,
}

impl VfsDriver {
    pub fn new(home: &Path, options: &[String]) -> Result<Self> {
        if let Some(option) = options.first() {
            let key = option.split('=').next().unwrap_or_default();
            return Err(DriverError::InvalidOption {
                driver: DRIVER_NAME.to_string(),
                key: key.to_string(),
            });
        }

        let layers = home.join("dir");
        fs::create_dir_all(&layers)?;
        info!("Initialized vfs driver at: {}", home.display());

        Ok(Self {
            home: home.to_path_buf(),
        })
    }

    /// Register the vfs constructor with a registry
    pub fn register(registry: &mut DriverRegistry) -> Result<()> {
        registry.register(DRIVER_NAME, |home: &Path, options: &[String]| {
            Ok(Arc::new(VfsDriver::new(home, options)?) as Arc<dyn GraphDriver>)
        })
    }

    /// Directory of layer `id`, which must be a single plain path component
    fn layer_dir(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.home.join("dir").join(id))
    }
}

/// Ids name a directory directly under the layer store. Anything that could
/// resolve elsewhere (empty, `.`, `..`, separators, NUL) is refused.
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains('/') || id.contains('\0') {
        return Err(DriverError::InvalidLayerId(id.to_string()));
    }
    Ok(())
}

/// Copy a directory tree, keeping permissions and symlinks as they are
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    // Directory modes are applied last so read-only directories can be filled
    let mut dir_modes = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| DriverError::other(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| DriverError::other(e.to_string()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            let metadata = entry
                .metadata()
                .map_err(|e| DriverError::other(e.to_string()))?;
            dir_modes.push((target, metadata.permissions()));
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    for (dir, permissions) in dir_modes.into_iter().rev() {
        fs::set_permissions(dir, permissions)?;
    }
    Ok(())
}

impl GraphDriver for VfsDriver {
    fn create(&self, id: &str, parent: &str) -> Result<()> {
        let dir = self.layer_dir(id)?;

        let parent_dir = if parent.is_empty() {
            None
        } else {
            if parent == id {
                return Err(DriverError::other(format!(
                    "layer {} cannot be its own parent",
                    id
                )));
            }
            let parent_dir = self.layer_dir(parent)?;
            if !parent_dir.is_dir() {
                return Err(DriverError::LayerNotFound(parent.to_string()));
            }
            Some(parent_dir)
        };

        match fs::create_dir(&dir) {
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(DriverError::LayerExists(id.to_string()));
            }
            result => result?,
        }

        let Some(parent_dir) = parent_dir else {
            debug!("Created empty layer {} at {}", id, dir.display());
            return Ok(());
        };

        debug!("Copying layer {} into {}", parent, id);
        // `dir` was created above, so rolling it back cannot touch another layer
        if let Err(e) = copy_tree(&parent_dir, &dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        match fs::remove_dir_all(self.layer_dir(id)?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn get(&self, id: &str, _mount_label: &str) -> Result<PathBuf> {
        let dir = self.layer_dir(id)?;
        if !dir.is_dir() {
            return Err(DriverError::LayerNotFound(id.to_string()));
        }
        Ok(dir)
    }

    fn put(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    fn exists(&self, id: &str) -> bool {
        self.layer_dir(id).map(|dir| dir.is_dir()).unwrap_or(false)
    }

    fn status(&self) -> Vec<(String, String)> {
        vec![("Root Dir".to_string(), self.home.display().to_string())]
    }

    fn metadata(&self, id: &str) -> Result<HashMap<String, String>> {
        let dir = self.get(id, "")?;
        let mut metadata = HashMap::new();
        metadata.insert("Dir".to_string(), dir.display().to_string());
        Ok(metadata)
    }

    fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        DRIVER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_driver() -> (VfsDriver, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let driver = VfsDriver::new(&temp_dir.path().join("vfs"), &[]).unwrap();
        (driver, temp_dir)
    }

    #[test]
    fn test_new_creates_home() {
        let (driver, _temp_dir) = create_test_driver();
        assert!(driver.home.join("dir").is_dir());
    }

    #[test]
    fn test_rejects_options() {
        let temp_dir = TempDir::new().unwrap();
        let result = VfsDriver::new(temp_dir.path(), &["size=10G".to_string()]);
        match result {
            Err(DriverError::InvalidOption { key, .. }) => assert_eq!(key, "size"),
            _ => panic!("expected InvalidOption"),
        }
    }

    #[test]
    fn test_create_get_remove() {
        let (driver, _temp_dir) = create_test_driver();

        driver.create("base", "").unwrap();
        assert!(driver.exists("base"));

        let dir = driver.get("base", "").unwrap();
        assert_eq!(dir, driver.home.join("dir").join("base"));
        driver.put("base").unwrap();

        driver.remove("base").unwrap();
        assert!(!driver.exists("base"));
        // Removing twice is fine
        driver.remove("base").unwrap();
    }

    #[test]
    fn test_create_copies_parent() {
        let (driver, _temp_dir) = create_test_driver();
        driver.create("base", "").unwrap();

        let base = driver.get("base", "").unwrap();
        fs::create_dir_all(base.join("etc")).unwrap();
        fs::write(base.join("etc/hostname"), "layer").unwrap();
        std::os::unix::fs::symlink("hostname", base.join("etc/link")).unwrap();

        driver.create("child", "base").unwrap();
        let child = driver.get("child", "").unwrap();
        assert_eq!(fs::read_to_string(child.join("etc/hostname")).unwrap(), "layer");
        assert_eq!(
            fs::read_link(child.join("etc/link")).unwrap(),
            PathBuf::from("hostname")
        );

        // Layers are independent copies
        fs::write(child.join("etc/hostname"), "changed").unwrap();
        assert_eq!(fs::read_to_string(base.join("etc/hostname")).unwrap(), "layer");
    }

    #[test]
    fn test_create_missing_parent() {
        let (driver, _temp_dir) = create_test_driver();
        let result = driver.create("child", "missing");
        assert!(matches!(result, Err(DriverError::LayerNotFound(_))));
        assert!(!driver.exists("child"));
    }

    #[test]
    fn test_get_missing_layer() {
        let (driver, _temp_dir) = create_test_driver();
        assert!(driver.get("nope", "").is_err());
        assert!(driver.metadata("nope").is_err());
    }

    #[test]
    fn test_status_and_metadata() {
        let (driver, _temp_dir) = create_test_driver();
        driver.create("base", "").unwrap();

        let status = driver.status();
        assert_eq!(status[0].0, "Root Dir");

        let metadata = driver.metadata("base").unwrap();
        assert!(metadata["Dir"].ends_with("dir/base"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (driver, temp_dir) = create_test_driver();
        driver.create("L1", "").unwrap();

        let victim = temp_dir.path().join("victim");
        fs::create_dir_all(&victim).unwrap();
        let absolute = victim.to_string_lossy().to_string();

        for id in ["", ".", "..", "../victim", "../../victim", "a/b", absolute.as_str()] {
            assert!(
                matches!(driver.remove(id), Err(DriverError::InvalidLayerId(_))),
                "remove accepted {:?}",
                id
            );
            assert!(matches!(driver.create(id, ""), Err(DriverError::InvalidLayerId(_))));
            assert!(matches!(driver.get(id, ""), Err(DriverError::InvalidLayerId(_))));
            assert!(driver.metadata(id).is_err());
            assert!(!driver.exists(id));
        }

        // Neither the store nor anything outside it was touched
        assert!(victim.is_dir());
        assert!(driver.exists("L1"));
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let (driver, _temp_dir) = create_test_driver();
        let result = driver.create("child", "../vfs");
        assert!(matches!(result, Err(DriverError::InvalidLayerId(_))));
        assert!(!driver.exists("child"));
    }

    #[test]
    fn test_create_existing_layer_is_kept() {
        let (driver, _temp_dir) = create_test_driver();
        driver.create("base", "").unwrap();
        let base = driver.get("base", "").unwrap();
        fs::write(base.join("file"), "base").unwrap();
        std::os::unix::fs::symlink("file", base.join("link")).unwrap();

        driver.create("child", "base").unwrap();
        let child = driver.get("child", "").unwrap();
        fs::write(child.join("own"), "child").unwrap();

        let result = driver.create("child", "base");
        assert!(matches!(result, Err(DriverError::LayerExists(ref id)) if id == "child"));
        assert_eq!(fs::read_to_string(child.join("own")).unwrap(), "child");

        let result = driver.create("base", "");
        assert!(matches!(result, Err(DriverError::LayerExists(_))));
        assert_eq!(fs::read_to_string(base.join("file")).unwrap(), "base");
    }

    #[test]
    fn test_create_self_parent_rejected() {
        let (driver, _temp_dir) = create_test_driver();
        driver.create("base", "").unwrap();
        let base = driver.get("base", "").unwrap();
        fs::write(base.join("file"), "content").unwrap();

        assert!(driver.create("base", "base").is_err());
        assert_eq!(fs::read_to_string(base.join("file")).unwrap(), "content");
    }
}
