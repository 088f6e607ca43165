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

// Error type shared by graph drivers and the driver registry

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver not supported")]
    NotSupported,

    #[error("prerequisites for driver not satisfied (wrong filesystem?)")]
    PrerequisitesUnmet,

    #[error("backing file system is unsupported for this graph driver")]
    IncompatibleFilesystem,

    #[error("name already registered: {0}")]
    DuplicateName(String),

    #[error("no supported storage backend found")]
    NoSupportedBackend,

    #[error("unknown option {key} for {driver} driver")]
    InvalidOption { driver: String, key: String },

    #[error("layer {0} does not exist")]
    LayerNotFound(String),

    #[error("layer {0} already exists")]
    LayerExists(String),

    #[error("invalid layer id {0:?}")]
    InvalidLayerId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Soft errors mean "this driver does not fit this host"; selection moves
    /// on to the next candidate instead of failing.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            DriverError::NotSupported
                | DriverError::PrerequisitesUnmet
                | DriverError::IncompatibleFilesystem
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        DriverError::Other(message.into())
    }
}
