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

// Graph driver module
//
// Provides the trait every layer storage backend implements, the
// registry that knows how to construct them, and the selection policy
// that picks exactly one driver for the process.
//
// Concrete drivers live next to the registry. Only `vfs` ships here;
// other drivers register themselves through `DriverRegistry::register`.

pub mod backend;
pub mod error;
pub mod registry;
pub mod vfs;

pub use backend::GraphDriver;
pub use error::{DriverError, Result};
pub use registry::{DriverRegistry, InitFunc, DEFAULT_PRIORITY};
pub use vfs::VfsDriver;
