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

// Out-of-process graph driver plugin
//
// Lets a container runtime hand layer lifecycle management to a storage
// driver running in this process:
// - Picks one driver from a registry (override, priority list, fallback)
// - Serves the GraphDriver plugin protocol over HTTP
// - Listens on a unix socket or TCP, publishing the socket or a spec file
//   for discovery before accepting connections

pub mod config;
pub mod driver;
pub mod handler;
pub mod protocol;
pub mod transport;

// Re-export main types
pub use config::{load_config, load_config_with_env, PluginConfig};
pub use driver::{DriverError, DriverRegistry, GraphDriver, VfsDriver};
pub use handler::{Handler, OperationCounters};
pub use protocol::{ActivateResponse, LayerRequest, LayerResponse, Operation};
pub use transport::PluginListener;
