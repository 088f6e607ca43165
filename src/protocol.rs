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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Media type of every plugin response
pub const CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

/// Capability advertised by `Plugin.Activate`
pub const IMPLEMENTS_GRAPH_DRIVER: &str = "GraphDriver";

pub const ACTIVATE_PATH: &str = "/Plugin.Activate";
pub const CREATE_PATH: &str = "/GraphDriver.Create";
pub const REMOVE_PATH: &str = "/GraphDriver.Remove";
pub const GET_PATH: &str = "/GraphDriver.Get";
pub const PUT_PATH: &str = "/GraphDriver.Put";
pub const EXISTS_PATH: &str = "/GraphDriver.Exists";
pub const STATUS_PATH: &str = "/GraphDriver.Status";
pub const METADATA_PATH: &str = "/GraphDriver.GetMetadata";
pub const CLEANUP_PATH: &str = "/GraphDriver.Cleanup";

/// Operations served by the plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Activate,
    Create,
    Remove,
    Get,
    Put,
    Exists,
    Status,
    GetMetadata,
    Cleanup,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::Activate,
        Operation::Create,
        Operation::Remove,
        Operation::Get,
        Operation::Put,
        Operation::Exists,
        Operation::Status,
        Operation::GetMetadata,
        Operation::Cleanup,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Operation::Activate => ACTIVATE_PATH,
            Operation::Create => CREATE_PATH,
            Operation::Remove => REMOVE_PATH,
            Operation::Get => GET_PATH,
            Operation::Put => PUT_PATH,
            Operation::Exists => EXISTS_PATH,
            Operation::Status => STATUS_PATH,
            Operation::GetMetadata => METADATA_PATH,
            Operation::Cleanup => CLEANUP_PATH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Activate => "activate",
            Operation::Create => "create",
            Operation::Remove => "remove",
            Operation::Get => "get",
            Operation::Put => "put",
            Operation::Exists => "exists",
            Operation::Status => "status",
            Operation::GetMetadata => "get_metadata",
            Operation::Cleanup => "cleanup",
        }
    }
}

/// Request body sent by the container runtime
///
/// The runtime sends `ID`, `Parent` and `MountLabel`; lower and camel case
/// spellings are accepted too. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LayerRequest {
    #[serde(rename = "ID", alias = "id", alias = "Id", default)]
    pub id: String,
    #[serde(rename = "Parent", alias = "parent", default)]
    pub parent: String,
    #[serde(
        rename = "MountLabel",
        alias = "mountLabel",
        alias = "mount_label",
        default
    )]
    pub mount_label: String,
}

/// Response for `Plugin.Activate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivateResponse {
    #[serde(rename = "Implements")]
    pub implements: Vec<String>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![IMPLEMENTS_GRAPH_DRIVER.to_string()],
        }
    }
}

/// Response body for every graph driver operation
///
/// At most one field is set; an empty response serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LayerResponse {
    #[serde(rename = "Dir", skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(rename = "Exists", skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(rename = "Status", skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<(String, String)>>,
    #[serde(rename = "Metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(rename = "Err", skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl LayerResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn dir(dir: String) -> Self {
        Self {
            dir: Some(dir),
            ..Self::default()
        }
    }

    pub fn exists(exists: bool) -> Self {
        Self {
            exists: Some(exists),
            ..Self::default()
        }
    }

    pub fn status(status: Vec<(String, String)>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn metadata(metadata: HashMap<String, String>) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            err: Some(message),
            ..Self::default()
        }
    }
}
