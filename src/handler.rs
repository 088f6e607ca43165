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

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::driver::{self, GraphDriver};
use crate::protocol::{ActivateResponse, LayerRequest, LayerResponse, Operation, CONTENT_TYPE};

/// Per-operation call counts, for diagnostics only
///
/// A request is counted once it has been decoded and handed to the driver,
/// whatever the driver returns. Rejected requests are not counted.
#[derive(Debug, Default)]
pub struct OperationCounters {
    counts: [AtomicU64; Operation::ALL.len()],
}

impl OperationCounters {
    fn slot(&self, op: Operation) -> &AtomicU64 {
        &self.counts[op as usize]
    }

    pub fn increment(&self, op: Operation) {
        self.slot(op).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, op: Operation) -> u64 {
        self.slot(op).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        Operation::ALL
            .iter()
            .map(|op| (op.as_str(), self.get(*op)))
            .collect()
    }
}

/// Forwards requests from the container runtime to the graph driver
#[derive(Clone)]
pub struct Handler {
    driver: Arc<dyn GraphDriver>,
    counters: Arc<OperationCounters>,
    status_from_driver: bool,
}

impl Handler {
    pub fn new(driver: Arc<dyn GraphDriver>) -> Self {
        Self {
            driver,
            counters: Arc::new(OperationCounters::default()),
            status_from_driver: false,
        }
    }

    /// Answer `GraphDriver.Status` with the driver's status pairs instead
    /// of an empty object
    pub fn with_status_from_driver(mut self, enabled: bool) -> Self {
        self.status_from_driver = enabled;
        self
    }

    pub fn driver(&self) -> Arc<dyn GraphDriver> {
        self.driver.clone()
    }

    pub fn counters(&self) -> Arc<OperationCounters> {
        self.counters.clone()
    }

    /// Build the HTTP router serving every plugin operation
    pub fn router(&self) -> Router {
        Router::new()
            .route(Operation::Activate.path(), post(activate))
            .route(Operation::Create.path(), post(create))
            .route(Operation::Remove.path(), post(remove))
            .route(Operation::Get.path(), post(get))
            .route(Operation::Put.path(), post(put))
            .route(Operation::Exists.path(), post(exists))
            .route(Operation::Status.path(), post(status))
            .route(Operation::GetMetadata.path(), post(get_metadata))
            .route(Operation::Cleanup.path(), post(cleanup))
            .with_state(self.clone())
    }

    /// Run a driver call on the blocking pool
    ///
    /// Driver errors come back as their message only.
    async fn call<T, F>(&self, op: Operation, f: F) -> Result<T, String>
    where
        F: FnOnce(&dyn GraphDriver) -> driver::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.counters.increment(op);
        let driver = self.driver.clone();

        match tokio::task::spawn_blocking(move || f(driver.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Driver {} failed: {}", op.as_str(), e);
                Err(e.to_string())
            }
            Err(e) => {
                error!("Driver {} did not complete: {}", op.as_str(), e);
                Err(format!("{} did not complete: {}", op.as_str(), e))
            }
        }
    }
}

fn reply<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn success(body: LayerResponse) -> Response {
    reply(StatusCode::OK, &body)
}

fn failure(message: String) -> Response {
    reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        &LayerResponse::error(message),
    )
}

/// Decode a request body, or build the failure response to send instead
fn decode(op: Operation, body: &[u8]) -> Result<LayerRequest, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected malformed {} request: {}", op.as_str(), e);
        failure(format!("invalid {} request: {}", op.as_str(), e))
    })
}

async fn activate(State(handler): State<Handler>) -> Response {
    handler.counters.increment(Operation::Activate);
    debug!("Plugin activated");
    reply(StatusCode::OK, &ActivateResponse::default())
}

async fn create(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::Create, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    debug!("Create layer {} (parent '{}')", req.id, req.parent);

    match handler
        .call(Operation::Create, move |d| d.create(&req.id, &req.parent))
        .await
    {
        Ok(()) => success(LayerResponse::empty()),
        Err(message) => failure(message),
    }
}

async fn remove(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::Remove, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    debug!("Remove layer {}", req.id);

    match handler
        .call(Operation::Remove, move |d| d.remove(&req.id))
        .await
    {
        Ok(()) => success(LayerResponse::empty()),
        Err(message) => failure(message),
    }
}

async fn get(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::Get, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    debug!("Get layer {} (mount label '{}')", req.id, req.mount_label);

    match handler
        .call(Operation::Get, move |d| d.get(&req.id, &req.mount_label))
        .await
    {
        Ok(dir) => match dir.to_str() {
            Some(path) => success(LayerResponse::dir(path.to_string())),
            None => failure(format!("non-UTF-8 mount path {}", dir.display())),
        },
        Err(message) => failure(message),
    }
}

async fn put(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::Put, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    debug!("Put layer {}", req.id);

    match handler.call(Operation::Put, move |d| d.put(&req.id)).await {
        Ok(()) => success(LayerResponse::empty()),
        Err(message) => failure(message),
    }
}

async fn exists(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::Exists, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    match handler
        .call(Operation::Exists, move |d| Ok(d.exists(&req.id)))
        .await
    {
        Ok(found) => success(LayerResponse::exists(found)),
        Err(message) => failure(message),
    }
}

async fn status(State(handler): State<Handler>) -> Response {
    if !handler.status_from_driver {
        handler.counters.increment(Operation::Status);
        return success(LayerResponse::empty());
    }

    match handler
        .call(Operation::Status, |d| Ok(d.status()))
        .await
    {
        Ok(pairs) => success(LayerResponse::status(pairs)),
        Err(message) => failure(message),
    }
}

async fn get_metadata(State(handler): State<Handler>, body: Bytes) -> Response {
    let req = match decode(Operation::GetMetadata, &body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    match handler
        .call(Operation::GetMetadata, move |d| d.metadata(&req.id))
        .await
    {
        Ok(metadata) => success(LayerResponse::metadata(metadata)),
        Err(message) => failure(message),
    }
}

async fn cleanup(State(handler): State<Handler>) -> Response {
    match handler.call(Operation::Cleanup, |d| d.cleanup()).await {
        Ok(()) => success(LayerResponse::empty()),
        Err(message) => failure(message),
    }
}
