// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// One JSON-RPC 2.0 call inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Batch-local identifier used to match the response entry back
    /// to the submitted call.
    pub id: u64,
    /// Method name, e.g. `eth_getBlockByNumber`.
    pub method: String,
    /// Positional parameters.
    pub params: Value,
}

impl RpcRequest {
    /// Builds a request with the given batch-local id.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// One entry of a JSON-RPC batch response.
///
/// Endpoints answer batch entries in arbitrary order; the `id` field
/// is the only link back to the submitted call. A `null` `id` can
/// appear on protocol-level errors and matches no call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Id of the call this entry answers, if the endpoint echoed one.
    #[serde(default)]
    pub id: Option<u64>,
    /// Call result; `Value::Null` when the requested entity does not
    /// exist.
    #[serde(default)]
    pub result: Value,
    /// Error object, mutually exclusive with a meaningful `result`.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message, forwarded to the caller's error log.
    pub message: String,
}

/// A way to deliver a whole batch of calls to the remote endpoint.
///
/// Implementations post all requests as one submission and return
/// the endpoint's response entries, in whatever order the endpoint
/// produced them. Failing here means the endpoint itself was
/// unreachable, which aborts the run; per-call errors travel inside
/// [`RpcResponse`] instead.
pub trait Transport: Send + Sync {
    /// Submits `requests` as a single batch.
    fn send_batch(
        &self,
        requests: Vec<RpcRequest>,
    ) -> impl Future<Output = Result<Vec<RpcResponse>, TransportError>> + Send;
}

impl<T: Transport> Transport for &T {
    fn send_batch(
        &self,
        requests: Vec<RpcRequest>,
    ) -> impl Future<Output = Result<Vec<RpcResponse>, TransportError>> + Send {
        (**self).send_batch(requests)
    }
}

/// [`Transport`] over plain HTTP POST, the usual JSON-RPC shape.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a transport talking to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Transport for HttpTransport {
    fn send_batch(
        &self,
        requests: Vec<RpcRequest>,
    ) -> impl Future<Output = Result<Vec<RpcResponse>, TransportError>> + Send {
        async move {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&requests)
                .send()
                .await?
                .error_for_status()?;

            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        }
    }
}
