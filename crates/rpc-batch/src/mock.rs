// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scriptable in-memory [`Transport`] for tests.
//!
//! The mock answers each call through a responder closure and records
//! every submission, so tests can assert on batch sizes and retry
//! traffic without a live endpoint.

use std::{future::Future, sync::Mutex};

use serde_json::Value;

use crate::{
    error::TransportError,
    transport::{RpcErrorObject, RpcRequest, RpcResponse, Transport},
};

/// What the mock answers for one call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this result value.
    Result(Value),
    /// Respond with an error object carrying this message.
    Error(String),
    /// Respond with a null result.
    Null,
    /// Produce no response entry at all for this call.
    Omit,
}

type Responder = Box<dyn Fn(&RpcRequest) -> MockReply + Send + Sync>;

/// In-memory transport scripted by a responder closure.
pub struct MockTransport {
    responder: Responder,
    reversed: bool,
    batch_sizes: Mutex<Vec<usize>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl MockTransport {
    /// Creates a mock that answers every call via `responder`.
    pub fn new(responder: impl Fn(&RpcRequest) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            reversed: false,
            batch_sizes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delivers each batch's responses in reverse submission order,
    /// to exercise handler-order independence in callers.
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Sizes of every batch submitted so far, in submission order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    /// Every request submitted so far, across all batches.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests submitted so far for the given method.
    pub fn requests_for(&self, method: &str) -> Vec<RpcRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method)
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn send_batch(
        &self,
        requests: Vec<RpcRequest>,
    ) -> impl Future<Output = Result<Vec<RpcResponse>, TransportError>> + Send {
        self.batch_sizes.lock().unwrap().push(requests.len());

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            match (self.responder)(&request) {
                MockReply::Result(value) => responses.push(RpcResponse {
                    id: Some(request.id),
                    result: value,
                    error: None,
                }),
                MockReply::Error(message) => responses.push(RpcResponse {
                    id: Some(request.id),
                    result: Value::Null,
                    error: Some(RpcErrorObject {
                        code: -32000,
                        message,
                    }),
                }),
                MockReply::Null => responses.push(RpcResponse {
                    id: Some(request.id),
                    result: Value::Null,
                    error: None,
                }),
                MockReply::Omit => {}
            }
            self.requests.lock().unwrap().push(request);
        }

        if self.reversed {
            responses.reverse();
        }

        async move { Ok(responses) }
    }
}
