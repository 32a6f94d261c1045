// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::Value;
use tracing::warn;

use crate::{
    error::TransportError,
    transport::{RpcRequest, Transport},
};

/// Cadence of the completion-wait polling loop.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A call descriptor not yet bound to a batch-local id.
#[derive(Debug, Clone)]
pub struct RpcCall {
    /// Method name.
    pub method: String,
    /// Positional parameters.
    pub params: Value,
}

impl RpcCall {
    /// Builds a call descriptor.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Terminal state of one call in a batch.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The endpoint returned a non-null result.
    Success(Value),
    /// The call failed. `Some` carries the endpoint's error message;
    /// `None` means the result was null or never arrived.
    Failure(Option<String>),
}

/// Handle over one submitted batch.
///
/// The outstanding count starts at the number of submitted calls and
/// is decremented once per call as its completion handler finishes.
/// It never goes negative: every call completes exactly once.
pub struct PendingBatch {
    outstanding: Arc<AtomicUsize>,
}

impl PendingBatch {
    /// Number of calls that have not completed yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Blocks the calling flow until every call in the batch has
    /// completed, checking the outstanding count on a fixed interval.
    pub async fn wait(&self) {
        while self.outstanding() > 0 {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Submits `calls` as one batch and returns the pending handle.
///
/// Every call's `on_complete(index, outcome)` fires exactly once, in
/// whatever order the endpoint answered; the outstanding count is
/// decremented right after each handler returns. Calls the endpoint
/// never answered are completed as [`CallOutcome::Failure`] with no
/// message. Duplicate items in `calls` are independent submissions;
/// nothing here de-duplicates.
///
/// The only error path is the batch submission itself failing, which
/// means the endpoint was unreachable.
pub async fn submit<T, F>(
    transport: &T,
    calls: Vec<RpcCall>,
    mut on_complete: F,
) -> Result<PendingBatch, TransportError>
where
    T: Transport,
    F: FnMut(usize, CallOutcome) + Send + 'static,
{
    let total = calls.len();
    let outstanding = Arc::new(AtomicUsize::new(total));

    let requests: Vec<RpcRequest> = calls
        .into_iter()
        .enumerate()
        .map(|(id, call)| RpcRequest::new(id as u64, call.method, call.params))
        .collect();

    let responses = transport.send_batch(requests).await?;

    let pending = PendingBatch {
        outstanding: Arc::clone(&outstanding),
    };

    tokio::spawn(async move {
        let mut seen = vec![false; total];

        for response in responses {
            let index = match response.id.map(|id| id as usize) {
                Some(index) if index < total && !seen[index] => index,
                _ => {
                    warn!("batch response entry with unknown or duplicate id, dropping");
                    continue;
                }
            };
            seen[index] = true;

            let outcome = match response.error {
                Some(err) => CallOutcome::Failure(Some(err.message)),
                None if response.result.is_null() => CallOutcome::Failure(None),
                None => CallOutcome::Success(response.result),
            };

            on_complete(index, outcome);
            outstanding.fetch_sub(1, Ordering::AcqRel);
        }

        // Submitted calls the endpoint never answered still have to
        // complete, otherwise the waiter would stall forever.
        for index in 0..total {
            if !seen[index] {
                on_complete(index, CallOutcome::Failure(None));
                outstanding.fetch_sub(1, Ordering::AcqRel);
            }
        }
    });

    Ok(pending)
}
