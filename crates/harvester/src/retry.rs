// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The batch-plus-retry unit every fetch in the harvest goes through.
//!
//! One logical fetch is at most two batches: the full item list, then
//! exactly the items whose call failed. Failures on the second pass
//! are permanent. The bound is fixed at one retry; it is a policy,
//! not a knob.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use rpc_batch::{submit, CallOutcome, RpcCall, Transport, TransportError};

use crate::aggregates::Shared;

enum Pass {
    First,
    Retry,
}

/// Fetches `items` as one batch, folding each success into the
/// aggregate store from inside its completion handler, then
/// resubmits the failed subset exactly once.
///
/// `kind` labels error-log lines (`"{kind} missing: {item}"` on the
/// first pass, `"{kind} missing again: {item}"` on the second).
/// Duplicate items are independent submissions; callers pass
/// duplicate-free lists when double counting would matter.
///
/// Only an unreachable endpoint returns an error; per-item failures
/// are folded into the error count and sink.
pub(crate) async fn fetch_with_retry<T, I, C, F>(
    transport: &T,
    shared: &Arc<Shared>,
    kind: &'static str,
    items: Vec<I>,
    make_call: C,
    fold: F,
) -> Result<(), TransportError>
where
    T: Transport,
    I: Clone + Display + Send + Sync + 'static,
    C: Fn(&I) -> RpcCall,
    F: FnMut(&I, Value) + Send + 'static,
{
    if items.is_empty() {
        return Ok(());
    }

    let fold = Arc::new(Mutex::new(fold));

    let missing = run_pass(
        transport,
        shared,
        kind,
        items,
        &make_call,
        Arc::clone(&fold),
        Pass::First,
    )
    .await?;

    if !missing.is_empty() {
        run_pass(transport, shared, kind, missing, &make_call, fold, Pass::Retry).await?;
    }

    Ok(())
}

async fn run_pass<T, I, C, F>(
    transport: &T,
    shared: &Arc<Shared>,
    kind: &'static str,
    items: Vec<I>,
    make_call: &C,
    fold: Arc<Mutex<F>>,
    pass: Pass,
) -> Result<Vec<I>, TransportError>
where
    T: Transport,
    I: Clone + Display + Send + Sync + 'static,
    C: Fn(&I) -> RpcCall,
    F: FnMut(&I, Value) + Send + 'static,
{
    let calls: Vec<RpcCall> = items.iter().map(make_call).collect();
    let items = Arc::new(items);
    let missing = Arc::new(Mutex::new(Vec::new()));

    let handler = {
        let items = Arc::clone(&items);
        let missing = Arc::clone(&missing);
        let shared = Arc::clone(shared);
        let retrying = matches!(pass, Pass::Retry);

        move |index: usize, outcome: CallOutcome| {
            let item = &items[index];
            match outcome {
                CallOutcome::Success(value) => {
                    let mut fold = fold.lock().expect("fold lock poisoned");
                    (*fold)(item, value);
                }
                CallOutcome::Failure(error) => {
                    shared.aggregates().error_count += 1;

                    let mut sinks = shared.sinks();
                    if let Some(message) = error {
                        sinks.errors.append(message);
                    }
                    if retrying {
                        sinks.errors.append(format_args!("{kind} missing again: {item}"));
                    } else {
                        sinks.errors.append(format_args!("{kind} missing: {item}"));
                        missing
                            .lock()
                            .expect("missing list lock poisoned")
                            .push(item.clone());
                    }
                }
            }
        }
    };

    let batch = submit(transport, calls, handler).await?;
    batch.wait().await;

    // Every handler has run once the batch drains, so the missing
    // list is complete here.
    let missing = std::mem::take(&mut *missing.lock().expect("missing list lock poisoned"));
    Ok(missing)
}
