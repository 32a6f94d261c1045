// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The uncle sub-walk, run once after the primary walk completes.
//!
//! Structurally the same chunked batch-plus-retry walk, but over the
//! accumulated `(block number, index)` pairs and at half the primary
//! chunk size: uncle fetches fan out per position, several per
//! candidate block, so halving keeps batch volume comparable.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use rpc_batch::{Transport, TransportError};

use crate::{
    aggregates::Shared,
    eth::{self, UncleHead},
    retry::fetch_with_retry,
};

pub(crate) async fn walk<T: Transport>(
    transport: &T,
    shared: &Arc<Shared>,
    chunk_size: usize,
) -> Result<(), TransportError> {
    let refs = shared.aggregates().uncle_refs();
    if refs.is_empty() {
        return Ok(());
    }

    let uncle_chunk = (chunk_size / 2).max(1);
    let mut remaining = refs.len();
    info!(uncles = remaining, uncle_chunk, "starting uncle walk");

    for sub_chunk in refs.chunks(uncle_chunk) {
        {
            let aggregates = shared.aggregates();
            info!(
                remaining,
                miners = aggregates.miners.len(),
                errors = aggregates.error_count,
                "progress"
            );
        }

        let fold_shared = Arc::clone(shared);
        fetch_with_retry(
            transport,
            shared,
            "uncle",
            sub_chunk.to_vec(),
            eth::get_uncle_by_block_and_index,
            move |_, value| fold_uncle(&fold_shared, value),
        )
        .await?;

        remaining -= sub_chunk.len();
    }

    Ok(())
}

/// Folds one fetched uncle: timestamp into the with-uncles series,
/// miner into the shared tally.
fn fold_uncle(shared: &Shared, value: Value) {
    match serde_json::from_value::<UncleHead>(value) {
        Ok(head) => {
            let mut aggregates = shared.aggregates();
            let mut sinks = shared.sinks();

            if head.timestamp != 0 {
                aggregates.block_times_with_uncles.push(head.timestamp);
                sinks.block_timestamps_with_uncles.append(head.timestamp);
            }
            aggregates.credit_miner(&head.miner);
        }
        Err(error) => {
            shared.aggregates().error_count += 1;
            shared
                .sinks()
                .errors
                .append(format_args!("uncle undecodable: {error}"));
        }
    }
}
