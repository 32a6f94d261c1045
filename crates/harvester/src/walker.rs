// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The primary chunked range walk.
//!
//! Blocks are fetched highest-first in fixed-size chunks; every
//! chunk is one batch-plus-retry unit. Transaction lookups a chunk
//! discovers are drained completely before the walk advances, so the
//! pending list cannot grow across chunks.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use rpc_batch::Transport;

use crate::{
    aggregates::{Shared, UncleCandidate},
    config::HarvestConfig,
    error::HarvestError,
    eth::{self, BlockHead, ReceiptGasUsed, TxGasPrice},
    report::{self, RunSummary},
    retry::fetch_with_retry,
    sinks::Sinks,
    uncles,
};

/// Walks a block range chunk by chunk and folds results into the
/// aggregate store and output sinks.
pub struct Harvester<T> {
    transport: T,
    config: HarvestConfig,
    shared: Arc<Shared>,
}

impl<T: Transport> Harvester<T> {
    /// Creates the output sinks and a harvester ready to run.
    pub fn new(transport: T, config: HarvestConfig) -> Result<Self, HarvestError> {
        let sinks = Sinks::create(&config.out_dir)?;
        Ok(Self {
            transport,
            config,
            shared: Shared::new(sinks),
        })
    }

    /// Runs the harvest: primary block walk, uncle sub-walk, then
    /// post-processing. Consumes the harvester; sinks are flushed on
    /// the way out.
    pub async fn run(self) -> Result<RunSummary, HarvestError> {
        let latest = eth::latest_block_number(&self.transport).await?;
        let chunk_size = self.config.chunk_size.max(1) as u64;

        let requested = self.config.days * self.config.blocks_per_day;
        // The chain is only so deep; clamping also keeps block
        // numbers from wrapping below zero.
        let total = requested.min(latest + 1);

        info!(latest, total, chunk_size, "starting harvest");

        let mut remaining = total;
        let mut next = latest;

        while remaining > 0 {
            self.log_progress(remaining);

            let chunk_len = remaining.min(chunk_size);
            let numbers: Vec<u64> = (0..chunk_len).map(|offset| next - offset).collect();

            self.process_block_chunk(&numbers).await?;
            self.drain_transactions().await?;

            next = next.saturating_sub(chunk_len);
            remaining -= chunk_len;
        }
        self.log_progress(0);

        uncles::walk(&self.transport, &self.shared, self.config.chunk_size.max(1)).await?;

        report::finalize(&self.shared, total)
    }

    /// One chunk of the primary walk: batch-fetch every block number
    /// with retry, then record the chunk's day-normalized uncle rate.
    async fn process_block_chunk(&self, numbers: &[u64]) -> Result<(), HarvestError> {
        let uncles_before = self.shared.aggregates().uncle_total;

        let shared = Arc::clone(&self.shared);
        fetch_with_retry(
            &self.transport,
            &self.shared,
            "block",
            numbers.to_vec(),
            |number| eth::get_block_by_number(*number),
            move |number, value| fold_block(&shared, *number, value),
        )
        .await?;

        let mut aggregates = self.shared.aggregates();
        let uncles_this_chunk = (aggregates.uncle_total - uncles_before) as f64;
        let day_factor = self.config.blocks_per_day as f64 / numbers.len() as f64;
        aggregates.uncle_rate_per_period.push(uncles_this_chunk * day_factor);

        Ok(())
    }

    /// Drains every transaction hash the current chunk discovered:
    /// a gas-price pass and a gas-used pass per sub-chunk, each with
    /// its own retry.
    async fn drain_transactions(&self) -> Result<(), HarvestError> {
        let pending = std::mem::take(&mut self.shared.aggregates().tx_hashes);
        if pending.is_empty() {
            return Ok(());
        }

        info!(transactions = pending.len(), "draining transaction lookups");

        for sub_chunk in pending.chunks(self.config.chunk_size.max(1)) {
            let shared = Arc::clone(&self.shared);
            fetch_with_retry(
                &self.transport,
                &self.shared,
                "tx",
                sub_chunk.to_vec(),
                |hash| eth::get_transaction_by_hash(hash),
                move |_, value| fold_gas_price(&shared, value),
            )
            .await?;

            let shared = Arc::clone(&self.shared);
            fetch_with_retry(
                &self.transport,
                &self.shared,
                "tx",
                sub_chunk.to_vec(),
                |hash| eth::get_transaction_receipt(hash),
                move |_, value| fold_gas_used(&shared, value),
            )
            .await?;
        }

        Ok(())
    }

    fn log_progress(&self, remaining: u64) {
        let aggregates = self.shared.aggregates();
        info!(
            remaining,
            miners = aggregates.miners.len(),
            errors = aggregates.error_count,
            "progress"
        );
    }
}

/// Folds one fetched block into the shared store: timestamps into
/// both time series, uncle references into the candidate list, the
/// miner into the tally, transaction hashes into the pending drain.
fn fold_block(shared: &Shared, number: u64, value: Value) {
    match serde_json::from_value::<BlockHead>(value) {
        Ok(head) => {
            let mut aggregates = shared.aggregates();
            let mut sinks = shared.sinks();

            // Genesis carries timestamp zero; it anchors nothing.
            if head.timestamp != 0 {
                aggregates.block_times.push(head.timestamp);
                aggregates.block_times_with_uncles.push(head.timestamp);
                sinks.block_timestamps.append(head.timestamp);
                sinks.block_timestamps_with_uncles.append(head.timestamp);
            }

            if !head.uncles.is_empty() {
                aggregates.uncle_candidates.push(UncleCandidate {
                    block_number: number,
                    count: head.uncles.len(),
                });
                aggregates.uncle_total += head.uncles.len();
                for hash in &head.uncles {
                    sinks.uncle_hashes.append(hash);
                }
            }

            aggregates.credit_miner(&head.miner);
            aggregates.tx_hashes.extend(head.transactions);
        }
        Err(error) => {
            shared.aggregates().error_count += 1;
            shared
                .sinks()
                .errors
                .append(format_args!("block {number} undecodable: {error}"));
        }
    }
}

fn fold_gas_price(shared: &Shared, value: Value) {
    match serde_json::from_value::<TxGasPrice>(value) {
        Ok(tx) => shared.sinks().tx_gas_price.append(tx.gas_price),
        Err(error) => {
            shared.aggregates().error_count += 1;
            shared
                .sinks()
                .errors
                .append(format_args!("tx undecodable: {error}"));
        }
    }
}

fn fold_gas_used(shared: &Shared, value: Value) {
    match serde_json::from_value::<ReceiptGasUsed>(value) {
        Ok(receipt) => shared.sinks().tx_gas.append(receipt.gas_used),
        Err(error) => {
            shared.aggregates().error_count += 1;
            shared
                .sinks()
                .errors
                .append(format_args!("receipt undecodable: {error}"));
        }
    }
}
