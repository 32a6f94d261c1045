// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Post-processing: order-sensitive derivations that need the whole
//! run's data, so they wait for both walks to finish.

use std::collections::HashMap;

use tracing::info;

use crate::{aggregates::Shared, error::HarvestError};

/// Final counters of one harvest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Blocks the walk covered.
    pub total_blocks: u64,
    /// Distinct miner addresses credited.
    pub distinct_miners: usize,
    /// Failed calls across both retry passes.
    pub error_count: u64,
}

/// Sorts a timestamp series ascending and derives successive
/// differences. The first timestamp establishes the baseline only
/// and produces no delta.
pub fn block_time_deltas(timestamps: &[u64]) -> Vec<u64> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Formats the per-miner summary rows, descending by blocks mined,
/// ties broken by address for deterministic output. Percentages are
/// of the requested block total, to five decimal places.
pub fn miner_rows(tally: &HashMap<String, u64>, total_blocks: u64) -> Vec<String> {
    let mut entries: Vec<(&String, &u64)> = tally.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .map(|(address, mined)| {
            let share = *mined as f64 / total_blocks as f64 * 100.0;
            format!("{address}: {mined} / {share:.5} %")
        })
        .collect()
}

/// Derives and writes every end-of-run series, emits the summary to
/// the console and the log sink, and flushes everything.
pub(crate) fn finalize(shared: &Shared, total_blocks: u64) -> Result<RunSummary, HarvestError> {
    let aggregates = shared.aggregates();
    let mut sinks = shared.sinks();

    for delta in block_time_deltas(&aggregates.block_times) {
        sinks.block_times.append(delta);
    }
    for delta in block_time_deltas(&aggregates.block_times_with_uncles) {
        sinks.block_times_with_uncles.append(delta);
    }
    for rate in &aggregates.uncle_rate_per_period {
        sinks.uncles_per_day.append(rate);
    }

    let headline = format!(
        "Found {} different miners in last {} blocks",
        aggregates.miners.len(),
        total_blocks
    );
    info!("{headline}");
    sinks.log.append(&headline);

    for row in miner_rows(&aggregates.miners, total_blocks) {
        info!("{row}");
        sinks.log.append(&row);
    }

    sinks.flush_all()?;

    Ok(RunSummary {
        total_blocks,
        distinct_miners: aggregates.miners.len(),
        error_count: aggregates.error_count,
    })
}
