// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process aggregate store shared by every completion handler.
//!
//! All mutations are commutative (tally increments and sequence
//! appends), so handler ordering within a batch does not matter.
//! Order-sensitive derivations happen once, in post-processing.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::sinks::Sinks;

/// One uncle position discovered during the block walk, fetched
/// later by `(block number, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UncleRef {
    pub block_number: u64,
    pub index: usize,
}

impl fmt::Display for UncleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Matches the error-log identifier format of the sinks.
        write!(f, "{} - {}", self.block_number, self.index)
    }
}

/// A block observed to carry uncles, with how many.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UncleCandidate {
    pub block_number: u64,
    pub count: usize,
}

/// Mutable collections folded into by block, uncle, and transaction
/// completion handlers. Never reset during a run.
#[derive(Debug, Default)]
pub(crate) struct Aggregates {
    /// Miner address -> blocks plus uncles credited. Monotonic.
    pub miners: HashMap<String, u64>,
    /// Timestamps of fetched blocks, unsorted until post-processing.
    pub block_times: Vec<u64>,
    /// Same series with uncle timestamps folded in.
    pub block_times_with_uncles: Vec<u64>,
    /// One normalized uncle rate per chunk.
    pub uncle_rate_per_period: Vec<f64>,
    /// Blocks that referenced uncles, walked after the primary walk.
    pub uncle_candidates: Vec<UncleCandidate>,
    /// Running count of discovered uncle positions.
    pub uncle_total: usize,
    /// Transaction hashes pending the per-chunk drain.
    pub tx_hashes: Vec<String>,
    /// Cumulative failed-call count, both passes.
    pub error_count: u64,
}

impl Aggregates {
    /// Credits one block or uncle to `address`.
    pub fn credit_miner(&mut self, address: &str) {
        *self.miners.entry(address.to_string()).or_insert(0) += 1;
    }

    /// Flattens the candidate list into per-position fetch items.
    pub fn uncle_refs(&self) -> Vec<UncleRef> {
        self.uncle_candidates
            .iter()
            .flat_map(|candidate| {
                (0..candidate.count).map(|index| UncleRef {
                    block_number: candidate.block_number,
                    index,
                })
            })
            .collect()
    }
}

/// Aggregate store plus output sinks, shared across every handler in
/// every batch. Handlers run on spawned tasks, so both sides sit
/// behind a mutex; lock order is aggregates before sinks everywhere.
pub(crate) struct Shared {
    aggregates: Mutex<Aggregates>,
    sinks: Mutex<Sinks>,
}

impl Shared {
    pub fn new(sinks: Sinks) -> Arc<Self> {
        Arc::new(Self {
            aggregates: Mutex::new(Aggregates::default()),
            sinks: Mutex::new(sinks),
        })
    }

    pub fn aggregates(&self) -> MutexGuard<'_, Aggregates> {
        self.aggregates.lock().expect("aggregate store lock poisoned")
    }

    pub fn sinks(&self) -> MutexGuard<'_, Sinks> {
        self.sinks.lock().expect("output sink lock poisoned")
    }
}
