// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Everything a harvest run is parameterized by.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// JSON-RPC endpoint accepting batched call submission.
    pub endpoint: String,
    /// Days of history to cover, counted back from the latest block.
    pub days: u64,
    /// Blocks-per-day constant used to size the walk and to
    /// day-normalize per-chunk uncle rates.
    pub blocks_per_day: u64,
    /// Block numbers fetched per batch. The uncle walk derives its
    /// own chunk size as half of this.
    pub chunk_size: usize,
    /// Directory the output sinks are created in, fresh per run.
    pub out_dir: PathBuf,
}
