// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface of the harvester binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::HarvestConfig;

/// Harvests historical chain data over batched JSON-RPC into
/// append-only output files.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON-RPC endpoint URL
    #[clap(short, long, env = "HARVESTER_ENDPOINT")]
    pub endpoint: String,

    /// Days of history to cover, counted back from the latest block
    #[clap(short, long, default_value_t = 1)]
    pub days: u64,

    /// Blocks-per-day normalization constant
    #[clap(long, default_value_t = 1000)]
    pub blocks_per_day: u64,

    /// Block numbers to query in one batch; uncle fetches use half
    #[clap(short, long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Output directory, recreated on every run
    #[clap(short, long, default_value = "out")]
    pub out_dir: PathBuf,
}

impl From<Cli> for HarvestConfig {
    fn from(cli: Cli) -> Self {
        Self {
            endpoint: cli.endpoint,
            days: cli.days,
            blocks_per_day: cli.blocks_per_day,
            chunk_size: cli.chunk_size,
            out_dir: cli.out_dir,
        }
    }
}
