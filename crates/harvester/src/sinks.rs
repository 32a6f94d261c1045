// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Append-only, line-oriented output files, one value per line.
//!
//! Every sink is created fresh per run, truncating prior contents.
//! File names are kept compatible with the established output layout
//! so downstream analysis scripts keep working.

use std::{
    fmt::Display,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::warn;

/// One append-only output stream.
#[derive(Debug)]
pub(crate) struct LineSink {
    writer: BufWriter<File>,
}

impl LineSink {
    fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    /// Appends one value as its own line. Write failures are logged
    /// and swallowed; a sink hiccup must not interrupt sibling
    /// completions in the same batch.
    pub fn append(&mut self, value: impl Display) {
        if let Err(error) = writeln!(self.writer, "{value}") {
            warn!("output sink write failed: {error}");
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// The full set of output sinks for one run.
#[derive(Debug)]
pub(crate) struct Sinks {
    /// Sorted block-time deltas, uncles excluded.
    pub block_times: LineSink,
    /// Sorted block-time deltas with uncle timestamps folded in.
    pub block_times_with_uncles: LineSink,
    /// Raw block timestamps in arrival order.
    pub block_timestamps: LineSink,
    /// Raw block and uncle timestamps in arrival order.
    pub block_timestamps_with_uncles: LineSink,
    /// Per-chunk uncle rate, day-normalized.
    pub uncles_per_day: LineSink,
    /// Uncle hashes as referenced by their nephew blocks.
    pub uncle_hashes: LineSink,
    /// Gas used per transaction, arrival order.
    pub tx_gas: LineSink,
    /// Gas price per transaction, arrival order.
    pub tx_gas_price: LineSink,
    /// Raw error text and missing/missing-again markers.
    pub errors: LineSink,
    /// Run summary, mirrored to the console.
    pub log: LineSink,
}

impl Sinks {
    /// Creates the output directory and every sink inside it.
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        Ok(Self {
            block_times: LineSink::create(&dir.join("blocktimes.txt"))?,
            block_times_with_uncles: LineSink::create(&dir.join("blocktimes_withUncles.txt"))?,
            block_timestamps: LineSink::create(&dir.join("blocktimestamps.txt"))?,
            block_timestamps_with_uncles: LineSink::create(
                &dir.join("blocktimestamps_withUncles.txt"),
            )?,
            uncles_per_day: LineSink::create(&dir.join("unclesPerDay.txt"))?,
            uncle_hashes: LineSink::create(&dir.join("uncleHashes.txt"))?,
            tx_gas: LineSink::create(&dir.join("txGas.txt"))?,
            tx_gas_price: LineSink::create(&dir.join("txGasPrice.txt"))?,
            errors: LineSink::create(&dir.join("errors.txt"))?,
            log: LineSink::create(&dir.join("log.txt"))?,
        })
    }

    /// Flushes every sink; called once after post-processing.
    pub fn flush_all(&mut self) -> io::Result<()> {
        self.block_times.flush()?;
        self.block_times_with_uncles.flush()?;
        self.block_timestamps.flush()?;
        self.block_timestamps_with_uncles.flush()?;
        self.uncles_per_day.flush()?;
        self.uncle_hashes.flush()?;
        self.tx_gas.flush()?;
        self.tx_gas_price.flush()?;
        self.errors.flush()?;
        self.log.flush()
    }
}
