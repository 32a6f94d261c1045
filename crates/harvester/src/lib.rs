// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod cli;

mod aggregates;
mod config;
mod error;
mod eth;
mod report;
mod retry;
mod sinks;
mod uncles;
mod walker;

pub use config::*;
pub use error::*;
pub use report::*;
pub use walker::*;
