// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod batch;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod transport;

pub use batch::*;
pub use error::*;
pub use transport::*;
