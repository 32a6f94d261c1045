// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors that abort a harvest run.
///
/// Per-item fetch failures are not represented here; those are data,
/// logged to the error sink and bounded by the single retry pass.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Creating or flushing an output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint could not be reached at all.
    #[error("Transport error: {0}")]
    Transport(#[from] rpc_batch::TransportError),

    /// The endpoint answered a control call with something unusable.
    #[error("Malformed endpoint response: {0}")]
    BadResponse(String),
}
