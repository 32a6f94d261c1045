// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while submitting a batch to the endpoint.
///
/// These are fatal to a run: an individual call failing inside an
/// otherwise delivered batch is *not* a [`TransportError`], it is
/// reported through that call's completion handler.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP round trip itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with something that is not a JSON-RPC
    /// response array.
    #[error("Malformed batch response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}
