// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Call constructors and typed payloads for the Ethereum JSON-RPC
//! methods the harvest uses. Quantities arrive as `0x`-prefixed hex
//! strings and are decoded here.

use serde::{Deserialize, Deserializer};
use serde_json::json;

use rpc_batch::{RpcCall, RpcRequest, Transport};

use crate::{aggregates::UncleRef, error::HarvestError};

pub(crate) fn get_block_by_number(number: u64) -> RpcCall {
    // `false` asks for transaction hashes only, not full bodies.
    RpcCall::new(
        "eth_getBlockByNumber",
        json!([format!("{number:#x}"), false]),
    )
}

pub(crate) fn get_uncle_by_block_and_index(uncle: &UncleRef) -> RpcCall {
    RpcCall::new(
        "eth_getUncleByBlockNumberAndIndex",
        json!([
            format!("{:#x}", uncle.block_number),
            format!("{:#x}", uncle.index)
        ]),
    )
}

pub(crate) fn get_transaction_by_hash(hash: &str) -> RpcCall {
    RpcCall::new("eth_getTransactionByHash", json!([hash]))
}

pub(crate) fn get_transaction_receipt(hash: &str) -> RpcCall {
    RpcCall::new("eth_getTransactionReceipt", json!([hash]))
}

/// Asks the endpoint for the newest block number, as a single-call
/// batch. Failure here is fatal: without a starting point there is
/// nothing to walk.
pub(crate) async fn latest_block_number<T: Transport>(transport: &T) -> Result<u64, HarvestError> {
    let request = RpcRequest::new(0, "eth_blockNumber", json!([]));
    let responses = transport.send_batch(vec![request]).await?;

    let response = responses
        .into_iter()
        .next()
        .ok_or_else(|| HarvestError::BadResponse("empty reply to eth_blockNumber".to_string()))?;

    if let Some(error) = response.error {
        return Err(HarvestError::BadResponse(error.message));
    }

    let hex = response
        .result
        .as_str()
        .ok_or_else(|| HarvestError::BadResponse("non-string block number".to_string()))?;

    parse_hex_u64(hex).map_err(|_| HarvestError::BadResponse(format!("bad block number: {hex}")))
}

/// Header fields of one fetched block, hashes only.
#[derive(Debug, Deserialize)]
pub(crate) struct BlockHead {
    #[serde(deserialize_with = "hex_u64")]
    pub timestamp: u64,
    pub miner: String,
    #[serde(default)]
    pub uncles: Vec<String>,
    #[serde(default)]
    pub transactions: Vec<String>,
}

/// The fields of an uncle header the harvest cares about.
#[derive(Debug, Deserialize)]
pub(crate) struct UncleHead {
    #[serde(deserialize_with = "hex_u64")]
    pub timestamp: u64,
    pub miner: String,
}

/// Gas price of one transaction, from `eth_getTransactionByHash`.
#[derive(Debug, Deserialize)]
pub(crate) struct TxGasPrice {
    /// Priced in wei, which overflows u64 on mainnet values.
    #[serde(rename = "gasPrice", deserialize_with = "hex_u128")]
    pub gas_price: u128,
}

/// Gas used by one transaction, from `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptGasUsed {
    #[serde(rename = "gasUsed", deserialize_with = "hex_u64")]
    pub gas_used: u64,
}

pub(crate) fn parse_hex_u64(hex: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(hex.strip_prefix("0x").unwrap_or(hex), 16)
}

fn hex_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let hex = String::deserialize(deserializer)?;
    parse_hex_u64(&hex).map_err(serde::de::Error::custom)
}

fn hex_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let hex = String::deserialize(deserializer)?;
    u128::from_str_radix(hex.strip_prefix("0x").unwrap_or(&hex), 16)
        .map_err(serde::de::Error::custom)
}
