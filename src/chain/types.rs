//! Types for JSON-RPC chain access and log decoding

use serde::{Deserialize, Serialize};

/// A single log entry returned by `eth_getLogs`, with quantities already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
	/// Emitting contract address.
	pub address: String,
	/// Indexed topics, `topics[0]` is the event signature hash.
	pub topics: Vec<String>,
	/// Non-indexed event data as a 0x-prefixed hex string.
	pub data: String,
	/// Block the log was included in.
	pub block_number: u64,
	pub transaction_hash: Option<String>,
	pub log_index: Option<u64>,
}

/// Log as it appears on the wire, quantities hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcLog {
	pub address: String,
	pub topics: Vec<String>,
	pub data: String,
	#[serde(rename = "blockNumber")]
	pub block_number: Option<String>,
	#[serde(rename = "transactionHash")]
	pub transaction_hash: Option<String>,
	#[serde(rename = "logIndex")]
	pub log_index: Option<String>,
	#[serde(default)]
	pub removed: bool,
}

/// Address and topic selecting which logs a query should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
	pub address: String,
	pub topic0: String,
}

/// A [`LogQuery`] bound to an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
	pub address: String,
	pub topic0: String,
	pub from_block: u64,
	pub to_block: u64,
}

impl LogQuery {
	pub fn new(address: impl Into<String>, topic0: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			topic0: topic0.into(),
		}
	}

	/// Bind this query to the inclusive range `[from_block, to_block]`.
	pub fn range(&self, from_block: u64, to_block: u64) -> LogFilter {
		LogFilter {
			address: self.address.clone(),
			topic0: self.topic0.clone(),
			from_block,
			to_block,
		}
	}
}

/// Errors raised while talking to the JSON-RPC node
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error("Request timed out")]
	Timeout,
}

/// Errors raised while decoding ABI-encoded logs, return data or amounts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
	#[error("Invalid hex: {0}")]
	InvalidHex(String),

	#[error("ABI decoding failed: {0}")]
	Abi(String),

	#[error("Unexpected topic layout: {0}")]
	Topics(String),

	#[error("Value out of range: {0}")]
	OutOfRange(String),

	#[error("Invalid number: {0}")]
	InvalidNumber(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(String),
}
