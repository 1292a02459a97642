//!
//! JSON-RPC client for an Ethereum-compatible node.
//!
//! This module provides the narrow `ChainClient` contract the synchronizer depends on
//! (`current_height` and `get_logs`) and an implementation over HTTP JSON-RPC. Transient
//! transport failures are retried with exponential backoff; RPC-level errors are not.

use super::types::*;
use async_trait::async_trait;
use backoff::{ExponentialBackoff, future::retry};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Read access to chain height and event logs
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Most recent block number known to the node.
	async fn current_height(&self) -> Result<u64, ChainError>;

	/// All logs matching `filter` in its inclusive block range.
	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError>;
}

/// Raw JSON-RPC request submission, used by the contract read/write path
#[async_trait]
pub trait RpcTransport: Send + Sync {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError>;
}

/// HTTP JSON-RPC client
pub struct JsonRpcChainClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Node endpoint.
	rpc_url: String,
	/// Monotonic request id.
	next_id: AtomicU64,
	/// Upper bound on the time spent retrying a single request.
	retry_budget: Duration,
}

impl JsonRpcChainClient {
	/// Create a new client.
	///
	/// # Arguments
	/// * `rpc_url` - HTTP endpoint of the node.
	/// * `request_timeout` - Per-request timeout applied by the HTTP client.
	/// * `retry_budget` - Total time allowed for retrying transient failures.
	pub fn new(
		rpc_url: String,
		request_timeout: Duration,
		retry_budget: Duration,
	) -> Result<Self, ChainError> {
		let http_client = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			next_id: AtomicU64::new(1),
			retry_budget,
		})
	}

	pub fn rpc_url(&self) -> &str {
		&self.rpc_url
	}

	/// Send one JSON-RPC request without retries.
	async fn send_once(&self, body: &Value) -> Result<Value, backoff::Error<ChainError>> {
		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(body)
			.send()
			.await
			.map_err(|e| {
				warn!("RPC transport error: {}", e);
				if e.is_timeout() {
					backoff::Error::transient(ChainError::Timeout)
				} else {
					backoff::Error::transient(ChainError::Http(e))
				}
			})?;

		if let Some(error) = classify_status(response.status()) {
			return Err(error);
		}

		let payload: Value = response
			.json()
			.await
			.map_err(|e| backoff::Error::transient(ChainError::Http(e)))?;

		extract_result(payload).map_err(backoff::Error::permanent)
	}
}

/// Map a non-success HTTP status to a retry decision. 5xx and 429 are retried.
fn classify_status(status: StatusCode) -> Option<backoff::Error<ChainError>> {
	if status.is_success() {
		return None;
	}
	let error = ChainError::InvalidResponse(format!("HTTP error: {}", status));
	if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
		warn!("RPC endpoint returned HTTP {}", status);
		Some(backoff::Error::transient(error))
	} else {
		Some(backoff::Error::permanent(error))
	}
}

/// Convert an `eth_getLogs` result, dropping logs removed by a reorg.
fn logs_from_result(result: Value) -> Result<Vec<ChainLog>, ChainError> {
	let raw_logs: Vec<RpcLog> = serde_json::from_value(result)?;

	let mut logs = Vec::with_capacity(raw_logs.len());
	for raw in raw_logs {
		if raw.removed {
			debug!("Skipping removed log in block {:?}", raw.block_number);
			continue;
		}
		logs.push(ChainLog::try_from(raw)?);
	}
	Ok(logs)
}

/// Pull `result` out of a JSON-RPC response envelope.
fn extract_result(payload: Value) -> Result<Value, ChainError> {
	if let Some(error) = payload.get("error") {
		let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
		let message = error
			.get("message")
			.and_then(|m| m.as_str())
			.unwrap_or("Unknown RPC error")
			.to_string();
		return Err(ChainError::Rpc { code, message });
	}

	payload
		.get("result")
		.cloned()
		.ok_or_else(|| ChainError::InvalidResponse("response has no result field".to_string()))
}

/// Parse a hex quantity such as `0x1a4`.
pub fn parse_quantity(value: &str) -> Result<u64, ChainError> {
	let digits = value
		.strip_prefix("0x")
		.ok_or_else(|| ChainError::InvalidResponse(format!("quantity {} lacks 0x prefix", value)))?;
	if digits.is_empty() {
		return Err(ChainError::InvalidResponse("empty quantity".to_string()));
	}
	u64::from_str_radix(digits, 16)
		.map_err(|e| ChainError::InvalidResponse(format!("invalid quantity {}: {}", value, e)))
}

pub fn to_quantity(value: u64) -> String {
	format!("0x{:x}", value)
}

impl TryFrom<RpcLog> for ChainLog {
	type Error = ChainError;

	fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
		let block_number = log
			.block_number
			.as_deref()
			.ok_or_else(|| ChainError::InvalidResponse("log is missing blockNumber".to_string()))
			.and_then(parse_quantity)?;
		let log_index = log.log_index.as_deref().map(parse_quantity).transpose()?;

		Ok(ChainLog {
			address: log.address,
			topics: log.topics,
			data: log.data,
			block_number,
			transaction_hash: log.transaction_hash,
			log_index,
		})
	}
}

#[async_trait]
impl RpcTransport for JsonRpcChainClient {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		debug!("RPC request {} ({})", method, id);

		let policy = ExponentialBackoff {
			max_elapsed_time: Some(self.retry_budget),
			..ExponentialBackoff::default()
		};

		retry(policy, || self.send_once(&body)).await
	}
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
	async fn current_height(&self) -> Result<u64, ChainError> {
		let result = self.request("eth_blockNumber", json!([])).await?;
		let quantity = result.as_str().ok_or_else(|| {
			ChainError::InvalidResponse(format!("eth_blockNumber returned {}", result))
		})?;
		parse_quantity(quantity)
	}

	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError> {
		let params = json!([{
			"address": filter.address,
			"topics": [filter.topic0],
			"fromBlock": to_quantity(filter.from_block),
			"toBlock": to_quantity(filter.to_block),
		}]);

		let result = self.request("eth_getLogs", params).await?;
		let logs = logs_from_result(result)?;

		debug!(
			"Fetched {} logs for blocks {}..={}",
			logs.len(),
			filter.from_block,
			filter.to_block
		);
		Ok(logs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_quantities() {
		assert_eq!(parse_quantity("0x0").unwrap(), 0);
		assert_eq!(parse_quantity("0x1a4").unwrap(), 420);
		assert!(parse_quantity("1a4").is_err());
		assert!(parse_quantity("0x").is_err());
		assert_eq!(to_quantity(420), "0x1a4");
	}

	#[test]
	fn extracts_result_or_rpc_error() {
		let ok = extract_result(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})).unwrap();
		assert_eq!(ok, json!("0x10"));

		let err = extract_result(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"error": {"code": -32005, "message": "query returned more than 10000 results"}
		}))
		.unwrap_err();
		assert!(matches!(err, ChainError::Rpc { code: -32005, .. }));

		assert!(matches!(
			extract_result(json!({"jsonrpc": "2.0", "id": 1})),
			Err(ChainError::InvalidResponse(_))
		));
	}

	#[test]
	fn converts_wire_logs() {
		let raw: RpcLog = serde_json::from_value(json!({
			"address": "0x00000000000000000000000000000000000000c0",
			"topics": ["0x01"],
			"data": "0x",
			"blockNumber": "0x96",
			"transactionHash": "0xabc",
			"logIndex": "0x2"
		}))
		.unwrap();
		let log = ChainLog::try_from(raw).unwrap();
		assert_eq!(log.block_number, 150);
		assert_eq!(log.log_index, Some(2));
		assert!(
			serde_json::from_value::<RpcLog>(json!({"address": "0x0", "topics": [], "data": "0x"}))
				.map(ChainLog::try_from)
				.unwrap()
				.is_err()
		);
	}

	#[test]
	fn server_errors_and_rate_limits_are_retried() {
		assert!(classify_status(StatusCode::OK).is_none());
		for status in [
			StatusCode::SERVICE_UNAVAILABLE,
			StatusCode::BAD_GATEWAY,
			StatusCode::TOO_MANY_REQUESTS,
		] {
			assert!(matches!(
				classify_status(status),
				Some(backoff::Error::Transient { .. })
			));
		}
		for status in [StatusCode::NOT_FOUND, StatusCode::UNAUTHORIZED, StatusCode::BAD_REQUEST] {
			assert!(matches!(
				classify_status(status),
				Some(backoff::Error::Permanent(ChainError::InvalidResponse(_)))
			));
		}
	}

	#[test]
	fn removed_logs_are_dropped() {
		let log = |block: &str, removed: bool| {
			json!({
				"address": "0x00000000000000000000000000000000000000c0",
				"topics": ["0x01"],
				"data": "0x",
				"blockNumber": block,
				"logIndex": "0x0",
				"removed": removed
			})
		};
		let logs = logs_from_result(json!([log("0x10", false), log("0x11", true), log("0x12", false)]))
			.unwrap();
		let blocks: Vec<u64> = logs.iter().map(|log| log.block_number).collect();
		assert_eq!(blocks, vec![16, 18]);

		assert!(logs_from_result(json!({"not": "a list"})).is_err());
	}
}
