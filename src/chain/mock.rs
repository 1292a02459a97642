//! In-memory chain doubles used by unit tests.

use super::abi;
use super::client::{ChainClient, RpcTransport};
use super::invoice_created::invoice_created_topic;
use super::types::*;
use alloy_primitives::{B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const CONTRACT: &str = "0x00000000000000000000000000000000000000c0";

/// Build an `InvoiceCreated` log the way a node would return it.
pub fn invoice_created_log(
	token_id: u64,
	payer: &str,
	amount: u128,
	token: &str,
	block_number: u64,
) -> ChainLog {
	let payer = abi::parse_address(payer).expect("valid payer address");
	let token = abi::parse_address(token).expect("valid token address");
	let data = (U256::from(amount), token).abi_encode_params();

	ChainLog {
		address: CONTRACT.to_string(),
		topics: vec![
			invoice_created_topic(),
			abi::bytes_to_hex(B256::from(U256::from(token_id))),
			abi::bytes_to_hex(payer.into_word()),
		],
		data: abi::bytes_to_hex(&data),
		block_number,
		transaction_hash: Some(format!("0x{:064x}", token_id)),
		log_index: Some(0),
	}
}

/// Scriptable `ChainClient`.
#[derive(Default)]
pub struct MockChainClient {
	pub head: Mutex<u64>,
	pub logs: Mutex<Vec<ChainLog>>,
	/// Every `(from, to)` range passed to `get_logs`.
	pub requested_ranges: Mutex<Vec<(u64, u64)>>,
	pub height_calls: AtomicUsize,
	pub fail_height: AtomicBool,
	pub fail_logs: AtomicBool,
	/// Fail `get_logs` whenever the requested range starts at or after this block.
	pub fail_logs_from: Mutex<Option<u64>>,
	/// Delay applied to every `get_logs` call.
	pub logs_delay: Mutex<Option<Duration>>,
}

impl MockChainClient {
	pub fn with_head(head: u64) -> Self {
		let client = Self::default();
		client.set_head(head);
		client
	}

	pub fn set_head(&self, head: u64) {
		*self.head.lock().unwrap() = head;
	}

	pub fn push_log(&self, log: ChainLog) {
		self.logs.lock().unwrap().push(log);
	}

	pub fn ranges(&self) -> Vec<(u64, u64)> {
		self.requested_ranges.lock().unwrap().clone()
	}
}

#[async_trait]
impl ChainClient for MockChainClient {
	async fn current_height(&self) -> Result<u64, ChainError> {
		self.height_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_height.load(Ordering::SeqCst) {
			return Err(ChainError::InvalidResponse("node unavailable".to_string()));
		}
		Ok(*self.head.lock().unwrap())
	}

	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError> {
		self.requested_ranges
			.lock()
			.unwrap()
			.push((filter.from_block, filter.to_block));

		let delay = *self.logs_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		if self.fail_logs.load(Ordering::SeqCst) {
			return Err(ChainError::Rpc {
				code: -32000,
				message: "getLogs failed".to_string(),
			});
		}
		let fail_from = *self.fail_logs_from.lock().unwrap();
		if let Some(fail_from) = fail_from {
			if filter.from_block >= fail_from {
				return Err(ChainError::Rpc {
					code: -32005,
					message: "range too large".to_string(),
				});
			}
		}

		Ok(self
			.logs
			.lock()
			.unwrap()
			.iter()
			.filter(|log| log.block_number >= filter.from_block && log.block_number <= filter.to_block)
			.filter(|log| log.topics.first() == Some(&filter.topic0))
			.cloned()
			.collect())
	}
}

/// `RpcTransport` that records requests and replies with canned results.
#[derive(Default)]
pub struct MockTransport {
	pub requests: Mutex<Vec<(String, Value)>>,
	pub responses: Mutex<Vec<Value>>,
}

impl MockTransport {
	pub fn replying(responses: Vec<Value>) -> Self {
		Self {
			requests: Mutex::new(Vec::new()),
			responses: Mutex::new(responses),
		}
	}
}

#[async_trait]
impl RpcTransport for MockTransport {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
		self.requests
			.lock()
			.unwrap()
			.push((method.to_string(), params));
		let mut responses = self.responses.lock().unwrap();
		if responses.is_empty() {
			return Err(ChainError::InvalidResponse("no canned response".to_string()));
		}
		Ok(responses.remove(0))
	}
}
