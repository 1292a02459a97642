//! Runtime configuration loaded from the environment.

use crate::chain::abi;
use crate::sync::{LogFetchStrategy, PaginatedFetch, SingleRangeFetch, SynchronizerConfig};

use std::path::PathBuf;
use std::time::Duration;

pub const RPC_URL_VAR: &str = "INVOICE_RPC_URL";
pub const CONTRACT_ADDRESS_VAR: &str = "INVOICE_CONTRACT_ADDRESS";
pub const DATA_DIR_VAR: &str = "INVOICE_DATA_DIR";
pub const POLL_INTERVAL_VAR: &str = "INVOICE_POLL_INTERVAL_SECS";
pub const CYCLE_TIMEOUT_VAR: &str = "INVOICE_CYCLE_TIMEOUT_SECS";
pub const SEED_LOOKBACK_VAR: &str = "INVOICE_SEED_LOOKBACK";
pub const MAX_BLOCK_RANGE_VAR: &str = "INVOICE_MAX_BLOCK_RANGE";
pub const FROM_ADDRESS_VAR: &str = "INVOICE_FROM_ADDRESS";
pub const START_BLOCK_VAR: &str = "INVOICE_START_BLOCK";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("{0} must be set in environment or .env file")]
	Missing(&'static str),

	#[error("Invalid value for {name}: {value:?} ({reason})")]
	Invalid {
		name: &'static str,
		value: String,
		reason: String,
	},
}

/// Everything the binary needs to wire up a synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
	pub rpc_url: String,
	pub contract_address: String,
	pub data_dir: PathBuf,
	pub poll_interval: Duration,
	pub cycle_timeout: Duration,
	pub seed_lookback: u64,
	/// First block of a cold start, instead of `head - seed_lookback`.
	pub start_block: Option<u64>,
	/// Enables paginated `getLogs` when set.
	pub max_block_range: Option<u64>,
	/// Sender account for contract transactions.
	pub from_address: Option<String>,
	/// Per-request HTTP timeout.
	pub request_timeout: Duration,
	/// Total time spent retrying one transient RPC failure.
	pub retry_budget: Duration,
}

impl SyncConfig {
	/// Read the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Read the configuration through an arbitrary variable lookup.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let get = |name: &str| {
			lookup(name)
				.map(|value| value.trim().to_string())
				.filter(|value| !value.is_empty())
		};

		let rpc_url = get(RPC_URL_VAR).ok_or(ConfigError::Missing(RPC_URL_VAR))?;
		if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
			return Err(ConfigError::Invalid {
				name: RPC_URL_VAR,
				value: rpc_url,
				reason: "expected an http(s) URL".to_string(),
			});
		}

		let contract_address =
			get(CONTRACT_ADDRESS_VAR).ok_or(ConfigError::Missing(CONTRACT_ADDRESS_VAR))?;
		let contract_address = parse_address(CONTRACT_ADDRESS_VAR, contract_address)?;

		let from_address = get(FROM_ADDRESS_VAR)
			.map(|value| parse_address(FROM_ADDRESS_VAR, value))
			.transpose()?;

		let poll_interval = parse_u64(POLL_INTERVAL_VAR, get(POLL_INTERVAL_VAR), 5)?;
		let cycle_timeout = parse_u64(CYCLE_TIMEOUT_VAR, get(CYCLE_TIMEOUT_VAR), 30)?;
		if poll_interval == 0 || cycle_timeout == 0 {
			let name = if poll_interval == 0 {
				POLL_INTERVAL_VAR
			} else {
				CYCLE_TIMEOUT_VAR
			};
			return Err(ConfigError::Invalid {
				name,
				value: "0".to_string(),
				reason: "must be at least one second".to_string(),
			});
		}

		let start_block = get(START_BLOCK_VAR)
			.map(|value| parse_u64(START_BLOCK_VAR, Some(value), 0))
			.transpose()?;

		let max_block_range = match get(MAX_BLOCK_RANGE_VAR) {
			Some(value) => match parse_u64(MAX_BLOCK_RANGE_VAR, Some(value.clone()), 0)? {
				0 => {
					return Err(ConfigError::Invalid {
						name: MAX_BLOCK_RANGE_VAR,
						value,
						reason: "must be positive".to_string(),
					});
				}
				range => Some(range),
			},
			None => None,
		};

		Ok(Self {
			rpc_url,
			contract_address,
			data_dir: get(DATA_DIR_VAR)
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from("./data")),
			poll_interval: Duration::from_secs(poll_interval),
			cycle_timeout: Duration::from_secs(cycle_timeout),
			seed_lookback: parse_u64(SEED_LOOKBACK_VAR, get(SEED_LOOKBACK_VAR), 100)?,
			start_block,
			max_block_range,
			from_address,
			request_timeout: Duration::from_secs(10),
			retry_budget: Duration::from_secs(20),
		})
	}

	pub fn synchronizer_config(&self) -> SynchronizerConfig {
		SynchronizerConfig {
			contract_address: self.contract_address.clone(),
			poll_interval: self.poll_interval,
			cycle_timeout: self.cycle_timeout,
			seed_lookback: self.seed_lookback,
			start_block: self.start_block,
		}
	}

	/// Fetch strategy selected by `INVOICE_MAX_BLOCK_RANGE`.
	pub fn fetch_strategy(&self) -> Box<dyn LogFetchStrategy> {
		match self.max_block_range {
			Some(range) => Box::new(PaginatedFetch::new(range)),
			None => Box::new(SingleRangeFetch),
		}
	}
}

fn parse_u64(name: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
	match value {
		Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Invalid {
			name,
			reason: e.to_string(),
			value,
		}),
		None => Ok(default),
	}
}

fn parse_address(name: &'static str, value: String) -> Result<String, ConfigError> {
	if abi::is_address(&value) {
		Ok(value.to_ascii_lowercase())
	} else {
		Err(ConfigError::Invalid {
			name,
			value,
			reason: "expected a 0x-prefixed 20-byte hex address".to_string(),
		})
	}
}
