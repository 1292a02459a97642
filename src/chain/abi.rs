//! Solidity bindings for the invoice contract.
//!
//! Event and call types come from `sol!`; the helpers below convert between them and the
//! string-typed values (0x hex, decimal amounts) the rest of the crate stores.

use super::types::DecodeError;
use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;

alloy_sol_types::sol! {
	/// Emitted once per minted invoice NFT.
	event InvoiceCreated(uint256 indexed tokenId, address indexed payer, uint256 amount, address token);

	function createInvoice(address payer, uint256 amount, address token, string description) external returns (uint256 tokenId);
	function payInvoice(uint256 tokenId) external payable;
	function invoices(uint256 tokenId) external view returns (address payee, uint256 amount, address token, string description, bool isPaid, uint256 createdAt);
}

/// The sentinel address denoting the chain's native coin.
pub const NATIVE_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, DecodeError> {
	let stripped = input.strip_prefix("0x").unwrap_or(input);
	hex::decode(stripped).map_err(|e| DecodeError::InvalidHex(format!("{}: {}", input, e)))
}

pub fn bytes_to_hex(bytes: impl AsRef<[u8]>) -> String {
	format!("0x{}", hex::encode(bytes))
}

/// Strict 0x-prefixed, 40 hex digit address check.
pub fn is_address(input: &str) -> bool {
	input
		.strip_prefix("0x")
		.map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
		.unwrap_or(false)
}

pub fn parse_address(input: &str) -> Result<Address, DecodeError> {
	if !is_address(input) {
		return Err(DecodeError::InvalidAddress(input.to_string()));
	}
	Address::from_str(input).map_err(|_| DecodeError::InvalidAddress(input.to_string()))
}

/// Lowercase, 0x-prefixed rendering used for stored addresses.
pub fn address_to_string(address: &Address) -> String {
	bytes_to_hex(address)
}

/// Parse a plain decimal string into a uint256.
pub fn parse_uint256(input: &str) -> Result<U256, DecodeError> {
	if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
		return Err(DecodeError::InvalidNumber(input.to_string()));
	}
	U256::from_str_radix(input, 10)
		.map_err(|_| DecodeError::OutOfRange(format!("{} exceeds uint256", input)))
}

pub fn parse_topic(topic: &str) -> Result<B256, DecodeError> {
	let bytes = hex_to_bytes(topic)?;
	if bytes.len() != 32 {
		return Err(DecodeError::Topics(format!(
			"topic {} is {} bytes, expected 32",
			topic,
			bytes.len()
		)));
	}
	Ok(B256::from_slice(&bytes))
}

/// Minimal JSON-RPC hex quantity (no leading zeros) for a uint256.
pub fn to_hex_quantity(value: U256) -> String {
	let encoded = hex::encode(value.to_be_bytes::<32>());
	let trimmed = encoded.trim_start_matches('0');
	if trimmed.is_empty() {
		"0x0".to_string()
	} else {
		format!("0x{}", trimmed)
	}
}
