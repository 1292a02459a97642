//! Invoice contract read/write path.
//!
//! Calls are ABI-encoded locally and submitted through the node: `eth_call` for the
//! `invoices(uint256)` view and `eth_sendTransaction` for `createInvoice` and
//! `payInvoice`. Signing is left to the account managed by the node or wallet.

use super::abi;
use super::client::RpcTransport;
use super::types::{ChainError, DecodeError};
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// On-chain view of one invoice as returned by `invoices(tokenId)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDetails {
	pub payee: String,
	/// Amount in wei as a decimal string.
	pub amount: String,
	pub token: String,
	pub description: String,
	pub is_paid: bool,
	/// Chain timestamp (seconds) at creation.
	pub created_at: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),

	#[error("Decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("No sender address configured for transactions")]
	MissingSender,

	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),
}

/// Client for the invoice NFT contract
pub struct InvoiceContract {
	transport: Arc<dyn RpcTransport>,
	address: String,
	/// Account submitting transactions.
	from: Option<String>,
}

impl InvoiceContract {
	pub fn new(transport: Arc<dyn RpcTransport>, address: String, from: Option<String>) -> Self {
		Self {
			transport,
			address,
			from,
		}
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	/// Whether a sender account is configured, i.e. transactions can be submitted.
	pub fn can_send(&self) -> bool {
		self.from.is_some()
	}

	/// Mint a new invoice NFT. Returns the transaction hash.
	///
	/// # Arguments
	/// * `payer` - Address obligated to pay.
	/// * `amount_wei` - Amount in base units as a decimal string.
	/// * `token` - Payment currency, the zero address for the native coin.
	/// * `description` - Free-form text stored on-chain.
	pub async fn create_invoice(
		&self,
		payer: &str,
		amount_wei: &str,
		token: &str,
		description: &str,
	) -> Result<String, ContractError> {
		let call = abi::createInvoiceCall {
			payer: abi::parse_address(payer)?,
			amount: abi::parse_uint256(amount_wei)?,
			token: abi::parse_address(token)?,
			description: description.to_string(),
		};

		let hash = self.send_transaction(call.abi_encode(), None).await?;
		info!("Submitted createInvoice for payer {} ({} wei): {}", payer, amount_wei, hash);
		Ok(hash)
	}

	/// Pay an invoice, attaching `value_wei` of the native coin.
	pub async fn pay_invoice(&self, token_id: &str, value_wei: &str) -> Result<String, ContractError> {
		let call = abi::payInvoiceCall {
			tokenId: abi::parse_uint256(token_id)?,
		};
		let value = abi::parse_uint256(value_wei)?;

		let hash = self.send_transaction(call.abi_encode(), Some(value)).await?;
		info!("Submitted payInvoice for token {}: {}", token_id, hash);
		Ok(hash)
	}

	/// Read the current on-chain state of an invoice.
	pub async fn invoice_details(&self, token_id: &str) -> Result<InvoiceDetails, ContractError> {
		let call = abi::invoicesCall {
			tokenId: abi::parse_uint256(token_id)?,
		};

		let result = self
			.transport
			.request(
				"eth_call",
				json!([{ "to": self.address, "data": abi::bytes_to_hex(call.abi_encode()) }, "latest"]),
			)
			.await?;
		let returned = result
			.as_str()
			.ok_or_else(|| ContractError::UnexpectedResponse(result.to_string()))?;

		Ok(decode_invoice_details(&abi::hex_to_bytes(returned)?)?)
	}

	async fn send_transaction(
		&self,
		calldata: Vec<u8>,
		value: Option<U256>,
	) -> Result<String, ContractError> {
		let from = self.from.as_ref().ok_or(ContractError::MissingSender)?;

		let mut tx = json!({
			"from": from,
			"to": self.address,
			"data": abi::bytes_to_hex(&calldata),
		});
		if let Some(value) = value {
			tx["value"] = json!(abi::to_hex_quantity(value));
		}

		let result = self.transport.request("eth_sendTransaction", json!([tx])).await?;
		result
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| ContractError::UnexpectedResponse(result.to_string()))
	}
}

fn decode_invoice_details(data: &[u8]) -> Result<InvoiceDetails, DecodeError> {
	let returned = abi::invoicesCall::abi_decode_returns(data)
		.map_err(|e| DecodeError::Abi(e.to_string()))?;

	Ok(InvoiceDetails {
		payee: abi::address_to_string(&returned.payee),
		amount: returned.amount.to_string(),
		token: abi::address_to_string(&returned.token),
		description: returned.description,
		is_paid: returned.isPaid,
		created_at: u64::try_from(returned.createdAt).map_err(|_| {
			DecodeError::OutOfRange(format!("createdAt {} does not fit in u64", returned.createdAt))
		})?,
	})
}
