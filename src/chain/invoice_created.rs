//! Decoding of the invoice contract's `InvoiceCreated` event.
//!
//! Layout: `topics[1]` is the indexed token id, `topics[2]` the indexed payer, and `data`
//! holds `amount` followed by the payment `token` address.

use super::abi;
use super::types::{ChainLog, DecodeError};
use alloy_primitives::B256;
use alloy_sol_types::SolEvent;

/// Canonical signature of the event.
pub const INVOICE_CREATED_SIGNATURE: &str = abi::InvoiceCreated::SIGNATURE;

/// Topic hash selecting `InvoiceCreated` logs.
pub fn invoice_created_topic() -> String {
	abi::bytes_to_hex(abi::InvoiceCreated::SIGNATURE_HASH)
}

/// A decoded `InvoiceCreated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceCreatedEvent {
	/// NFT token id as a decimal string.
	pub token_id: String,
	pub payer: String,
	/// Amount in wei as a decimal string.
	pub amount: String,
	/// Payment currency; [`abi::NATIVE_TOKEN_ADDRESS`] for the native coin.
	pub token: String,
	pub block_number: u64,
}

impl InvoiceCreatedEvent {
	pub fn is_native(&self) -> bool {
		self.token == abi::NATIVE_TOKEN_ADDRESS
	}
}

impl TryFrom<&ChainLog> for InvoiceCreatedEvent {
	type Error = DecodeError;

	fn try_from(log: &ChainLog) -> Result<Self, Self::Error> {
		let topics = log
			.topics
			.iter()
			.map(|topic| abi::parse_topic(topic))
			.collect::<Result<Vec<B256>, _>>()?;
		match topics.first() {
			Some(topic0) if *topic0 == abi::InvoiceCreated::SIGNATURE_HASH => {}
			Some(topic0) => {
				return Err(DecodeError::Topics(format!(
					"topic0 {} is not InvoiceCreated",
					topic0
				)));
			}
			None => return Err(DecodeError::Topics("log has no topics".to_string())),
		}
		if topics.len() != 3 {
			return Err(DecodeError::Topics(format!(
				"expected 3 topics, got {}",
				topics.len()
			)));
		}

		let data = abi::hex_to_bytes(&log.data)?;
		let event = abi::InvoiceCreated::decode_raw_log(topics, &data)
			.map_err(|e| DecodeError::Abi(e.to_string()))?;

		Ok(Self {
			token_id: event.tokenId.to_string(),
			payer: abi::address_to_string(&event.payer),
			amount: event.amount.to_string(),
			token: abi::address_to_string(&event.token),
			block_number: log.block_number,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::mock::invoice_created_log;

	#[test]
	fn decodes_invoice_created_log() {
		let payer = "0x00000000000000000000000000000000000000aa";
		let log = invoice_created_log(7, payer, 1_500_000_000_000_000_000, abi::NATIVE_TOKEN_ADDRESS, 150);

		let event = InvoiceCreatedEvent::try_from(&log).unwrap();
		assert_eq!(event.token_id, "7");
		assert_eq!(event.payer, payer);
		assert_eq!(event.amount, "1500000000000000000");
		assert!(event.is_native());
		assert_eq!(event.block_number, 150);
	}

	#[test]
	fn rejects_foreign_and_truncated_logs() {
		let mut log = invoice_created_log(1, abi::NATIVE_TOKEN_ADDRESS, 1, abi::NATIVE_TOKEN_ADDRESS, 1);
		log.data = "0x".to_string();
		assert!(matches!(
			InvoiceCreatedEvent::try_from(&log),
			Err(DecodeError::Abi(_))
		));

		log.topics[0] = abi::bytes_to_hex(alloy_primitives::keccak256("Transfer(address,address,uint256)"));
		assert!(matches!(InvoiceCreatedEvent::try_from(&log), Err(DecodeError::Topics(_))));

		log.topics.clear();
		assert!(InvoiceCreatedEvent::try_from(&log).is_err());
	}
}
