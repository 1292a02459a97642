//! Chain integration module
//!
//! This module provides the narrow chain contract used by the synchronizer, its JSON-RPC
//! implementation, ABI helpers, decoding of `InvoiceCreated` logs and the invoice contract
//! read/write path.

/// Solidity ABI encoding and decoding helpers
pub mod abi;
/// `ChainClient` trait and the JSON-RPC client
mod client;
/// Invoice contract calls and transactions
pub mod contract;
/// `InvoiceCreated` event decoding
mod invoice_created;
/// Type definitions for chain data and errors
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ChainClient, JsonRpcChainClient, RpcTransport, parse_quantity, to_quantity};
pub use contract::{ContractError, InvoiceContract, InvoiceDetails};
pub use invoice_created::{INVOICE_CREATED_SIGNATURE, InvoiceCreatedEvent, invoice_created_topic};
pub use types::*;
