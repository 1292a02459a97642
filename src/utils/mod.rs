//!
//! Utility module for invoice amounts.
//!
//! Re-exports the wei <-> decimal formatting helpers used by the contract path and display layer.
/// Exact fixed-point formatting and parsing of token amounts
pub mod index;

pub use index::{ETHER_DECIMALS, format_ether, format_token_amount, parse_ether, parse_token_amount};
