//! Local cache of on-chain invoices.
//!
//! The [`sync::InvoiceSynchronizer`] polls an Ethereum-compatible node for `InvoiceCreated`
//! events and writes them to the [`store::InvoiceDatabase`], persisting a resumable block
//! cursor alongside. Readers observe the cache through an [`projection::InvoiceProjection`].

pub mod chain;
pub mod config;
pub mod projection;
pub mod store;
pub mod sync;
pub mod utils;
