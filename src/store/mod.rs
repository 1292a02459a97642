//! Persistent Store Module
//!
//! Durable local storage for the invoice read model. It holds two logical tables:
//!
//! - `invoices`: cached `InvoiceCreated` projections, keyed by an internal auto id, looked up
//!   by `token_id` and sorted by insertion `timestamp`.
//! - `syncState`: a single row (id [`SYNC_STATE_ID`]) holding the synchronizer cursor.
//!
//! Persistence goes through repository traits so the file layout can be swapped out.

/// Database facade with explicit open/close lifecycle
pub mod database;
/// Repository traits and their file-backed implementations
pub mod repositories;
/// Record types and storage errors
pub mod types;

pub use database::InvoiceDatabase;
pub use types::*;
