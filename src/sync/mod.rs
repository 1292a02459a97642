//! Invoice Synchronization Module
//!
//! Keeps the local store caught up with `InvoiceCreated` events on chain. Submodules:
//!
//! - `orchestrator`: the `InvoiceSynchronizer` polling loop, cursor handling and shutdown.
//! - `events`: events emitted per cycle and the handler/dispatcher pair that consumes them.
//! - `progress_tracker`: cursor bookkeeping, regression checks and statistics.
//! - `strategies`: how a block range is fetched (one request or bounded windows).
//! - `types`: errors, status indicator and cycle outcomes.
//!
//! The synchronizer is the only writer of the store; everything else reads through the
//! projection or watches the status channel.

/// Event system for decoupled communication during sync
pub mod events;
/// Polling loop and cursor management
pub mod orchestrator;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// Pluggable log fetching strategies
pub mod strategies;
mod types;

pub use events::{EventDispatcher, LoggingEventHandler, SyncEvent, SyncEventHandler};
pub use orchestrator::*;
pub use progress_tracker::{SyncProgressTracker, SyncStats};
pub use strategies::{FetchedLogs, LogFetchStrategy, PaginatedFetch, SingleRangeFetch};
pub use types::*;
