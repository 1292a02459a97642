//! Event system for invoice synchronization.
//!
//! This module defines the events emitted by the synchronizer over the life of a poll cycle,
//! the handler trait consumers implement, and the dispatcher that fans events out to all
//! registered handlers. Handlers are notified after state has been committed, so they can
//! drive status displays or metrics without touching the store themselves.

use tracing::{debug, error, info, warn};

/// Events that occur during invoice synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
	/// The cursor was resolved, either restored from the store or freshly seeded
	Initialized { cursor: u64, resumed: bool },
	/// A poll cycle started querying from `from`
	CycleStarted { from: u64 },
	/// Invoice records were committed to the store
	InvoicesCached { count: usize, inserted: usize },
	/// The cursor was persisted at a new position
	CursorAdvanced { from: u64, next: u64, head: u64 },
	/// The cursor is ahead of the chain head; nothing was done
	CycleSkipped { cursor: u64, head: u64 },
	/// A cycle failed or only partially completed
	CycleFailed { from: u64, error: String },
	/// The synchronizer stopped
	Stopped,
}

/// Trait for handling sync events.
///
/// Implementors receive every event dispatched by the synchronizer.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	/// Handle a sync event.
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), String>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// All handlers are called for each event, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
	handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new event handler.
	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	pub fn handler_count(&self) -> usize {
		self.handlers.len()
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&mut self, event: &SyncEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

/// Handler that writes every event to the log.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl SyncEventHandler for LoggingEventHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), String> {
		match event {
			SyncEvent::Initialized { cursor, resumed } => {
				if *resumed {
					info!("Resuming invoice sync from block {}", cursor);
				} else {
					info!("First run, starting invoice sync from block {}", cursor);
				}
			}
			SyncEvent::CycleStarted { from } => debug!("Polling from block {}", from),
			SyncEvent::InvoicesCached { count, inserted } => {
				info!("Cached {} invoices ({} new)", count, inserted)
			}
			SyncEvent::CursorAdvanced { from, next, head } => {
				debug!("Scanned {}..={}, next cursor {}", from, head, next)
			}
			SyncEvent::CycleSkipped { cursor, head } => {
				debug!("Cursor {} is ahead of head {}, waiting", cursor, head)
			}
			SyncEvent::CycleFailed { from, error } => {
				warn!("Poll cycle from block {} failed: {}", from, error)
			}
			SyncEvent::Stopped => info!("Invoice sync stopped"),
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"LoggingEventHandler"
	}
}
