use crate::chain::ChainError;
use crate::store::StorageError;

use chrono::{DateTime, Utc};

/// Errors that abort a poll cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Network error: {0}")]
	Network(#[from] ChainError),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Poll cycle timed out")]
	Timeout,

	#[error("Synchronizer has been shut down")]
	Shutdown,
}

/// What the synchronizer is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
	Idle,
	Polling,
	Stopped,
}

/// Status indicator published after every phase change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
	pub phase: SyncPhase,
	/// Cursor as last committed, `None` before initialization.
	pub last_synced_block: Option<u64>,
	/// Error of the most recent cycle, cleared by the next successful one.
	pub last_error: Option<String>,
	pub updated_at: DateTime<Utc>,
}

impl SyncStatus {
	pub fn initial() -> Self {
		Self {
			phase: SyncPhase::Idle,
			last_synced_block: None,
			last_error: None,
			updated_at: Utc::now(),
		}
	}

	pub fn is_polling(&self) -> bool {
		self.phase == SyncPhase::Polling
	}
}

/// Result of one poll cycle that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
	/// Logs in `[from, head]` were processed and the cursor moved to `next`.
	Advanced {
		from: u64,
		head: u64,
		next: u64,
		/// Records written to the store.
		cached: usize,
		/// Set when a paginated fetch stopped early; the cursor only covers completed windows.
		partial_failure: Option<String>,
	},
	/// Cursor was ahead of the chain head; nothing was fetched or written.
	Skipped { cursor: u64, head: u64 },
	/// Another cycle was already in flight.
	Busy,
}
