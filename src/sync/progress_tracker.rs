//! Progress tracking for invoice synchronization.
//!
//! The `SyncProgressTracker` records every cursor move, counts cycles, cached invoices, skips
//! and failures, and flags any attempt to move the cursor backwards.

use tracing::{info, warn};

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	/// Cursor at the time tracking started
	start_cursor: u64,
	/// Most recently committed cursor
	current_cursor: u64,
	/// Completed cycles that committed a cursor
	cycles_completed: usize,
	/// Cycles skipped because the cursor was ahead of the head
	cycles_skipped: usize,
	/// Cycles aborted by an error
	cycles_failed: usize,
	/// Total invoice records written
	invoices_cached: usize,
	/// Cursor moves rejected because they would go backwards
	regressions_rejected: usize,
	/// Cursor at which we last logged progress
	last_logged_cursor: u64,
}

impl SyncProgressTracker {
	/// Create a new progress tracker starting from the given cursor.
	pub fn new(start_cursor: u64) -> Self {
		Self {
			start_cursor,
			current_cursor: start_cursor,
			cycles_completed: 0,
			cycles_skipped: 0,
			cycles_failed: 0,
			invoices_cached: 0,
			regressions_rejected: 0,
			last_logged_cursor: start_cursor,
		}
	}

	/// Record a committed cursor.
	///
	/// Returns `false` (and leaves the cursor as is) if `next` is behind the current cursor.
	pub fn record_cursor(&mut self, next: u64) -> bool {
		if next < self.current_cursor {
			warn!(
				"Rejected cursor regression from {} to {}",
				self.current_cursor, next
			);
			self.regressions_rejected += 1;
			return false;
		}
		self.current_cursor = next;
		self.cycles_completed += 1;
		true
	}

	pub fn record_cached(&mut self, count: usize) {
		self.invoices_cached += count;
	}

	pub fn record_skip(&mut self) {
		self.cycles_skipped += 1;
	}

	pub fn record_failure(&mut self) {
		self.cycles_failed += 1;
	}

	pub fn current_cursor(&self) -> u64 {
		self.current_cursor
	}

	/// Log progress every 1000 blocks or when forced
	pub fn log_progress(&mut self, force: bool) {
		let blocks_since_last_log = self.current_cursor.saturating_sub(self.last_logged_cursor);
		if force || blocks_since_last_log >= 1000 {
			info!("Sync progress: {}", self.get_stats().summary());
			self.last_logged_cursor = self.current_cursor;
		}
	}

	/// Get sync statistics as a SyncStats struct
	pub fn get_stats(&self) -> SyncStats {
		SyncStats {
			start_cursor: self.start_cursor,
			current_cursor: self.current_cursor,
			cycles_completed: self.cycles_completed,
			cycles_skipped: self.cycles_skipped,
			cycles_failed: self.cycles_failed,
			invoices_cached: self.invoices_cached,
			regressions_rejected: self.regressions_rejected,
		}
	}
}

/// Statistics about the sync progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub start_cursor: u64,
	pub current_cursor: u64,
	pub cycles_completed: usize,
	pub cycles_skipped: usize,
	pub cycles_failed: usize,
	pub invoices_cached: usize,
	pub regressions_rejected: usize,
}

impl SyncStats {
	/// Get a human-readable summary of the sync statistics
	pub fn summary(&self) -> String {
		format!(
			"cursor {} -> {}: {} cycles, {} invoices cached, {} skipped, {} failed",
			self.start_cursor,
			self.current_cursor,
			self.cycles_completed,
			self.invoices_cached,
			self.cycles_skipped,
			self.cycles_failed
		)
	}
}
