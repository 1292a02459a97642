//! Invoice synchronizer: the polling loop that keeps the store in step with the chain.
//!
//! `InvoiceSynchronizer` owns the cursor (the next block to scan from) and is the single
//! writer of the store. Each poll cycle reads the chain head, fetches `InvoiceCreated` logs in
//! `[cursor, head]` through the configured `LogFetchStrategy`, upserts the decoded invoices
//! and persists the new cursor. Any failure aborts the cycle with the cursor untouched, so the
//! next tick retries the same range.
//!
//! Cursor rules:
//! - no logs in `[from, head]`: the cursor moves to `head + 1`
//! - logs found: the cursor moves to `max(log block) + 1`, never blindly to `head + 1`
//! - cursor ahead of head: the cycle is a no-op until the head catches up
//!
//! Only one cycle runs at a time (busy flag), every cycle is bounded by a timeout, and a
//! `ShutdownHandle` stops the loop. Shutdown is checked before the invoice write and again
//! before the cursor write, so a cursor is never committed after shutdown.

use crate::chain::{ChainClient, InvoiceCreatedEvent, LogQuery, invoice_created_topic};
use crate::store::{InvoiceDatabase, InvoiceRecord, SYNC_STATE_ID, SyncStateRecord};
use crate::sync::events::{EventDispatcher, SyncEvent, SyncEventHandler};
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::strategies::{FetchedLogs, LogFetchStrategy};
use crate::sync::types::*;

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Configuration for the synchronizer
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
	/// Invoice contract whose events are cached.
	pub contract_address: String,
	/// Time between poll cycles.
	pub poll_interval: Duration,
	/// Upper bound on a single cycle.
	pub cycle_timeout: Duration,
	/// How far behind the head a first run starts.
	pub seed_lookback: u64,
	/// Fixed first block for a first run, overriding `seed_lookback`.
	pub start_block: Option<u64>,
}

impl SynchronizerConfig {
	pub fn new(contract_address: impl Into<String>) -> Self {
		Self {
			contract_address: contract_address.into(),
			poll_interval: Duration::from_secs(5),
			cycle_timeout: Duration::from_secs(30),
			seed_lookback: 100,
			start_block: None,
		}
	}
}

/// Cloneable handle that tears the synchronizer down.
#[derive(Clone)]
pub struct ShutdownHandle {
	sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
	pub fn shutdown(&self) {
		self.sender.send_replace(true);
	}

	pub fn is_shutdown(&self) -> bool {
		*self.sender.borrow()
	}
}

/// Resets the busy flag when a cycle ends, including when its future is dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Polls the chain for `InvoiceCreated` events and caches them in the store
pub struct InvoiceSynchronizer {
	chain: Arc<dyn ChainClient>,
	database: Arc<InvoiceDatabase>,
	strategy: Box<dyn LogFetchStrategy>,
	config: SynchronizerConfig,
	query: LogQuery,

	cursor: Mutex<Option<u64>>,
	busy: AtomicBool,

	dispatcher: Mutex<EventDispatcher>,
	tracker: Mutex<Option<SyncProgressTracker>>,
	status_tx: watch::Sender<SyncStatus>,
	shutdown_tx: Arc<watch::Sender<bool>>,
}

impl InvoiceSynchronizer {
	pub fn new(
		chain: Arc<dyn ChainClient>,
		database: Arc<InvoiceDatabase>,
		strategy: Box<dyn LogFetchStrategy>,
		config: SynchronizerConfig,
	) -> Self {
		let query = LogQuery::new(config.contract_address.clone(), invoice_created_topic());
		let (status_tx, _) = watch::channel(SyncStatus::initial());
		let (shutdown_tx, _) = watch::channel(false);

		info!(
			"Created invoice synchronizer for {} using {}",
			config.contract_address,
			strategy.name()
		);

		Self {
			chain,
			database,
			strategy,
			config,
			query,
			cursor: Mutex::new(None),
			busy: AtomicBool::new(false),
			dispatcher: Mutex::new(EventDispatcher::new()),
			tracker: Mutex::new(None),
			status_tx,
			shutdown_tx: Arc::new(shutdown_tx),
		}
	}

	/// Add a handler that receives every `SyncEvent`.
	pub async fn register_handler(&self, handler: Box<dyn SyncEventHandler>) {
		self.dispatcher.lock().await.register_handler(handler);
	}

	/// Watch the status indicator.
	pub fn status(&self) -> watch::Receiver<SyncStatus> {
		self.status_tx.subscribe()
	}

	pub fn shutdown_handle(&self) -> ShutdownHandle {
		ShutdownHandle {
			sender: self.shutdown_tx.clone(),
		}
	}

	fn is_shutdown(&self) -> bool {
		*self.shutdown_tx.borrow()
	}

	/// Cursor as currently held in memory, `None` before initialization.
	pub async fn cursor(&self) -> Option<u64> {
		*self.cursor.lock().await
	}

	pub async fn stats(&self) -> Option<SyncStats> {
		self.tracker.lock().await.as_ref().map(|t| t.get_stats())
	}

	/// Resolve the starting cursor: restore it from the store or seed it from the chain head.
	///
	/// Seeding persists the cursor immediately. Already-initialized synchronizers return
	/// their current cursor.
	pub async fn initialize(&self) -> Result<u64, SyncError> {
		let mut cursor = self.cursor.lock().await;
		if let Some(current) = *cursor {
			return Ok(current);
		}

		let restored = match self.database.get_sync_state(SYNC_STATE_ID).await {
			Ok(Some(record)) => match record.cursor() {
				Ok(value) => Some(value),
				Err(e) => {
					warn!("Ignoring stored sync state: {}", e);
					None
				}
			},
			Ok(None) => None,
			Err(e) => {
				warn!("Failed to read sync state, treating as first run: {}", e);
				None
			}
		};

		let (start, resumed) = match restored {
			Some(value) => (value, true),
			None => {
				let seeded = match self.config.start_block {
					Some(block) => block,
					None => {
						let head = self.chain.current_height().await?;
						head.saturating_sub(self.config.seed_lookback)
					}
				};
				self.database
					.put_sync_state(SyncStateRecord::new(seeded))
					.await?;
				(seeded, false)
			}
		};

		*cursor = Some(start);
		*self.tracker.lock().await = Some(SyncProgressTracker::new(start));
		self.status_tx.send_modify(|status| {
			status.last_synced_block = Some(start);
			status.updated_at = Utc::now();
		});
		self.dispatch(SyncEvent::Initialized {
			cursor: start,
			resumed,
		})
		.await;

		Ok(start)
	}

	/// Run a single poll cycle.
	///
	/// Returns [`CycleOutcome::Busy`] without doing anything if another cycle is in flight.
	pub async fn poll_once(&self) -> Result<CycleOutcome, SyncError> {
		if self
			.busy
			.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
			.is_err()
		{
			debug!("Poll cycle already in flight, skipping tick");
			return Ok(CycleOutcome::Busy);
		}
		let _guard = BusyGuard(&self.busy);

		if self.is_shutdown() {
			return Err(SyncError::Shutdown);
		}

		self.set_phase(SyncPhase::Polling);
		let result = match tokio::time::timeout(self.config.cycle_timeout, self.run_cycle()).await {
			Ok(result) => result,
			Err(_) => Err(SyncError::Timeout),
		};

		match &result {
			Ok(CycleOutcome::Advanced {
				partial_failure, ..
			}) => {
				let partial_failure = partial_failure.clone();
				self.finish_cycle(partial_failure).await;
			}
			Ok(_) => self.finish_cycle(None).await,
			Err(SyncError::Shutdown) => {
				debug!("Discarded poll cycle result after shutdown");
				self.set_phase(SyncPhase::Idle);
			}
			Err(e) => {
				error!("Poll cycle failed: {}", e);
				if let Some(tracker) = self.tracker.lock().await.as_mut() {
					tracker.record_failure();
				}
				let from = (*self.cursor.lock().await).unwrap_or_default();
				self.dispatch(SyncEvent::CycleFailed {
					from,
					error: e.to_string(),
				})
				.await;
				self.finish_cycle(Some(e.to_string())).await;
			}
		}

		result
	}

	async fn run_cycle(&self) -> Result<CycleOutcome, SyncError> {
		let from = self.initialize().await?;
		self.dispatch(SyncEvent::CycleStarted { from }).await;

		let head = self.chain.current_height().await?;
		if from > head {
			if let Some(tracker) = self.tracker.lock().await.as_mut() {
				tracker.record_skip();
			}
			self.dispatch(SyncEvent::CycleSkipped { cursor: from, head })
				.await;
			return Ok(CycleOutcome::Skipped { cursor: from, head });
		}

		let mut fetched = self
			.strategy
			.fetch(self.chain.as_ref(), &self.query, from, head)
			.await?;
		let stale = fetched.discard_before(from);
		if stale > 0 {
			warn!("Dropped {} logs below requested block {}", stale, from);
		}
		let records = self.decode_records(&fetched);
		let next = next_cursor(from, head, &fetched);

		if self.is_shutdown() {
			return Err(SyncError::Shutdown);
		}

		let cached = records.len();
		if !records.is_empty() {
			let inserted = self.database.bulk_upsert_invoices(records).await?;
			self.dispatch(SyncEvent::InvoicesCached {
				count: cached,
				inserted,
			})
			.await;
		}

		if self.is_shutdown() {
			return Err(SyncError::Shutdown);
		}
		self.database
			.put_sync_state(SyncStateRecord::new(next))
			.await?;
		*self.cursor.lock().await = Some(next);

		if let Some(tracker) = self.tracker.lock().await.as_mut() {
			tracker.record_cached(cached);
			tracker.record_cursor(next);
			tracker.log_progress(false);
		}
		self.dispatch(SyncEvent::CursorAdvanced { from, next, head })
			.await;

		let partial_failure = fetched.failure.map(|e| e.to_string());
		if let Some(error) = &partial_failure {
			self.dispatch(SyncEvent::CycleFailed {
				from: next,
				error: error.clone(),
			})
			.await;
		}

		Ok(CycleOutcome::Advanced {
			from,
			head,
			next,
			cached,
			partial_failure,
		})
	}

	/// Map fetched logs to invoice records, skipping logs that do not decode.
	fn decode_records(&self, fetched: &FetchedLogs) -> Vec<InvoiceRecord> {
		let timestamp = Utc::now().timestamp_millis();
		fetched
			.logs
			.iter()
			.filter_map(|log| match InvoiceCreatedEvent::try_from(log) {
				Ok(event) => Some(InvoiceRecord {
					id: None,
					token_id: event.token_id,
					payer: event.payer,
					amount: event.amount,
					token: event.token,
					timestamp,
				}),
				Err(e) => {
					warn!(
						"Skipping undecodable log in block {} ({:?}): {}",
						log.block_number, log.transaction_hash, e
					);
					None
				}
			})
			.collect()
	}

	/// Run until shut down: one cycle immediately, then one per `poll_interval`.
	pub async fn run(self: Arc<Self>) {
		let mut shutdown = self.shutdown_tx.subscribe();
		let mut ticker = tokio::time::interval(self.config.poll_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		info!(
			"Invoice sync running every {:?}",
			self.config.poll_interval
		);

		while !self.is_shutdown() {
			tokio::select! {
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				}
				_ = ticker.tick() => {
					let _ = self.poll_once().await;
				}
			}
		}

		self.status_tx.send_modify(|status| {
			status.phase = SyncPhase::Stopped;
			status.updated_at = Utc::now();
		});
		if let Some(tracker) = self.tracker.lock().await.as_mut() {
			tracker.log_progress(true);
		}
		self.dispatch(SyncEvent::Stopped).await;
	}

	async fn finish_cycle(&self, error: Option<String>) {
		let cursor = *self.cursor.lock().await;
		self.status_tx.send_modify(|status| {
			status.phase = SyncPhase::Idle;
			status.last_synced_block = cursor;
			status.last_error = error;
			status.updated_at = Utc::now();
		});
	}

	fn set_phase(&self, phase: SyncPhase) {
		self.status_tx.send_modify(|status| {
			status.phase = phase;
			status.updated_at = Utc::now();
		});
	}

	async fn dispatch(&self, event: SyncEvent) {
		self.dispatcher.lock().await.dispatch(&event).await;
	}
}

/// Where the next cycle starts, given what this cycle fetched from `[from, head]`.
///
/// Never returns a value below `from`.
pub fn next_cursor(from: u64, head: u64, fetched: &FetchedLogs) -> u64 {
	let after_logs = fetched.max_block().map(|block| block.saturating_add(1));

	let next = if fetched.is_complete() {
		after_logs.unwrap_or_else(|| head.saturating_add(1))
	} else {
		let after_scanned = fetched.scanned_through.saturating_add(1);
		after_logs.map_or(after_scanned, |after| after.max(after_scanned))
	};

	next.max(from)
}
