//! Invoice database: the persistent store shared by the synchronizer and the display layer.
//!
//! `InvoiceDatabase` owns the in-memory copy of both tables and writes every change through
//! its repositories before committing it, so a failed write leaves the visible state
//! untouched. Writers are serialized by an async mutex; readers subscribe to the
//! `InvoiceProjection` for live updates.

use crate::projection::InvoiceProjection;
use crate::store::repositories::{
	FileInvoiceRepository, FileSyncStateRepository, InvoiceRepository, SyncStateRepository,
};
use crate::store::types::*;

use std::path::PathBuf;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

struct DatabaseState {
	invoices: InvoiceTable,
	sync_state: SyncStateTable,
	open: bool,
}

/// Persistent store for cached invoices and the sync cursor.
pub struct InvoiceDatabase {
	invoice_repo: Box<dyn InvoiceRepository>,
	sync_repo: Box<dyn SyncStateRepository>,
	state: Mutex<DatabaseState>,
	projection_tx: watch::Sender<Vec<InvoiceRecord>>,
}

impl InvoiceDatabase {
	/// Open (or create) a file-backed database under `data_dir`.
	pub async fn open(data_dir: PathBuf) -> Result<Self, StorageError> {
		tokio::fs::create_dir_all(&data_dir).await?;
		info!("Opening invoice database at {:?}", data_dir);

		Ok(Self::with_repositories(
			Box::new(FileInvoiceRepository::new(data_dir.clone())),
			Box::new(FileSyncStateRepository::new(data_dir)),
		)
		.await)
	}

	/// Build a database over arbitrary repositories.
	///
	/// An unreadable sync state is treated as a first run. An unreadable invoice table is
	/// moved aside and the stored cursor is dropped with it, so the next `initialize`
	/// reseeds and the cache is rebuilt from chain instead of resuming past lost rows.
	pub async fn with_repositories(
		invoice_repo: Box<dyn InvoiceRepository>,
		sync_repo: Box<dyn SyncStateRepository>,
	) -> Self {
		let (invoices, invoices_lost) = match invoice_repo.load().await {
			Ok(table) => (table.unwrap_or_default(), false),
			Err(e) => {
				warn!("Failed to load invoice table, starting empty: {}", e);
				if let Err(e) = invoice_repo.quarantine().await {
					warn!("Failed to move unreadable invoice table aside: {}", e);
				}
				(InvoiceTable::default(), true)
			}
		};
		let mut sync_state = match sync_repo.load().await {
			Ok(table) => table.unwrap_or_default(),
			Err(e) => {
				warn!("Failed to load sync state, starting without cursor: {}", e);
				SyncStateTable::new()
			}
		};

		if invoices_lost && !sync_state.is_empty() {
			warn!("Dropping stored sync cursor so the invoice cache is rebuilt");
			sync_state.clear();
			if let Err(e) = sync_repo.save(&sync_state).await {
				warn!("Failed to reset sync state: {}", e);
			}
		}

		let (projection_tx, _) = watch::channel(invoices.newest_first());

		Self {
			invoice_repo,
			sync_repo,
			state: Mutex::new(DatabaseState {
				invoices,
				sync_state,
				open: true,
			}),
			projection_tx,
		}
	}

	/// Close the database. Every later operation fails with [`StorageError::Closed`].
	///
	/// Writes are durable when they return, so there is nothing left to flush.
	pub async fn close(&self) {
		let mut state = self.state.lock().await;
		if state.open {
			state.open = false;
			info!("Invoice database closed");
		}
	}

	pub async fn is_open(&self) -> bool {
		self.state.lock().await.open
	}

	pub async fn get_sync_state(&self, id: u32) -> Result<Option<SyncStateRecord>, StorageError> {
		let state = self.state.lock().await;
		if !state.open {
			return Err(StorageError::Closed);
		}
		Ok(state.sync_state.get(&id).cloned())
	}

	/// Insert or replace a sync state row by id.
	pub async fn put_sync_state(&self, record: SyncStateRecord) -> Result<(), StorageError> {
		let mut state = self.state.lock().await;
		if !state.open {
			return Err(StorageError::Closed);
		}

		let mut updated = state.sync_state.clone();
		updated.insert(record.id, record);
		self.sync_repo.save(&updated).await?;

		state.sync_state = updated;
		Ok(())
	}

	/// Insert or replace invoices by `token_id` and notify subscribers.
	///
	/// Returns the number of rows newly inserted; replaced rows keep their id.
	pub async fn bulk_upsert_invoices(
		&self,
		records: Vec<InvoiceRecord>,
	) -> Result<usize, StorageError> {
		let mut state = self.state.lock().await;
		if !state.open {
			return Err(StorageError::Closed);
		}
		if records.is_empty() {
			return Ok(0);
		}

		let total = records.len();
		let mut updated = state.invoices.clone();
		let inserted = updated.upsert(records);
		self.invoice_repo.save(&updated).await?;

		state.invoices = updated;
		self.projection_tx.send_replace(state.invoices.newest_first());

		debug!(
			"Upserted {} invoices ({} new, {} replaced)",
			total,
			inserted,
			total - inserted
		);
		Ok(inserted)
	}

	/// All cached invoices, newest first by insertion time.
	pub async fn query_invoices(&self) -> Result<Vec<InvoiceRecord>, StorageError> {
		let state = self.state.lock().await;
		if !state.open {
			return Err(StorageError::Closed);
		}
		Ok(state.invoices.newest_first())
	}

	/// Look up a single invoice by its token id.
	pub async fn get_invoice(&self, token_id: &str) -> Result<Option<InvoiceRecord>, StorageError> {
		let state = self.state.lock().await;
		if !state.open {
			return Err(StorageError::Closed);
		}
		Ok(state
			.invoices
			.rows
			.iter()
			.find(|row| row.token_id == token_id)
			.cloned())
	}

	/// Live projection of the invoice table.
	pub fn subscribe(&self) -> InvoiceProjection {
		InvoiceProjection::new(self.projection_tx.subscribe())
	}
}
