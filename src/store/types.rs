use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed id of the singleton sync state row.
pub const SYNC_STATE_ID: u32 = 1;

/// Cached projection of one on-chain `InvoiceCreated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
	/// Internal row id, assigned on first insert.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	/// NFT token id, the natural key.
	pub token_id: String,
	pub payer: String,
	/// Amount in wei as a decimal string.
	pub amount: String,
	pub token: String,
	/// Local insertion time in Unix milliseconds.
	pub timestamp: i64,
}

/// Singleton record holding the synchronizer cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateRecord {
	pub id: u32,
	/// Next block to query from, string-encoded.
	pub last_synced_block: String,
}

impl SyncStateRecord {
	pub fn new(cursor: u64) -> Self {
		Self {
			id: SYNC_STATE_ID,
			last_synced_block: cursor.to_string(),
		}
	}

	/// Parse the stored cursor.
	pub fn cursor(&self) -> Result<u64, StorageError> {
		self.last_synced_block.parse::<u64>().map_err(|e| {
			StorageError::CorruptRecord(format!(
				"lastSyncedBlock {:?} is not a block number: {}",
				self.last_synced_block, e
			))
		})
	}
}

/// On-disk shape of the `invoices` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTable {
	pub next_id: u64,
	pub rows: Vec<InvoiceRecord>,
}

impl Default for InvoiceTable {
	fn default() -> Self {
		Self {
			next_id: 1,
			rows: Vec::new(),
		}
	}
}

impl InvoiceTable {
	/// Insert or replace each record by `token_id`, keeping the existing row id.
	///
	/// Returns the number of rows newly inserted.
	pub fn upsert(&mut self, records: Vec<InvoiceRecord>) -> usize {
		let mut inserted = 0;
		for mut record in records {
			match self.rows.iter_mut().find(|row| row.token_id == record.token_id) {
				Some(existing) => {
					record.id = existing.id;
					*existing = record;
				}
				None => {
					record.id = Some(self.next_id);
					self.next_id += 1;
					self.rows.push(record);
					inserted += 1;
				}
			}
		}
		inserted
	}

	/// Rows ordered newest first by `timestamp`, ties broken by descending id.
	pub fn newest_first(&self) -> Vec<InvoiceRecord> {
		let mut rows = self.rows.clone();
		rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
		rows
	}
}

/// On-disk shape of the `syncState` table
pub type SyncStateTable = BTreeMap<u32, SyncStateRecord>;

/// Errors raised by the persistent store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Corrupt record: {0}")]
	CorruptRecord(String),

	#[error("Database is closed")]
	Closed,
}
