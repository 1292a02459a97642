use crate::store::types::{InvoiceTable, StorageError, SyncStateTable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const INVOICES_FILE: &str = "invoices.json";
const SYNC_STATE_FILE: &str = "sync_state.json";
/// Name an unreadable invoice table is moved to.
pub const QUARANTINED_INVOICES_FILE: &str = "invoices.json.corrupt";

/// Repository for the invoice table
#[async_trait::async_trait]
pub trait InvoiceRepository: Send + Sync {
	async fn save(&self, table: &InvoiceTable) -> Result<(), StorageError>;
	/// Load the table, `None` if it has never been written.
	async fn load(&self) -> Result<Option<InvoiceTable>, StorageError>;

	/// Move an unreadable table out of the way so it is not overwritten.
	async fn quarantine(&self) -> Result<(), StorageError> {
		Ok(())
	}
}

/// Repository for the sync state table
#[async_trait::async_trait]
pub trait SyncStateRepository: Send + Sync {
	async fn save(&self, table: &SyncStateTable) -> Result<(), StorageError>;
	async fn load(&self) -> Result<Option<SyncStateTable>, StorageError>;
}

/// Write `content` to a temporary sibling and rename it over `path`.
async fn write_atomically(path: &Path, content: &[u8]) -> Result<(), StorageError> {
	let tmp_path = path.with_extension("json.tmp");
	tokio::fs::write(&tmp_path, content).await?;
	tokio::fs::rename(&tmp_path, path).await?;
	Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
	match tokio::fs::read_to_string(path).await {
		Ok(content) => Ok(Some(content)),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(StorageError::Io(e)),
	}
}

/// File-based implementation of InvoiceRepository
pub struct FileInvoiceRepository {
	data_dir: PathBuf,
}

impl FileInvoiceRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn table_path(&self) -> PathBuf {
		self.data_dir.join(INVOICES_FILE)
	}
}

#[async_trait::async_trait]
impl InvoiceRepository for FileInvoiceRepository {
	async fn save(&self, table: &InvoiceTable) -> Result<(), StorageError> {
		let content = serde_json::to_vec_pretty(table)?;
		let path = self.table_path();
		write_atomically(&path, &content).await?;

		debug!("Saved {} invoices to {:?}", table.rows.len(), path);
		Ok(())
	}

	async fn load(&self) -> Result<Option<InvoiceTable>, StorageError> {
		let path = self.table_path();
		let Some(content) = read_optional(&path).await? else {
			return Ok(None);
		};

		let table: InvoiceTable = serde_json::from_str(&content)?;
		info!("Loaded {} invoices from {:?}", table.rows.len(), path);
		Ok(Some(table))
	}

	async fn quarantine(&self) -> Result<(), StorageError> {
		let path = self.table_path();
		let target = self.data_dir.join(QUARANTINED_INVOICES_FILE);
		match tokio::fs::rename(&path, &target).await {
			Ok(()) => {
				warn!("Moved unreadable invoice table to {:?}", target);
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Io(e)),
		}
	}
}

/// File-based implementation of SyncStateRepository
pub struct FileSyncStateRepository {
	data_dir: PathBuf,
}

impl FileSyncStateRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn table_path(&self) -> PathBuf {
		self.data_dir.join(SYNC_STATE_FILE)
	}
}

#[async_trait::async_trait]
impl SyncStateRepository for FileSyncStateRepository {
	async fn save(&self, table: &SyncStateTable) -> Result<(), StorageError> {
		let content = serde_json::to_vec_pretty(table)?;
		write_atomically(&self.table_path(), &content).await
	}

	async fn load(&self) -> Result<Option<SyncStateTable>, StorageError> {
		let path = self.table_path();
		let Some(content) = read_optional(&path).await? else {
			return Ok(None);
		};

		let table: SyncStateTable = serde_json::from_str(&content)?;
		info!("Loaded sync state from {:?}", path);
		Ok(Some(table))
	}
}
