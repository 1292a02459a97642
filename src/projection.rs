//! Live, newest-first view of the cached invoice table.
//!
//! The projection is fed by the store after every committed upsert, so a display layer can
//! await changes instead of polling the store.

use crate::store::InvoiceRecord;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct InvoiceProjection {
	receiver: watch::Receiver<Vec<InvoiceRecord>>,
}

impl InvoiceProjection {
	pub(crate) fn new(receiver: watch::Receiver<Vec<InvoiceRecord>>) -> Self {
		Self { receiver }
	}

	/// Current snapshot, newest first.
	pub fn current(&self) -> Vec<InvoiceRecord> {
		self.receiver.borrow().clone()
	}

	pub fn len(&self) -> usize {
		self.receiver.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.receiver.borrow().is_empty()
	}

	/// Wait for the next committed change and return the new snapshot.
	///
	/// Returns `None` once the store has been dropped.
	pub async fn changed(&mut self) -> Option<Vec<InvoiceRecord>> {
		self.receiver.changed().await.ok()?;
		Some(self.receiver.borrow_and_update().clone())
	}
}
