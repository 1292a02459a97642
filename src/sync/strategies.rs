use crate::chain::{ChainClient, ChainError, ChainLog, LogQuery};
use tracing::{debug, warn};

/// Logs gathered for a block range
#[derive(Debug)]
pub struct FetchedLogs {
	pub logs: Vec<ChainLog>,
	/// Last block whose logs are fully contained in `logs`.
	pub scanned_through: u64,
	/// Error that cut the fetch short, if any.
	pub failure: Option<ChainError>,
}

impl FetchedLogs {
	pub fn is_complete(&self) -> bool {
		self.failure.is_none()
	}

	/// Drop logs below `from`, which a misbehaving node may return. Returns how many were dropped.
	pub fn discard_before(&mut self, from: u64) -> usize {
		let before = self.logs.len();
		self.logs.retain(|log| log.block_number >= from);
		before - self.logs.len()
	}

	/// Highest block number among the fetched logs.
	pub fn max_block(&self) -> Option<u64> {
		self.logs.iter().map(|log| log.block_number).max()
	}
}

/// Trait for different ways of fetching a block range of logs
#[async_trait::async_trait]
pub trait LogFetchStrategy: Send + Sync {
	/// Fetch logs matching `query` in the inclusive range `[from, to]`.
	///
	/// Returns an error only if nothing at all could be fetched.
	async fn fetch(
		&self,
		client: &dyn ChainClient,
		query: &LogQuery,
		from: u64,
		to: u64,
	) -> Result<FetchedLogs, ChainError>;

	/// Get the name of this strategy
	fn name(&self) -> &'static str;
}

/// One `getLogs` call over the whole range
pub struct SingleRangeFetch;

#[async_trait::async_trait]
impl LogFetchStrategy for SingleRangeFetch {
	async fn fetch(
		&self,
		client: &dyn ChainClient,
		query: &LogQuery,
		from: u64,
		to: u64,
	) -> Result<FetchedLogs, ChainError> {
		let logs = client.get_logs(&query.range(from, to)).await?;
		Ok(FetchedLogs {
			logs,
			scanned_through: to,
			failure: None,
		})
	}

	fn name(&self) -> &'static str {
		"SingleRangeFetch"
	}
}

/// Consecutive windows of at most `max_block_range` blocks, for providers that cap `getLogs`
pub struct PaginatedFetch {
	max_block_range: u64,
}

impl PaginatedFetch {
	pub fn new(max_block_range: u64) -> Self {
		Self {
			max_block_range: max_block_range.max(1),
		}
	}
}

#[async_trait::async_trait]
impl LogFetchStrategy for PaginatedFetch {
	async fn fetch(
		&self,
		client: &dyn ChainClient,
		query: &LogQuery,
		from: u64,
		to: u64,
	) -> Result<FetchedLogs, ChainError> {
		let mut logs = Vec::new();
		let mut scanned_through: Option<u64> = None;
		let mut window_start = from;

		while window_start <= to {
			let window_end = window_start
				.saturating_add(self.max_block_range - 1)
				.min(to);

			match client.get_logs(&query.range(window_start, window_end)).await {
				Ok(mut window_logs) => {
					debug!(
						"Window {}..={} returned {} logs",
						window_start,
						window_end,
						window_logs.len()
					);
					logs.append(&mut window_logs);
					scanned_through = Some(window_end);
				}
				Err(e) => match scanned_through {
					None => return Err(e),
					Some(through) => {
						warn!(
							"Window {}..={} failed after scanning through {}: {}",
							window_start, window_end, through, e
						);
						return Ok(FetchedLogs {
							logs,
							scanned_through: through,
							failure: Some(e),
						});
					}
				},
			}

			if window_end == u64::MAX {
				break;
			}
			window_start = window_end + 1;
		}

		Ok(FetchedLogs {
			logs,
			scanned_through: scanned_through.unwrap_or(to),
			failure: None,
		})
	}

	fn name(&self) -> &'static str {
		"PaginatedFetch"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::invoice_created_topic;
	use crate::chain::mock::{CONTRACT, MockChainClient, invoice_created_log};

	const PAYER: &str = "0x00000000000000000000000000000000000000aa";
	const NATIVE: &str = "0x0000000000000000000000000000000000000000";

	fn query() -> LogQuery {
		LogQuery::new(CONTRACT, invoice_created_topic())
	}

	#[tokio::test]
	async fn single_range_makes_one_call() {
		let client = MockChainClient::with_head(200);
		client.push_log(invoice_created_log(1, PAYER, 1, NATIVE, 150));

		let fetched = SingleRangeFetch.fetch(&client, &query(), 100, 200).await.unwrap();
		assert!(fetched.is_complete());
		assert_eq!(fetched.max_block(), Some(150));
		assert_eq!(client.ranges(), vec![(100, 200)]);
	}

	#[tokio::test]
	async fn paginated_splits_into_windows() {
		let client = MockChainClient::with_head(200);
		client.push_log(invoice_created_log(1, PAYER, 1, NATIVE, 150));
		client.push_log(invoice_created_log(2, PAYER, 1, NATIVE, 180));

		let fetched = PaginatedFetch::new(40).fetch(&client, &query(), 100, 200).await.unwrap();
		assert!(fetched.is_complete());
		assert_eq!(fetched.logs.len(), 2);
		assert_eq!(fetched.scanned_through, 200);
		assert_eq!(client.ranges(), vec![(100, 139), (140, 179), (180, 200)]);
	}

	#[tokio::test]
	async fn paginated_reports_partial_progress() {
		let client = MockChainClient::with_head(200);
		client.push_log(invoice_created_log(1, PAYER, 1, NATIVE, 120));
		*client.fail_logs_from.lock().unwrap() = Some(150);

		let fetched = PaginatedFetch::new(50).fetch(&client, &query(), 100, 200).await.unwrap();
		assert!(!fetched.is_complete());
		assert_eq!(fetched.scanned_through, 149);
		assert_eq!(fetched.logs.len(), 1);
	}

	#[tokio::test]
	async fn paginated_first_window_failure_is_an_error() {
		let client = MockChainClient::with_head(200);
		*client.fail_logs_from.lock().unwrap() = Some(0);

		assert!(PaginatedFetch::new(50).fetch(&client, &query(), 100, 200).await.is_err());
	}
}
