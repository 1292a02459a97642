use invoice_sync::chain::{InvoiceContract, JsonRpcChainClient, RpcTransport, abi};
use invoice_sync::config::SyncConfig;
use invoice_sync::projection::InvoiceProjection;
use invoice_sync::store::{InvoiceDatabase, InvoiceRecord};
use invoice_sync::sync::{InvoiceSynchronizer, LoggingEventHandler, SyncPhase, SyncStatus};
use invoice_sync::utils::format_ether;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	if let Err(e) = dotenvy::dotenv() {
		if !e.not_found() {
			warn!("Failed to load .env file: {}", e);
		}
	}

	let config = match SyncConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	info!("Starting invoice sync service");

	let chain = match JsonRpcChainClient::new(
		config.rpc_url.clone(),
		config.request_timeout,
		config.retry_budget,
	) {
		Ok(client) => Arc::new(client),
		Err(e) => {
			error!("Failed to create chain client: {}", e);
			return;
		}
	};

	info!("Created chain client for {}", chain.rpc_url());

	let database = match InvoiceDatabase::open(config.data_dir.clone()).await {
		Ok(database) => Arc::new(database),
		Err(e) => {
			error!("Failed to open invoice database: {}", e);
			return;
		}
	};

	let contract = Arc::new(InvoiceContract::new(
		chain.clone() as Arc<dyn RpcTransport>,
		config.contract_address.clone(),
		config.from_address.clone(),
	));
	if contract.can_send() {
		info!("Invoice transactions enabled for {}", contract.address());
	}

	let synchronizer = Arc::new(InvoiceSynchronizer::new(
		chain,
		database.clone(),
		config.fetch_strategy(),
		config.synchronizer_config(),
	));
	synchronizer
		.register_handler(Box::new(LoggingEventHandler))
		.await;

	let shutdown = synchronizer.shutdown_handle();
	let display = tokio::spawn(display_invoices(database.subscribe(), contract));
	let status = tokio::spawn(report_status(synchronizer.status()));
	let sync_task = tokio::spawn(synchronizer.clone().run());

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for ctrl-c: {}", e);
	}

	info!("Shutting down");
	shutdown.shutdown();
	if let Err(e) = sync_task.await {
		error!("Sync task ended abnormally: {}", e);
	}
	display.abort();
	status.abort();

	if let Some(stats) = synchronizer.stats().await {
		info!("Final sync stats: {}", stats.summary());
	}
	database.close().await;
}

async fn display_invoices(mut projection: InvoiceProjection, contract: Arc<InvoiceContract>) {
	info!("{} invoices cached", projection.len());
	while let Some(invoices) = projection.changed().await {
		info!("{} invoices cached", invoices.len());
		let Some(newest) = invoices.first() else {
			continue;
		};
		info!("Latest invoice: {}", describe(newest));

		match contract.invoice_details(&newest.token_id).await {
			Ok(details) => info!(
				"Invoice #{} \"{}\" is {}",
				newest.token_id,
				details.description,
				if details.is_paid { "paid" } else { "unpaid" }
			),
			Err(e) => warn!("Failed to read invoice #{}: {}", newest.token_id, e),
		}
	}
}

async fn report_status(mut status: watch::Receiver<SyncStatus>) {
	while status.changed().await.is_ok() {
		let current = status.borrow_and_update().clone();
		match (&current.phase, &current.last_error) {
			(SyncPhase::Stopped, _) => break,
			_ if current.is_polling() => {
				debug!("Polling from block {:?}", current.last_synced_block)
			}
			(SyncPhase::Idle, Some(error)) => {
				warn!(
					"Sync behind at block {:?}: {}",
					current.last_synced_block, error
				)
			}
			_ => {}
		}
	}
}

fn describe(invoice: &InvoiceRecord) -> String {
	let amount = if invoice.token == abi::NATIVE_TOKEN_ADDRESS {
		match format_ether(&invoice.amount) {
			Ok(ether) => format!("{} ETH", ether),
			Err(_) => format!("{} wei", invoice.amount),
		}
	} else {
		format!("{} of token {}", invoice.amount, invoice.token)
	};
	format!(
		"#{} from {} for {}",
		invoice.token_id, invoice.payer, amount
	)
}
