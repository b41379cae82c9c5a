use clap::Parser;
use inscription_indexer::cache;
use inscription_indexer::chain::{self, HttpClient};
use inscription_indexer::config::Config;
use inscription_indexer::devents::{DEvents, Flusher, TxResultHandler};
use inscription_indexer::explorer::Explorer;
use inscription_indexer::protocol::{asc20, Registry};
use sea_orm::Database;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_QUEUE_CAPACITY: usize = 1024;
const BLOCK_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "inscription-indexer")]
struct Args {
  #[arg(long, default_value = "config.json", help = "Load configuration from <CONFIG>.")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
  let args = Args::parse();
  let config = Arc::new(Config::load(&args.config)?);

  let db = Database::connect(config.database.dsn.as_str()).await?;
  let cache = Arc::new(cache::recover(&db, &config.chain.chain_name).await?);

  let mut registry = Registry::new(&config.chain.chain_name, &config.chain.data_prefix);
  registry.register(
    asc20::PROTOCOL_NAME,
    Arc::new(asc20::Asc20::new(cache.clone())),
  );

  let shutdown = CancellationToken::new();
  let (devents, event_rx) = DEvents::channel(EVENT_QUEUE_CAPACITY);
  let flusher = Flusher::new(
    event_rx,
    db.clone(),
    config.server.flush_depth,
    shutdown.clone(),
  );

  let start_block = dal::dal::block_status::Query::find_last_block(&db, &config.chain.chain_name)
    .await?
    .map(|status| status.block_number + 1)
    .unwrap_or(1);
  log::info!(
    "indexing chain[{}] from block[{start_block}]",
    config.chain.chain_name
  );

  let node = Arc::new(HttpClient::new(&config.chain.rpc)?);
  let (block_tx, block_rx) = mpsc::channel(BLOCK_QUEUE_CAPACITY);
  let poller = tokio::spawn(chain::subscribe_blocks(
    node.clone(),
    block_tx,
    start_block,
    Duration::from_millis(config.chain.block_interval_ms),
    config.chain.chain_id,
    shutdown.clone(),
  ));

  let explorer = Explorer::new(
    config.clone(),
    node,
    Arc::new(registry),
    TxResultHandler::new(cache),
    devents,
    block_rx,
    shutdown.clone(),
  );

  let flusher_task = tokio::spawn(flusher.run());
  let mut indexer_task = tokio::spawn(explorer.index());

  tokio::select! {
    _ = tokio::signal::ctrl_c() => log::info!("shutdown signal received"),
    result = &mut indexer_task => {
      // A pipeline panic surfaces here; no partial-state continuation.
      if let Err(err) = result {
        log::error!("index error & quit, err[{err}]");
      }
    }
  }
  shutdown.cancel();

  if !indexer_task.is_finished() {
    let _ = indexer_task.await;
  }
  let _ = poller.await;
  // The flusher drains its queue before exiting, so every block event the
  // pipeline emitted is committed or retried until it is.
  let _ = flusher_task.await;

  Ok(())
}
