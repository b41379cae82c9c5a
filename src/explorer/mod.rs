use crate::chain::{ChainClient, RpcBlock, RpcReceipt, RpcTransaction};
use crate::config::Config;
use crate::devents::{DEvents, Event, TxResultHandler};
use crate::protocol::{ParseError, Registry};
use anyhow::anyhow;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const BLOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The per-block pipeline: fast check, protocol filter, receipt enrichment,
/// decode, cache update, model build, block-event emission.
pub struct Explorer {
  config: Arc<Config>,
  node: Arc<dyn ChainClient>,
  registry: Arc<Registry>,
  handler: TxResultHandler,
  devents: DEvents,
  blocks: mpsc::Receiver<RpcBlock>,
  shutdown: CancellationToken,
}

impl Explorer {
  pub fn new(
    config: Arc<Config>,
    node: Arc<dyn ChainClient>,
    registry: Arc<Registry>,
    handler: TxResultHandler,
    devents: DEvents,
    blocks: mpsc::Receiver<RpcBlock>,
    shutdown: CancellationToken,
  ) -> Explorer {
    Explorer {
      config,
      node,
      registry,
      handler,
      devents,
      blocks,
      shutdown,
    }
  }

  /// Block intake loop. Blocks arrive in chain order and are processed
  /// serially; cancellation stops intake after the in-flight block.
  pub async fn index(mut self) {
    log::info!("start indexing...");
    loop {
      tokio::select! {
        maybe = self.blocks.recv() => match maybe {
          Some(block) => self.handle_block(block).await,
          None => break,
        },
        _ = self.shutdown.cancelled() => break,
      }
    }
    log::info!("index quit");
  }

  /// Runs one block through the pipeline, retrying the whole block on
  /// internal errors until it lands or shutdown is requested.
  async fn handle_block(&self, block: RpcBlock) {
    if block.number == 0 {
      log::info!("block nil or number[{}] <= 0", block.number);
      return;
    }

    let start = Instant::now();
    let mut retry = 0;
    loop {
      if self.shutdown.is_cancelled() {
        return;
      }

      let txs = self.extract_txs(&block);
      let txs = self.try_filter_txs(txs);

      let txs = match self.valid_receipt_txs(txs).await {
        Ok(txs) => txs,
        Err(err) => {
          log::error!("fetch receipt data internal err:{err} & retry later[{retry}]");
          retry += 1;
          tokio::time::sleep(BLOCK_RETRY_DELAY).await;
          continue;
        }
      };

      match self.handle_txs(&block, txs).await {
        Ok(()) => break,
        Err(err) => {
          log::error!("parse internal err:{err} & retry later[{retry}]");
          retry += 1;
          tokio::time::sleep(BLOCK_RETRY_DELAY).await;
        }
      }
    }
    log::info!(
      "handle block[{}] finished, cost:{} ms",
      block.number,
      start.elapsed().as_millis()
    );
  }

  fn extract_txs(&self, block: &RpcBlock) -> Vec<RpcTransaction> {
    block
      .transactions
      .iter()
      .filter(|tx| self.fast_checking(tx))
      .cloned()
      .collect()
  }

  fn fast_checking(&self, tx: &RpcTransaction) -> bool {
    if !tx.events.is_empty() {
      return true;
    }

    let input = tx.input.to_lowercase();
    input.starts_with("0x") && input.starts_with(&self.config.chain.data_prefix.to_lowercase())
  }

  fn try_filter_txs(&self, txs: Vec<RpcTransaction>) -> Vec<RpcTransaction> {
    txs
      .into_iter()
      .filter(|tx| match self.registry.resolve(tx) {
        Some((_, md)) => self.protocol_enabled(&md.protocol) && self.tick_enabled(&md.tick),
        None => false,
      })
      .collect()
  }

  /// Fetches receipts with a bounded worker pool, preserving input order in
  /// the output. A missing receipt fails the whole block; a non-success
  /// status drops the tx; gas fields are overwritten from the receipt.
  async fn valid_receipt_txs(&self, txs: Vec<RpcTransaction>) -> crate::Result<Vec<RpcTransaction>> {
    if txs.is_empty() {
      return Ok(txs);
    }

    let hashes: HashSet<String> = txs.iter().map(|tx| tx.hash.clone()).collect();
    let receipts: HashMap<String, RpcReceipt> = futures::stream::iter(hashes)
      .map(|hash| {
        let node = self.node.clone();
        async move {
          match node.transaction_receipt(&hash).await {
            Ok(Some(receipt)) => Some((hash, receipt)),
            Ok(None) => {
              log::error!("get tx receipt nil, tx:{hash}");
              None
            }
            Err(err) => {
              log::error!("get tx receipt err:{err}, tx:{hash}");
              None
            }
          }
        }
      })
      .buffer_unordered(self.config.server.scan_limit)
      .filter_map(|entry| async move { entry })
      .collect()
      .await;

    let mut results = Vec::with_capacity(txs.len());
    for mut tx in txs {
      let receipt = receipts
        .get(&tx.hash)
        .ok_or_else(|| anyhow!("get tx[{}] receipt nil", tx.hash))?;

      if receipt.status != 1 {
        log::warn!("tx[{}] status <> 1 & filtered", tx.hash);
        continue;
      }

      if receipt.effective_gas_price > 0 {
        tx.gas_price = receipt.effective_gas_price;
      }
      if receipt.gas_used > 0 {
        tx.gas = receipt.gas_used;
      }
      results.push(tx);
    }
    Ok(results)
  }

  async fn handle_txs(&self, block: &RpcBlock, txs: Vec<RpcTransaction>) -> Result<(), ParseError> {
    let mut items = Vec::with_capacity(txs.len());
    for tx in txs {
      let Some((decoder, md)) = self.registry.resolve(&tx) else {
        continue;
      };
      if !self.protocol_enabled(&md.protocol) || !self.tick_enabled(&md.tick) {
        continue;
      }

      let results = match decoder.parse(block, &tx, md).await {
        Ok(results) => results,
        Err(err) if err.is_internal() => return Err(err),
        Err(err) => {
          log::info!("tx data parsed failed. tx[{}], err[{err}]", tx.hash);
          continue;
        }
      };
      if results.is_empty() {
        log::warn!("tx data parsed result nil. tx[{}]", tx.hash);
        continue;
      }

      for mut result in results {
        self.handler.update_cache(&mut result);
        items.push(self.handler.build_model(&result));
      }
    }

    self.write_db_async(block, items).await
  }

  async fn write_db_async(
    &self,
    block: &RpcBlock,
    items: Vec<crate::devents::DBModelEvent>,
  ) -> Result<(), ParseError> {
    if items.is_empty() {
      return Ok(());
    }

    let event = Event {
      chain: self.config.chain.chain_name.clone(),
      chain_id: self.config.chain.chain_id,
      block_number: block.number,
      block_time: block.time,
      block_hash: block.hash.clone(),
      items,
    };
    self
      .devents
      .write_db_async(event)
      .await
      .map_err(ParseError::internal)
  }

  fn protocol_enabled(&self, protocol: &str) -> bool {
    let Some(whitelist) = self.config.filters.as_ref().and_then(|f| f.whitelist.as_ref()) else {
      return true;
    };
    if whitelist.protocols.is_empty() {
      return true;
    }
    whitelist
      .protocols
      .iter()
      .any(|p| p.eq_ignore_ascii_case(protocol))
  }

  fn tick_enabled(&self, tick: &str) -> bool {
    let Some(whitelist) = self.config.filters.as_ref().and_then(|f| f.whitelist.as_ref()) else {
      return true;
    };
    if whitelist.ticks.is_empty() {
      return true;
    }
    whitelist.ticks.iter().any(|t| t.eq_ignore_ascii_case(tick))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::Manager;
  use crate::config::{ChainConfig, DatabaseConfig, FilterConfig, ServerConfig, WhitelistConfig};
  use crate::protocol::asc20::{Asc20, PROTOCOL_NAME};
  use async_trait::async_trait;
  use sea_orm::prelude::Decimal;

  struct MockClient {
    receipts: HashMap<String, RpcReceipt>,
  }

  #[async_trait]
  impl ChainClient for MockClient {
    async fn transaction_receipt(&self, hash: &str) -> crate::Result<Option<RpcReceipt>> {
      Ok(self.receipts.get(hash).cloned())
    }
  }

  fn config(filters: Option<FilterConfig>) -> Arc<Config> {
    Arc::new(Config {
      server: ServerConfig {
        scan_limit: 4,
        flush_depth: 8,
      },
      chain: ChainConfig {
        chain_name: "avax".into(),
        chain_id: 43114,
        rpc: String::new(),
        // hex("data:")
        data_prefix: "0x646174613a".into(),
        block_interval_ms: 10,
      },
      database: DatabaseConfig { dsn: String::new() },
      filters,
    })
  }

  fn hex_input(text: &str) -> String {
    format!("0x{}", hex::encode(text))
  }

  fn tx(hash: &str, from: &str, to: &str, text: &str) -> RpcTransaction {
    RpcTransaction {
      hash: hash.into(),
      from: from.into(),
      to: to.into(),
      input: hex_input(text),
      block_number: 10,
      ..RpcTransaction::default()
    }
  }

  fn block(number: u64, transactions: Vec<RpcTransaction>) -> RpcBlock {
    RpcBlock {
      number,
      hash: format!("0xb{number}"),
      time: 1_700_000_000 + number,
      chain_id: 43114,
      transactions,
    }
  }

  fn ok_receipt() -> RpcReceipt {
    RpcReceipt {
      status: 1,
      effective_gas_price: 25,
      gas_used: 21000,
    }
  }

  struct Fixture {
    explorer: Explorer,
    cache: Arc<Manager>,
    events: mpsc::Receiver<Event>,
  }

  fn fixture(receipts: HashMap<String, RpcReceipt>, filters: Option<FilterConfig>) -> Fixture {
    let config = config(filters);
    let cache = Arc::new(Manager::new());
    let mut registry = Registry::new(&config.chain.chain_name, &config.chain.data_prefix);
    registry.register(PROTOCOL_NAME, Arc::new(Asc20::new(cache.clone())));
    let (devents, events) = DEvents::channel(16);
    let (_, blocks) = mpsc::channel(1);

    let explorer = Explorer::new(
      config,
      Arc::new(MockClient { receipts }),
      Arc::new(registry),
      TxResultHandler::new(cache.clone()),
      devents,
      blocks,
      CancellationToken::new(),
    );
    Fixture {
      explorer,
      cache,
      events,
    }
  }

  #[tokio::test]
  async fn deploy_and_mint_flow_through_the_pipeline() {
    let deploy_tx = tx(
      "0xaaa",
      "0xdeployer",
      "0xdeployer",
      r#"data:,{"p":"asc-20","op":"deploy","tick":"UXUY","max":"1000","lim":"100","dec":"8"}"#,
    );
    let mint_tx = tx(
      "0xbbb",
      "0xalice",
      "0xalice",
      r#"data:,{"p":"asc-20","op":"mint","tick":"uxuy","amt":"100"}"#,
    );
    let receipts = HashMap::from([
      ("0xaaa".to_string(), ok_receipt()),
      ("0xbbb".to_string(), ok_receipt()),
    ]);
    let mut fixture = fixture(receipts, None);

    fixture.explorer.handle_block(block(10, vec![deploy_tx])).await;
    fixture.explorer.handle_block(block(11, vec![mint_tx])).await;

    let deploy_event = fixture.events.try_recv().unwrap();
    assert_eq!(deploy_event.block_number, 10);
    let (_, inscription) = deploy_event.items[0].inscriptions.clone().unwrap();
    assert_eq!(inscription.sid, 1);
    assert_eq!(inscription.tick, "uxuy");

    let mint_event = fixture.events.try_recv().unwrap();
    assert_eq!(mint_event.block_number, 11);
    let (_, stats) = mint_event.items[0].inscription_stats.clone().unwrap();
    assert_eq!(stats.minted, Decimal::from(100));
    assert_eq!(stats.holders, 1);
    assert_eq!(stats.mint_first_block, 11);

    let balance = fixture.cache.balance.get(PROTOCOL_NAME, "uxuy", "0xalice").unwrap();
    assert_eq!(balance.available, Decimal::from(100));
    assert_eq!(balance.overall, Decimal::from(100));

    // Gas fields come from the receipt.
    assert_eq!(mint_event.items[0].tx.gas, 21000);
    assert_eq!(mint_event.items[0].tx.gas_price, 25);
  }

  #[tokio::test]
  async fn failed_tx_leaves_no_trace() {
    let mint_tx = tx(
      "0xbbb",
      "0xalice",
      "0xalice",
      r#"data:,{"p":"asc-20","op":"mint","tick":"uxuy","amt":"100"}"#,
    );
    let receipts = HashMap::from([(
      "0xbbb".to_string(),
      RpcReceipt {
        status: 0,
        ..ok_receipt()
      },
    )]);
    let mut fixture = fixture(receipts, None);

    fixture.explorer.handle_block(block(10, vec![mint_tx])).await;

    assert!(fixture.events.try_recv().is_err());
    assert!(fixture.cache.balance.get(PROTOCOL_NAME, "uxuy", "0xalice").is_none());
  }

  #[tokio::test]
  async fn missing_receipt_fails_the_block() {
    let mint_tx = tx(
      "0xbbb",
      "0xalice",
      "0xalice",
      r#"data:,{"p":"asc-20","op":"mint","tick":"uxuy","amt":"100"}"#,
    );
    let fixture = fixture(HashMap::new(), None);

    let filtered = fixture.explorer.try_filter_txs(vec![mint_tx]);
    assert_eq!(filtered.len(), 1);
    assert!(fixture.explorer.valid_receipt_txs(filtered).await.is_err());
  }

  #[tokio::test]
  async fn fast_check_gates_foreign_inputs() {
    let fixture = fixture(HashMap::new(), None);

    let plain = RpcTransaction {
      input: "0xa9059cbb".into(),
      ..RpcTransaction::default()
    };
    assert!(!fixture.explorer.fast_checking(&plain));

    let inscription = tx("0xaaa", "0xa", "0xb", r#"data:,{"p":"asc-20","op":"mint"}"#);
    assert!(fixture.explorer.fast_checking(&inscription));

    let with_events = RpcTransaction {
      events: vec!["0xtopic".into()],
      ..RpcTransaction::default()
    };
    assert!(fixture.explorer.fast_checking(&with_events));
  }

  #[tokio::test]
  async fn whitelist_drops_foreign_ticks() {
    let deploy_tx = tx(
      "0xaaa",
      "0xdeployer",
      "0xdeployer",
      r#"data:,{"p":"asc-20","op":"deploy","tick":"spam","max":"1000"}"#,
    );
    let receipts = HashMap::from([("0xaaa".to_string(), ok_receipt())]);
    let filters = Some(FilterConfig {
      whitelist: Some(WhitelistConfig {
        protocols: vec!["asc-20".into()],
        ticks: vec!["uxuy".into()],
      }),
    });
    let mut fixture = fixture(receipts, filters);

    fixture.explorer.handle_block(block(10, vec![deploy_tx])).await;

    assert!(fixture.events.try_recv().is_err());
    assert!(fixture.cache.inscription.get(PROTOCOL_NAME, "spam").is_none());
  }

  #[tokio::test]
  async fn rejected_tx_skips_but_block_continues() {
    // Mint without a deploy is a per-tx reject; the deploy in the same
    // block still lands.
    let bad_mint = tx(
      "0xbad",
      "0xalice",
      "0xalice",
      r#"data:,{"p":"asc-20","op":"mint","tick":"ghost","amt":"1"}"#,
    );
    let deploy_tx = tx(
      "0xaaa",
      "0xdeployer",
      "0xdeployer",
      r#"data:,{"p":"asc-20","op":"deploy","tick":"uxuy","max":"1000"}"#,
    );
    let receipts = HashMap::from([
      ("0xbad".to_string(), ok_receipt()),
      ("0xaaa".to_string(), ok_receipt()),
    ]);
    let mut fixture = fixture(receipts, None);

    fixture
      .explorer
      .handle_block(block(10, vec![bad_mint, deploy_tx]))
      .await;

    let event = fixture.events.try_recv().unwrap();
    assert_eq!(event.items.len(), 1);
    assert_eq!(event.items[0].tx.op, "deploy");
  }
}
