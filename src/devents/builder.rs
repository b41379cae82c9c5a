use super::{block_time, hash_bytes, DBAction, DBModelEvent, TxEvent, TxResult};
use crate::cache::{Inscription, InscriptionStats, Manager, TransferType};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Applies parsed effects to the state cache and materializes the
/// store-shaped model event for one `TxResult`.
pub struct TxResultHandler {
  cache: Arc<Manager>,
}

struct AddressTxEvent {
  address: String,
  related_address: String,
  amount: Decimal,
}

struct BalanceTxEvent {
  action: DBAction,
  sid: u64,
  address: String,
  amount: Decimal,
  available: Decimal,
  overall: Decimal,
}

impl TxResultHandler {
  pub fn new(cache: Arc<Manager>) -> TxResultHandler {
    TxResultHandler { cache }
  }

  /// Applies one effect to the cache. Init flags on mint/receive entries are
  /// set here, so `build_model` can split balance rows into create/update.
  pub fn update_cache(&self, r: &mut TxResult) {
    let protocol = r.md.protocol.clone();
    let tick = r.md.tick.clone();

    if let Some(deploy) = &r.deploy {
      self.cache.inscription.create(
        &protocol,
        &tick,
        Inscription {
          sid: 0,
          name: deploy.name.clone(),
          limit_per_mint: deploy.mint_limit,
          total_supply: deploy.max_supply,
          deploy_by: r.tx.from.to_lowercase(),
          deploy_hash: r.tx.hash.to_lowercase(),
          deploy_time: r.block.time,
          transfer_type: deploy.transfer_type,
          decimals: deploy.decimals,
        },
      );
      self
        .cache
        .stats
        .create(&protocol, &tick, InscriptionStats::default());
    }

    if let Some(mint) = r.mint.as_mut() {
      self.cache.stats.add_minted(&protocol, &tick, mint.amount);
      self.cache.stats.add_tx_count(&protocol, &tick, 1);

      let (_, created) = self.cache.balance.create(&protocol, &tick, &mint.minter);
      mint.init = created;

      let after = self
        .cache
        .balance
        .credit(&protocol, &tick, &mint.minter, mint.amount);
      if after.overall == mint.amount {
        self.cache.stats.inc_holders(&protocol, &tick);
      }

      let inscription = self
        .cache
        .inscription
        .get(&protocol, &tick)
        .unwrap_or_else(|| panic!("inscription missing for tick[{tick}]"));
      if inscription.transfer_type == TransferType::Hash {
        self
          .cache
          .utxo
          .add(&protocol, &tick, &r.tx.hash, &mint.minter, mint.amount);
      }
    }

    if let Some(transfer) = r.transfer.as_mut() {
      let send_total: Decimal = transfer.receives.iter().map(|x| x.amount).sum();

      let sender_after = self
        .cache
        .balance
        .debit(&protocol, &tick, &transfer.sender, send_total);
      if sender_after.overall.is_zero() {
        self.cache.stats.dec_holders(&protocol, &tick);
      }

      for receive in transfer.receives.iter_mut() {
        let (_, created) = self.cache.balance.create(&protocol, &tick, &receive.address);
        receive.init = created;

        let after = self
          .cache
          .balance
          .credit(&protocol, &tick, &receive.address, receive.amount);
        if after.overall == receive.amount {
          self.cache.stats.inc_holders(&protocol, &tick);
        }
      }

      if let (Some(sn), Some(first)) = (&transfer.sn, transfer.receives.first()) {
        self.cache.utxo.transfer(sn, &first.address);
      }

      self.cache.stats.add_tx_count(&protocol, &tick, 1);
    }
  }

  pub fn build_model(&self, r: &TxResult) -> DBModelEvent {
    let (balance_txs, balances) = self.build_balance(r);
    DBModelEvent {
      tx: self.build_tx(r),
      inscriptions: self.build_inscription(r),
      inscription_stats: Some(self.build_inscription_stat(r)),
      balances,
      address_txs: self.build_address_txs(r),
      balance_txs,
      utxos: self.build_utxo(r),
    }
  }

  fn event_code(&self, operate: &str) -> i8 {
    TxEvent::from_operate(operate).map(TxEvent::code).unwrap_or(0)
  }

  fn build_tx(&self, r: &TxResult) -> entities::txs::Model {
    let amount = if let Some(mint) = &r.mint {
      mint.amount
    } else if let Some(transfer) = &r.transfer {
      transfer.receives.iter().map(|x| x.amount).sum()
    } else {
      Decimal::ZERO
    };

    entities::txs::Model {
      id: 0,
      chain: r.md.chain.clone(),
      protocol: r.md.protocol.clone(),
      block_height: r.tx.block_number,
      position_in_block: r.tx.tx_index,
      block_time: block_time(r.block.time),
      tx_hash: hash_bytes(&r.tx.hash),
      from: r.tx.from.to_lowercase(),
      to: r.tx.to.to_lowercase(),
      op: r.md.operate.clone(),
      tick: r.md.tick.clone(),
      amount,
      gas: r.tx.gas as i64,
      gas_price: r.tx.gas_price as i64,
      created_at: block_time(r.block.time),
      updated_at: block_time(r.block.time),
    }
  }

  fn build_inscription(&self, r: &TxResult) -> Option<(DBAction, entities::inscriptions::Model)> {
    let deploy = r.deploy.as_ref()?;
    let cached = self
      .cache
      .inscription
      .get(&r.md.protocol, &r.md.tick)
      .unwrap_or_else(|| panic!("inscription missing for tick[{}]", r.md.tick));

    Some((
      DBAction::Create,
      entities::inscriptions::Model {
        id: 0,
        sid: cached.sid,
        chain: r.md.chain.clone(),
        protocol: r.md.protocol.clone(),
        tick: r.md.tick.clone(),
        name: deploy.name.clone(),
        limit_per_mint: deploy.mint_limit,
        total_supply: deploy.max_supply,
        deploy_by: r.tx.from.to_lowercase(),
        deploy_hash: r.tx.hash.to_lowercase(),
        deploy_time: block_time(r.block.time),
        transfer_type: deploy.transfer_type.code(),
        decimals: deploy.decimals,
        created_at: block_time(r.block.time),
        updated_at: block_time(r.block.time),
      },
    ))
  }

  fn build_inscription_stat(&self, r: &TxResult) -> (DBAction, entities::inscriptions_stats::Model) {
    let stats = self
      .cache
      .stats
      .get(&r.md.protocol, &r.md.tick)
      .unwrap_or_else(|| panic!("stats missing for tick[{}]", r.md.tick));

    let mut data = entities::inscriptions_stats::Model {
      id: 0,
      sid: stats.sid,
      chain: r.md.chain.clone(),
      protocol: r.md.protocol.clone(),
      tick: r.md.tick.clone(),
      minted: stats.minted,
      mint_completed_time: None,
      mint_first_block: 0,
      mint_last_block: 0,
      holders: stats.holders,
      tx_cnt: stats.tx_cnt,
      created_at: block_time(r.block.time),
      updated_at: block_time(r.block.time),
    };

    if let Some(mint) = &r.mint {
      // This mint moved minted past zero.
      if stats.minted == mint.amount {
        data.mint_first_block = r.block.number;
      }

      let inscription = self
        .cache
        .inscription
        .get(&r.md.protocol, &r.md.tick)
        .unwrap_or_else(|| panic!("inscription missing for tick[{}]", r.md.tick));
      if inscription.total_supply <= stats.minted {
        data.mint_last_block = r.block.number;
        data.mint_completed_time = Some(block_time(r.block.time));
      }
    }

    if r.deploy.is_some() {
      (DBAction::Create, data)
    } else {
      (DBAction::Update, data)
    }
  }

  fn build_address_tx_events(&self, r: &TxResult) -> Vec<AddressTxEvent> {
    let mut items = Vec::with_capacity(4);

    if r.deploy.is_some() {
      items.push(AddressTxEvent {
        address: r.tx.from.to_lowercase(),
        related_address: String::new(),
        amount: Decimal::ZERO,
      });
    }

    if let Some(mint) = &r.mint {
      items.push(AddressTxEvent {
        address: mint.minter.clone(),
        related_address: String::new(),
        amount: mint.amount,
      });
    }

    if let Some(transfer) = &r.transfer {
      let send_total: Decimal = transfer.receives.iter().map(|x| x.amount).sum();

      // Counterparty is only recorded for single-recipient sends.
      let send_to = if transfer.receives.len() == 1 {
        transfer.receives[0].address.clone()
      } else {
        String::new()
      };

      items.push(AddressTxEvent {
        address: transfer.sender.clone(),
        related_address: send_to,
        amount: -send_total,
      });

      for receive in &transfer.receives {
        items.push(AddressTxEvent {
          address: receive.address.clone(),
          related_address: transfer.sender.clone(),
          amount: receive.amount,
        });
      }
    }
    items
  }

  fn build_address_txs(&self, r: &TxResult) -> Vec<entities::address_txs::Model> {
    self
      .build_address_tx_events(r)
      .into_iter()
      .map(|item| entities::address_txs::Model {
        id: 0,
        event: self.event_code(&r.md.operate),
        tx_hash: hash_bytes(&r.tx.hash),
        address: item.address,
        related_address: item.related_address,
        amount: item.amount,
        tick: r.md.tick.clone(),
        protocol: r.md.protocol.clone(),
        operate: r.md.operate.clone(),
        chain: r.md.chain.clone(),
        created_at: block_time(r.block.time),
        updated_at: block_time(r.block.time),
      })
      .collect()
  }

  fn build_balance_tx_events(&self, r: &TxResult) -> Vec<BalanceTxEvent> {
    let mut items = Vec::with_capacity(4);

    if let Some(mint) = &r.mint {
      let balance = self
        .cache
        .balance
        .get(&r.md.protocol, &r.md.tick, &mint.minter)
        .unwrap_or_else(|| panic!("balance missing for minter[{}]", mint.minter));
      items.push(BalanceTxEvent {
        action: if mint.init { DBAction::Create } else { DBAction::Update },
        sid: balance.sid,
        address: mint.minter.clone(),
        amount: mint.amount,
        available: balance.available,
        overall: balance.overall,
      });
    }

    if let Some(transfer) = &r.transfer {
      let send_total: Decimal = transfer.receives.iter().map(|x| x.amount).sum();

      let sender_balance = self
        .cache
        .balance
        .get(&r.md.protocol, &r.md.tick, &transfer.sender)
        .unwrap_or_else(|| panic!("balance missing for sender[{}]", transfer.sender));
      items.push(BalanceTxEvent {
        action: DBAction::Update,
        sid: sender_balance.sid,
        address: transfer.sender.clone(),
        amount: -send_total,
        available: sender_balance.available,
        overall: sender_balance.overall,
      });

      for receive in &transfer.receives {
        let balance = self
          .cache
          .balance
          .get(&r.md.protocol, &r.md.tick, &receive.address)
          .unwrap_or_else(|| panic!("balance missing for receiver[{}]", receive.address));
        items.push(BalanceTxEvent {
          action: if receive.init { DBAction::Create } else { DBAction::Update },
          sid: balance.sid,
          address: receive.address.clone(),
          amount: receive.amount,
          available: balance.available,
          overall: balance.overall,
        });
      }
    }
    items
  }

  #[allow(clippy::type_complexity)]
  fn build_balance(
    &self,
    r: &TxResult,
  ) -> (
    Vec<entities::balance_txn::Model>,
    Vec<(DBAction, entities::balances::Model)>,
  ) {
    let events = self.build_balance_tx_events(r);
    let mut txns = Vec::with_capacity(events.len());
    let mut balances = Vec::with_capacity(events.len());

    for event in events {
      txns.push(entities::balance_txn::Model {
        id: 0,
        chain: r.md.chain.clone(),
        protocol: r.md.protocol.clone(),
        event: self.event_code(&r.md.operate),
        address: event.address.clone(),
        tick: r.md.tick.clone(),
        amount: event.amount,
        available: event.available,
        balance: event.overall,
        tx_hash: hash_bytes(&r.tx.hash),
        created_at: block_time(r.block.time),
        updated_at: block_time(r.block.time),
      });

      balances.push((
        event.action,
        entities::balances::Model {
          id: 0,
          sid: event.sid,
          chain: r.md.chain.clone(),
          protocol: r.md.protocol.clone(),
          address: event.address,
          tick: r.md.tick.clone(),
          available: event.available,
          balance: event.overall,
          created_at: block_time(r.block.time),
          updated_at: block_time(r.block.time),
        },
      ));
    }
    (txns, balances)
  }

  fn build_utxo(&self, r: &TxResult) -> Option<(DBAction, entities::utxos::Model)> {
    let model = |sn: &str, address: &str, amount: Decimal| entities::utxos::Model {
      id: 0,
      chain: r.md.chain.clone(),
      protocol: r.md.protocol.clone(),
      tick: r.md.tick.clone(),
      sn: sn.to_lowercase(),
      amount,
      address: address.to_string(),
      created_at: block_time(r.block.time),
      updated_at: block_time(r.block.time),
    };

    if let Some(mint) = &r.mint {
      let inscription = self
        .cache
        .inscription
        .get(&r.md.protocol, &r.md.tick)
        .unwrap_or_else(|| panic!("inscription missing for tick[{}]", r.md.tick));
      if inscription.transfer_type == TransferType::Hash {
        return Some((
          DBAction::Create,
          model(&r.tx.hash, &mint.minter, mint.amount),
        ));
      }
    }

    if let Some(transfer) = &r.transfer {
      if let (Some(sn), Some(first)) = (&transfer.sn, transfer.receives.first()) {
        let note = self
          .cache
          .utxo
          .get(sn)
          .unwrap_or_else(|| panic!("utxo missing for sn[{sn}]"));
        return Some((DBAction::Update, model(sn, &first.address, note.amount)));
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chain::RpcTransaction;
  use crate::devents::{BlockHeader, DeployEvent, MintEvent, Receive, TransferEvent};
  use crate::protocol::{Metadata, OPERATE_DEPLOY, OPERATE_MINT, OPERATE_TRANSFER};

  const CHAIN: &str = "avax";
  const PROTOCOL: &str = "asc-20";

  fn handler() -> TxResultHandler {
    TxResultHandler::new(Arc::new(Manager::new()))
  }

  fn result(operate: &str, tick: &str, block_number: u64, hash: &str) -> TxResult {
    TxResult {
      md: Metadata {
        chain: CHAIN.into(),
        protocol: PROTOCOL.into(),
        tick: tick.into(),
        operate: operate.into(),
        data: String::new(),
      },
      block: BlockHeader {
        number: block_number,
        hash: format!("0xb{block_number}"),
        time: 1_700_000_000 + block_number,
      },
      tx: RpcTransaction {
        hash: hash.into(),
        from: "0xdeployer".into(),
        to: "0xdeployer".into(),
        block_number,
        ..RpcTransaction::default()
      },
      deploy: None,
      mint: None,
      transfer: None,
    }
  }

  fn deploy_result(tick: &str, total_supply: u64, transfer_type: TransferType) -> TxResult {
    let mut r = result(OPERATE_DEPLOY, tick, 10, "0xaaa");
    r.deploy = Some(DeployEvent {
      name: tick.into(),
      max_supply: Decimal::from(total_supply),
      mint_limit: Decimal::from(100),
      decimals: 8,
      transfer_type,
    });
    r
  }

  fn mint_result(tick: &str, minter: &str, amount: u64, block_number: u64, hash: &str) -> TxResult {
    let mut r = result(OPERATE_MINT, tick, block_number, hash);
    r.tx.to = minter.into();
    r.mint = Some(MintEvent {
      minter: minter.into(),
      amount: Decimal::from(amount),
      init: false,
    });
    r
  }

  #[test]
  fn deploy_then_first_mint() {
    let handler = handler();

    let mut deploy = deploy_result("uxuy", 1000, TransferType::Balance);
    handler.update_cache(&mut deploy);
    let deploy_event = handler.build_model(&deploy);

    let (action, inscription) = deploy_event.inscriptions.unwrap();
    assert_eq!(action, DBAction::Create);
    assert_eq!(inscription.sid, 1);
    assert_eq!(inscription.tick, "uxuy");
    assert_eq!(inscription.total_supply, Decimal::from(1000));

    let mut mint = mint_result("uxuy", "0xalice", 100, 11, "0xbbb");
    handler.update_cache(&mut mint);
    let mint_event = handler.build_model(&mint);

    let (action, stats) = mint_event.inscription_stats.unwrap();
    assert_eq!(action, DBAction::Update);
    assert_eq!(stats.minted, Decimal::from(100));
    assert_eq!(stats.holders, 1);
    assert_eq!(stats.tx_cnt, 1);
    assert_eq!(stats.mint_first_block, 11);
    assert_eq!(stats.mint_last_block, 0);

    let (action, balance) = &mint_event.balances[0];
    assert_eq!(*action, DBAction::Create);
    assert_eq!(balance.address, "0xalice");
    assert_eq!(balance.available, Decimal::from(100));
    assert_eq!(balance.balance, Decimal::from(100));

    assert_eq!(mint_event.tx.amount, Decimal::from(100));
    assert!(mint_event.utxos.is_none());
  }

  #[test]
  fn final_mint_records_completion() {
    let handler = handler();

    let mut deploy = deploy_result("uxuy", 200, TransferType::Balance);
    handler.update_cache(&mut deploy);

    let mut first = mint_result("uxuy", "0xalice", 100, 11, "0xb1");
    handler.update_cache(&mut first);
    handler.build_model(&first);

    let mut last = mint_result("uxuy", "0xbob", 100, 12, "0xb2");
    handler.update_cache(&mut last);
    let event = handler.build_model(&last);

    let (_, stats) = event.inscription_stats.unwrap();
    assert_eq!(stats.minted, Decimal::from(200));
    assert_eq!(stats.mint_first_block, 0);
    assert_eq!(stats.mint_last_block, 12);
    assert!(stats.mint_completed_time.is_some());
  }

  #[test]
  fn multi_receive_transfer_journals_every_leg() {
    let handler = handler();

    let mut deploy = deploy_result("uxuy", 1000, TransferType::Balance);
    handler.update_cache(&mut deploy);
    let mut mint = mint_result("uxuy", "0xalice", 100, 11, "0xb1");
    handler.update_cache(&mut mint);

    let mut transfer = result(OPERATE_TRANSFER, "uxuy", 12, "0xccc");
    transfer.tx.from = "0xalice".into();
    transfer.transfer = Some(TransferEvent {
      sender: "0xalice".into(),
      sn: None,
      receives: vec![
        Receive {
          address: "0xbob".into(),
          amount: Decimal::from(30),
          init: false,
        },
        Receive {
          address: "0xcarol".into(),
          amount: Decimal::from(20),
          init: false,
        },
      ],
    });
    handler.update_cache(&mut transfer);
    let event = handler.build_model(&transfer);

    let cache = &handler.cache;
    assert_eq!(
      cache.balance.get(PROTOCOL, "uxuy", "0xalice").unwrap().overall,
      Decimal::from(50)
    );
    assert_eq!(
      cache.balance.get(PROTOCOL, "uxuy", "0xbob").unwrap().overall,
      Decimal::from(30)
    );
    assert_eq!(
      cache.balance.get(PROTOCOL, "uxuy", "0xcarol").unwrap().overall,
      Decimal::from(20)
    );
    assert_eq!(cache.stats.get(PROTOCOL, "uxuy").unwrap().holders, 3);

    assert_eq!(event.balance_txs.len(), 3);
    assert_eq!(event.balance_txs[0].amount, Decimal::from(-50));
    assert_eq!(event.balance_txs[0].balance, Decimal::from(50));

    assert_eq!(event.address_txs.len(), 3);
    // Multi-recipient sends record no counterparty for the sender.
    assert_eq!(event.address_txs[0].related_address, "");
    assert_eq!(event.address_txs[1].related_address, "0xalice");

    assert_eq!(event.tx.amount, Decimal::from(50));
  }

  #[test]
  fn full_drain_releases_holder_slot() {
    let handler = handler();

    let mut deploy = deploy_result("uxuy", 1000, TransferType::Balance);
    handler.update_cache(&mut deploy);
    let mut mint = mint_result("uxuy", "0xalice", 100, 11, "0xb1");
    handler.update_cache(&mut mint);

    let mut transfer = result(OPERATE_TRANSFER, "uxuy", 12, "0xccc");
    transfer.transfer = Some(TransferEvent {
      sender: "0xalice".into(),
      sn: None,
      receives: vec![Receive {
        address: "0xbob".into(),
        amount: Decimal::from(100),
        init: false,
      }],
    });
    handler.update_cache(&mut transfer);

    assert_eq!(handler.cache.stats.get(PROTOCOL, "uxuy").unwrap().holders, 1);
  }

  #[test]
  fn hash_mint_and_transfer_move_the_note() {
    let handler = handler();

    let mut deploy = deploy_result("hash1", 1000, TransferType::Hash);
    handler.update_cache(&mut deploy);

    let mut mint = mint_result("hash1", "0xalice", 40, 11, "0xmint1");
    handler.update_cache(&mut mint);
    let mint_event = handler.build_model(&mint);

    let (action, utxo) = mint_event.utxos.unwrap();
    assert_eq!(action, DBAction::Create);
    assert_eq!(utxo.sn, "0xmint1");
    assert_eq!(utxo.address, "0xalice");

    let mut transfer = result(OPERATE_TRANSFER, "hash1", 12, "0xddd");
    transfer.transfer = Some(TransferEvent {
      sender: "0xalice".into(),
      sn: Some("0xmint1".into()),
      receives: vec![Receive {
        address: "0xbob".into(),
        amount: Decimal::from(40),
        init: false,
      }],
    });
    handler.update_cache(&mut transfer);
    let event = handler.build_model(&transfer);

    let note = handler.cache.utxo.get("0xmint1").unwrap();
    assert_eq!(note.owner, "0xbob");
    assert_eq!(note.amount, Decimal::from(40));

    let (action, utxo) = event.utxos.unwrap();
    assert_eq!(action, DBAction::Update);
    assert_eq!(utxo.address, "0xbob");

    assert_eq!(
      handler.cache.balance.get(PROTOCOL, "hash1", "0xbob").unwrap().overall,
      Decimal::from(40)
    );
  }
}
