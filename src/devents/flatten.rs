use super::{block_time, DBAction, Event};
use std::collections::BTreeMap;

/// One flush-ready batch: every block event in the window flattened into
/// grouped, identity-deduplicated model lists plus the watermark row.
#[derive(Clone, Debug)]
pub struct DBModelsFlattened {
  pub inscription_creates: Vec<entities::inscriptions::Model>,
  pub inscription_updates: Vec<entities::inscriptions::Model>,
  pub stats_creates: Vec<entities::inscriptions_stats::Model>,
  pub stats_updates: Vec<entities::inscriptions_stats::Model>,
  pub balance_creates: Vec<entities::balances::Model>,
  pub balance_updates: Vec<entities::balances::Model>,
  pub utxo_creates: Vec<entities::utxos::Model>,
  pub utxo_updates: Vec<entities::utxos::Model>,
  pub txs: Vec<entities::txs::Model>,
  pub address_txs: Vec<entities::address_txs::Model>,
  pub balance_txs: Vec<entities::balance_txn::Model>,
  pub block_status: entities::block_status::Model,
}

/// Collapses the events of one flush window. Later mutations of the same
/// identity win; stats keep the sticky mint-lifecycle marks from earlier
/// entries; the journals are append-only. BTreeMap keys make the group
/// ordering deterministic, so replaying a window reproduces the same batch.
pub fn build_db_update_model(block_events: Vec<Event>) -> DBModelsFlattened {
  let mut ins_creates: BTreeMap<u32, entities::inscriptions::Model> = BTreeMap::new();
  let mut ins_updates: BTreeMap<u32, entities::inscriptions::Model> = BTreeMap::new();
  let mut stats_creates: BTreeMap<u32, entities::inscriptions_stats::Model> = BTreeMap::new();
  let mut stats_updates: BTreeMap<u32, entities::inscriptions_stats::Model> = BTreeMap::new();
  let mut balance_creates: BTreeMap<u64, entities::balances::Model> = BTreeMap::new();
  let mut balance_updates: BTreeMap<u64, entities::balances::Model> = BTreeMap::new();
  let mut utxo_creates: BTreeMap<String, entities::utxos::Model> = BTreeMap::new();
  let mut utxo_updates: BTreeMap<String, entities::utxos::Model> = BTreeMap::new();
  let mut txs: BTreeMap<String, entities::txs::Model> = BTreeMap::new();
  let mut address_txs = Vec::new();
  let mut balance_txs = Vec::new();

  let last = block_events
    .last()
    .expect("flush window must not be empty");
  let block_status = entities::block_status::Model {
    id: 0,
    chain: last.chain.clone(),
    chain_id: last.chain_id,
    block_number: last.block_number,
    block_hash: last.block_hash.clone(),
    block_time: block_time(last.block_time),
    created_at: block_time(last.block_time),
    updated_at: block_time(last.block_time),
  };

  for block_event in block_events {
    for event in block_event.items {
      if let Some((action, item)) = event.inscriptions {
        let group = match action {
          DBAction::Create => &mut ins_creates,
          DBAction::Update => &mut ins_updates,
        };
        if group.contains_key(&item.sid) {
          log::debug!("ins sid[{}] exist & force update, tick[{}]", item.sid, item.tick);
        }
        group.insert(item.sid, item);
      }

      if let Some((action, mut item)) = event.inscription_stats {
        let group = match action {
          DBAction::Create => &mut stats_creates,
          DBAction::Update => &mut stats_updates,
        };
        if let Some(last_item) = group.get(&item.sid) {
          log::debug!(
            "ins stats sid[{}] exist & force update, tick[{}]",
            item.sid,
            item.tick
          );

          // Mint lifecycle marks from earlier entries stick.
          if last_item.mint_first_block > 0 {
            item.mint_first_block = last_item.mint_first_block;
          }
          if last_item.mint_last_block > 0 {
            item.mint_last_block = last_item.mint_last_block;
          }
          if last_item.mint_completed_time.is_some() {
            item.mint_completed_time = last_item.mint_completed_time;
          }
        }
        group.insert(item.sid, item);
      }

      let tx_key = hex::encode(&event.tx.tx_hash);
      if txs.contains_key(&tx_key) {
        log::debug!("tx[{tx_key}] exist & force update");
      }
      txs.insert(tx_key, event.tx);

      address_txs.extend(event.address_txs);
      balance_txs.extend(event.balance_txs);

      for (action, item) in event.balances {
        let group = match action {
          DBAction::Create => &mut balance_creates,
          DBAction::Update => &mut balance_updates,
        };
        if group.contains_key(&item.sid) {
          log::debug!(
            "balance sid[{}] exist & force update, address[{}]-tick[{}]",
            item.sid,
            item.address,
            item.tick
          );
        }
        group.insert(item.sid, item);
      }

      if let Some((action, item)) = event.utxos {
        let group = match action {
          DBAction::Create => &mut utxo_creates,
          DBAction::Update => &mut utxo_updates,
        };
        group.insert(item.sn.clone(), item);
      }
    }
  }

  DBModelsFlattened {
    inscription_creates: ins_creates.into_values().collect(),
    inscription_updates: ins_updates.into_values().collect(),
    stats_creates: stats_creates.into_values().collect(),
    stats_updates: stats_updates.into_values().collect(),
    balance_creates: balance_creates.into_values().collect(),
    balance_updates: balance_updates.into_values().collect(),
    utxo_creates: utxo_creates.into_values().collect(),
    utxo_updates: utxo_updates.into_values().collect(),
    txs: txs.into_values().collect(),
    address_txs,
    balance_txs,
    block_status,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::devents::DBModelEvent;
  use sea_orm::prelude::Decimal;

  fn stats_model(sid: u32, first: u64, last: u64) -> entities::inscriptions_stats::Model {
    entities::inscriptions_stats::Model {
      id: 0,
      sid,
      chain: "avax".into(),
      protocol: "asc-20".into(),
      tick: "uxuy".into(),
      minted: Decimal::from(100),
      mint_completed_time: if last > 0 { Some(block_time(1_700_000_000)) } else { None },
      mint_first_block: first,
      mint_last_block: last,
      holders: 1,
      tx_cnt: 1,
      created_at: block_time(1_700_000_000),
      updated_at: block_time(1_700_000_000),
    }
  }

  fn tx_model(hash: &[u8]) -> entities::txs::Model {
    entities::txs::Model {
      id: 0,
      chain: "avax".into(),
      protocol: "asc-20".into(),
      block_height: 11,
      position_in_block: 0,
      block_time: block_time(1_700_000_000),
      tx_hash: hash.to_vec(),
      from: "0xalice".into(),
      to: "0xbob".into(),
      op: "mint".into(),
      tick: "uxuy".into(),
      amount: Decimal::from(100),
      gas: 0,
      gas_price: 0,
      created_at: block_time(1_700_000_000),
      updated_at: block_time(1_700_000_000),
    }
  }

  fn model_event(
    stats: entities::inscriptions_stats::Model,
    tx_hash: &[u8],
  ) -> DBModelEvent {
    DBModelEvent {
      tx: tx_model(tx_hash),
      inscriptions: None,
      inscription_stats: Some((DBAction::Update, stats)),
      balances: Vec::new(),
      address_txs: Vec::new(),
      balance_txs: Vec::new(),
      utxos: None,
    }
  }

  fn event(block_number: u64, items: Vec<DBModelEvent>) -> Event {
    Event {
      chain: "avax".into(),
      chain_id: 43114,
      block_number,
      block_time: 1_700_000_000 + block_number,
      block_hash: format!("0xb{block_number}"),
      items,
    }
  }

  #[test]
  fn sticky_mint_marks_survive_dedup() {
    let older = model_event(stats_model(1, 50, 0), b"\x01");
    let newer = model_event(stats_model(1, 0, 100), b"\x02");

    let flattened = build_db_update_model(vec![event(50, vec![older]), event(100, vec![newer])]);

    assert_eq!(flattened.stats_updates.len(), 1);
    let stats = &flattened.stats_updates[0];
    assert_eq!(stats.mint_first_block, 50);
    assert_eq!(stats.mint_last_block, 100);
  }

  #[test]
  fn txs_dedup_by_hash_last_write_wins() {
    let a = model_event(stats_model(1, 0, 0), b"\xaa");
    let mut b = model_event(stats_model(1, 0, 0), b"\xaa");
    b.tx.amount = Decimal::from(7);

    let flattened = build_db_update_model(vec![event(50, vec![a]), event(51, vec![b])]);

    assert_eq!(flattened.txs.len(), 1);
    assert_eq!(flattened.txs[0].amount, Decimal::from(7));
  }

  #[test]
  fn journals_are_append_only() {
    let mut a = model_event(stats_model(1, 0, 0), b"\x01");
    a.address_txs.push(entities::address_txs::Model {
      id: 0,
      event: 2,
      tx_hash: vec![1],
      address: "0xalice".into(),
      related_address: String::new(),
      amount: Decimal::from(100),
      tick: "uxuy".into(),
      protocol: "asc-20".into(),
      operate: "mint".into(),
      chain: "avax".into(),
      created_at: block_time(0),
      updated_at: block_time(0),
    });
    let mut b = model_event(stats_model(1, 0, 0), b"\x02");
    b.address_txs = a.address_txs.clone();

    let flattened = build_db_update_model(vec![event(50, vec![a, b])]);
    assert_eq!(flattened.address_txs.len(), 2);
  }

  #[test]
  fn watermark_comes_from_last_event() {
    let flattened = build_db_update_model(vec![
      event(50, vec![model_event(stats_model(1, 0, 0), b"\x01")]),
      event(51, vec![model_event(stats_model(1, 0, 0), b"\x02")]),
    ]);

    assert_eq!(flattened.block_status.block_number, 51);
    assert_eq!(flattened.block_status.block_hash, "0xb51");
  }
}
