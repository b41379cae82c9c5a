use super::tick_key;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Debug, Default)]
pub struct InscriptionStats {
  pub sid: u32,
  pub minted: Decimal,
  pub holders: u64,
  pub tx_cnt: u64,
}

pub struct StatsStore {
  items: RwLock<HashMap<String, InscriptionStats>>,
  sid: AtomicU32,
}

impl StatsStore {
  pub fn new() -> StatsStore {
    StatsStore {
      items: RwLock::new(HashMap::new()),
      sid: AtomicU32::new(0),
    }
  }

  pub fn create(&self, protocol: &str, tick: &str, mut data: InscriptionStats) -> u32 {
    let key = tick_key(protocol, tick);
    let mut items = self.items.write();
    if let Some(existing) = items.get(&key) {
      return existing.sid;
    }
    let sid = self.sid.fetch_add(1, Ordering::SeqCst) + 1;
    data.sid = sid;
    items.insert(key, data);
    sid
  }

  pub fn get(&self, protocol: &str, tick: &str) -> Option<InscriptionStats> {
    self.items.read().get(&tick_key(protocol, tick)).cloned()
  }

  pub fn put(&self, protocol: &str, tick: &str, data: InscriptionStats) {
    self.seed_sid(data.sid);
    self.items.write().insert(tick_key(protocol, tick), data);
  }

  pub fn seed_sid(&self, sid: u32) {
    self.sid.fetch_max(sid, Ordering::SeqCst);
  }

  /// Returns the minted total after the add. A missing entry for a tick the
  /// pipeline already resolved is a cache inconsistency.
  pub fn add_minted(&self, protocol: &str, tick: &str, amount: Decimal) -> Decimal {
    let key = tick_key(protocol, tick);
    let mut items = self.items.write();
    let stats = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("stats missing for tick[{key}]"));
    stats.minted += amount;
    stats.minted
  }

  pub fn add_tx_count(&self, protocol: &str, tick: &str, count: u64) {
    let key = tick_key(protocol, tick);
    let mut items = self.items.write();
    let stats = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("stats missing for tick[{key}]"));
    stats.tx_cnt += count;
  }

  pub fn inc_holders(&self, protocol: &str, tick: &str) {
    let key = tick_key(protocol, tick);
    let mut items = self.items.write();
    let stats = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("stats missing for tick[{key}]"));
    stats.holders += 1;
  }

  pub fn dec_holders(&self, protocol: &str, tick: &str) {
    let key = tick_key(protocol, tick);
    let mut items = self.items.write();
    let stats = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("stats missing for tick[{key}]"));
    stats.holders = stats.holders.saturating_sub(1);
  }
}
