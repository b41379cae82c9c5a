use super::balance_key;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Debug, Default)]
pub struct Balance {
  pub sid: u64,
  pub available: Decimal,
  pub overall: Decimal,
}

pub struct BalanceStore {
  items: RwLock<HashMap<String, Balance>>,
  sid: AtomicU64,
}

impl BalanceStore {
  pub fn new() -> BalanceStore {
    BalanceStore {
      items: RwLock::new(HashMap::new()),
      sid: AtomicU64::new(0),
    }
  }

  pub fn get(&self, protocol: &str, tick: &str, address: &str) -> Option<Balance> {
    self
      .items
      .read()
      .get(&balance_key(protocol, tick, address))
      .cloned()
  }

  /// Creates a zeroed balance if absent. Returns the sid and whether this
  /// call created the entry.
  pub fn create(&self, protocol: &str, tick: &str, address: &str) -> (u64, bool) {
    let key = balance_key(protocol, tick, address);
    let mut items = self.items.write();
    if let Some(existing) = items.get(&key) {
      return (existing.sid, false);
    }
    let sid = self.sid.fetch_add(1, Ordering::SeqCst) + 1;
    items.insert(
      key,
      Balance {
        sid,
        available: Decimal::ZERO,
        overall: Decimal::ZERO,
      },
    );
    (sid, true)
  }

  pub fn put(&self, protocol: &str, tick: &str, address: &str, data: Balance) {
    self.seed_sid(data.sid);
    self
      .items
      .write()
      .insert(balance_key(protocol, tick, address), data);
  }

  pub fn seed_sid(&self, sid: u64) {
    self.sid.fetch_max(sid, Ordering::SeqCst);
  }

  /// Adds to both available and overall, returning the post-mutation state.
  pub fn credit(&self, protocol: &str, tick: &str, address: &str, amount: Decimal) -> Balance {
    let key = balance_key(protocol, tick, address);
    let mut items = self.items.write();
    let balance = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("balance missing for [{key}]"));
    balance.available += amount;
    balance.overall += amount;
    balance.clone()
  }

  /// Subtracts from both available and overall. The decoder has already
  /// checked funds; going negative here is a cache inconsistency.
  pub fn debit(&self, protocol: &str, tick: &str, address: &str, amount: Decimal) -> Balance {
    let key = balance_key(protocol, tick, address);
    let mut items = self.items.write();
    let balance = items
      .get_mut(&key)
      .unwrap_or_else(|| panic!("balance missing for [{key}]"));
    if balance.available < amount || balance.overall < amount {
      panic!(
        "balance underflow for [{key}]: available[{}] overall[{}] debit[{amount}]",
        balance.available, balance.overall
      );
    }
    balance.available -= amount;
    balance.overall -= amount;
    balance.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_balance_is_zeroed() {
    let store = BalanceStore::new();
    let (sid, created) = store.create("asc-20", "uxuy", "0xAlice");
    assert_eq!(sid, 1);
    assert!(created);

    let balance = store.get("asc-20", "uxuy", "0xalice").unwrap();
    assert_eq!(balance.available, Decimal::ZERO);
    assert_eq!(balance.overall, Decimal::ZERO);
  }

  #[test]
  fn create_twice_returns_first_sid() {
    let store = BalanceStore::new();
    let (sid, _) = store.create("asc-20", "uxuy", "0xalice");
    let (again, created) = store.create("asc-20", "uxuy", "0xALICE");
    assert_eq!(sid, again);
    assert!(!created);
  }

  #[test]
  fn credit_then_debit_round_trips() {
    let store = BalanceStore::new();
    store.create("asc-20", "uxuy", "0xalice");
    store.credit("asc-20", "uxuy", "0xalice", Decimal::from(100));
    let after = store.debit("asc-20", "uxuy", "0xalice", Decimal::from(40));
    assert_eq!(after.available, Decimal::from(60));
    assert_eq!(after.overall, Decimal::from(60));
  }

  #[test]
  #[should_panic(expected = "balance underflow")]
  fn debit_past_zero_panics() {
    let store = BalanceStore::new();
    store.create("asc-20", "uxuy", "0xalice");
    store.credit("asc-20", "uxuy", "0xalice", Decimal::from(10));
    store.debit("asc-20", "uxuy", "0xalice", Decimal::from(11));
  }
}
