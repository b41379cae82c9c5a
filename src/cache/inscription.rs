use super::tick_key;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TransferType {
  #[default]
  Balance,
  Hash,
}

impl TransferType {
  pub fn code(self) -> i8 {
    match self {
      TransferType::Balance => 0,
      TransferType::Hash => 1,
    }
  }

  pub fn from_code(code: i8) -> TransferType {
    match code {
      1 => TransferType::Hash,
      _ => TransferType::Balance,
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct Inscription {
  pub sid: u32,
  pub name: String,
  pub limit_per_mint: Decimal,
  pub total_supply: Decimal,
  pub deploy_by: String,
  pub deploy_hash: String,
  pub deploy_time: u64,
  pub transfer_type: TransferType,
  pub decimals: i8,
}

pub struct InscriptionStore {
  items: RwLock<HashMap<String, Inscription>>,
  sid: AtomicU32,
}

impl InscriptionStore {
  pub fn new() -> InscriptionStore {
    InscriptionStore {
      items: RwLock::new(HashMap::new()),
      sid: AtomicU32::new(0),
    }
  }

  /// Assigns the next sid and stores the inscription. Creating the same
  /// identity twice hands back the first sid.
  pub fn create(&self, protocol: &str, tick: &str, mut data: Inscription) -> u32 {
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

  pub fn get(&self, protocol: &str, tick: &str) -> Option<Inscription> {
    self.items.read().get(&tick_key(protocol, tick)).cloned()
  }

  /// Recovery path: load a persisted inscription without assigning a sid.
  pub fn put(&self, protocol: &str, tick: &str, data: Inscription) {
    self.seed_sid(data.sid);
    self.items.write().insert(tick_key(protocol, tick), data);
  }

  pub fn seed_sid(&self, sid: u32) {
    self.sid.fetch_max(sid, Ordering::SeqCst);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn create_assigns_monotonic_sids() {
    let store = InscriptionStore::new();
    let a = store.create("asc-20", "UXUY", Inscription::default());
    let b = store.create("asc-20", "other", Inscription::default());
    assert_eq!(a, 1);
    assert_eq!(b, 2);
  }

  #[test]
  fn create_is_idempotent_per_identity() {
    let store = InscriptionStore::new();
    let first = store.create("asc-20", "UXUY", Inscription::default());
    let again = store.create("ASC-20", "uxuy", Inscription::default());
    assert_eq!(first, again);
  }

  #[test]
  fn keys_are_case_insensitive() {
    let store = InscriptionStore::new();
    store.create("asc-20", "UXUY", Inscription::default());
    assert!(store.get("ASC-20", "uxuy").is_some());
  }

  #[test]
  fn seeded_sid_continues_after_recovery() {
    let store = InscriptionStore::new();
    store.put(
      "asc-20",
      "old",
      Inscription {
        sid: 7,
        ..Inscription::default()
      },
    );
    let next = store.create("asc-20", "new", Inscription::default());
    assert_eq!(next, 8);
  }
}
