use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A serial-numbered note for hash-transfer inscriptions. The serial number
/// is the mint tx hash; transfers reassign the owner, the note itself is
/// never destroyed.
#[derive(Clone, Debug)]
pub struct UtxoItem {
  pub protocol: String,
  pub tick: String,
  pub amount: Decimal,
  pub owner: String,
}

pub struct UtxoStore {
  items: RwLock<HashMap<String, UtxoItem>>,
}

impl UtxoStore {
  pub fn new() -> UtxoStore {
    UtxoStore {
      items: RwLock::new(HashMap::new()),
    }
  }

  pub fn add(&self, protocol: &str, tick: &str, sn: &str, owner: &str, amount: Decimal) {
    self.items.write().insert(
      sn.to_lowercase(),
      UtxoItem {
        protocol: protocol.to_lowercase(),
        tick: tick.to_lowercase(),
        amount,
        owner: owner.to_lowercase(),
      },
    );
  }

  pub fn get(&self, sn: &str) -> Option<UtxoItem> {
    self.items.read().get(&sn.to_lowercase()).cloned()
  }

  /// Reassigns the note's owner. Returns false when the serial number is
  /// unknown; the decoder rejects those before the cache is touched.
  pub fn transfer(&self, sn: &str, owner: &str) -> bool {
    let mut items = self.items.write();
    match items.get_mut(&sn.to_lowercase()) {
      Some(item) => {
        item.owner = owner.to_lowercase();
        true
      }
      None => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transfer_reassigns_owner_and_keeps_note() {
    let store = UtxoStore::new();
    store.add("asc-20", "hash1", "0xMINT1", "0xalice", Decimal::from(40));

    assert!(store.transfer("0xmint1", "0xBob"));

    let note = store.get("0xMINT1").unwrap();
    assert_eq!(note.owner, "0xbob");
    assert_eq!(note.amount, Decimal::from(40));
  }

  #[test]
  fn transfer_of_unknown_sn_is_refused() {
    let store = UtxoStore::new();
    assert!(!store.transfer("0xghost", "0xbob"));
  }
}
