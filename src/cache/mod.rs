mod balance;
mod inscription;
mod recover;
mod stats;
mod utxo;

pub use balance::{Balance, BalanceStore};
pub use inscription::{Inscription, InscriptionStore, TransferType};
pub use recover::recover;
pub use stats::{InscriptionStats, StatsStore};
pub use utxo::{UtxoItem, UtxoStore};

/// Authoritative in-memory ledger for the block pipeline. One writer (the
/// pipeline task); concurrent readers observe per-key snapshots, torn reads
/// across keys are acceptable.
pub struct Manager {
  pub inscription: InscriptionStore,
  pub stats: StatsStore,
  pub balance: BalanceStore,
  pub utxo: UtxoStore,
}

impl Manager {
  pub fn new() -> Manager {
    Manager {
      inscription: InscriptionStore::new(),
      stats: StatsStore::new(),
      balance: BalanceStore::new(),
      utxo: UtxoStore::new(),
    }
  }
}

impl Default for Manager {
  fn default() -> Manager {
    Manager::new()
  }
}

// Tick and protocol comparisons are case-insensitive; every sub-store key
// goes through here.
pub(crate) fn tick_key(protocol: &str, tick: &str) -> String {
  format!("{}-{}", protocol.to_lowercase(), tick.to_lowercase())
}

pub(crate) fn balance_key(protocol: &str, tick: &str, address: &str) -> String {
  format!(
    "{}-{}-{}",
    protocol.to_lowercase(),
    tick.to_lowercase(),
    address.to_lowercase()
  )
}
