use crate::cache::TransferType;
use crate::chain::RpcTransaction;
use crate::protocol::{
  Metadata, OPERATE_DELIST, OPERATE_DEPLOY, OPERATE_EXCHANGE, OPERATE_LIST, OPERATE_MINT,
  OPERATE_TRANSFER,
};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTime;

mod builder;
mod flatten;
mod flusher;

pub use builder::TxResultHandler;
pub use flatten::{build_db_update_model, DBModelsFlattened};
pub use flusher::{DEvents, Flusher};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DBAction {
  Create,
  Update,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxEvent {
  Deploy = 1,
  Mint = 2,
  Transfer = 3,
  List = 4,
  Delist = 5,
  Exchange = 6,
}

impl TxEvent {
  pub fn code(self) -> i8 {
    self as i8
  }

  pub fn from_operate(operate: &str) -> Option<TxEvent> {
    match operate {
      OPERATE_DEPLOY => Some(TxEvent::Deploy),
      OPERATE_MINT => Some(TxEvent::Mint),
      OPERATE_TRANSFER => Some(TxEvent::Transfer),
      OPERATE_LIST => Some(TxEvent::List),
      OPERATE_DELIST => Some(TxEvent::Delist),
      OPERATE_EXCHANGE => Some(TxEvent::Exchange),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct BlockHeader {
  pub number: u64,
  pub hash: String,
  pub time: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DeployEvent {
  pub name: String,
  pub max_supply: Decimal,
  pub mint_limit: Decimal,
  pub decimals: i8,
  pub transfer_type: TransferType,
}

#[derive(Clone, Debug, Default)]
pub struct MintEvent {
  pub minter: String,
  pub amount: Decimal,
  /// Set by the cache update when the mint created the minter's balance.
  pub init: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Receive {
  pub address: String,
  pub amount: Decimal,
  pub init: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TransferEvent {
  pub sender: String,
  /// Serial number of the consumed note, hash-transfer inscriptions only.
  pub sn: Option<String>,
  pub receives: Vec<Receive>,
}

/// One parsed ledger effect. At most one of deploy/mint/transfer is set.
#[derive(Clone, Debug, Default)]
pub struct TxResult {
  pub md: Metadata,
  pub block: BlockHeader,
  pub tx: RpcTransaction,
  pub deploy: Option<DeployEvent>,
  pub mint: Option<MintEvent>,
  pub transfer: Option<TransferEvent>,
}

/// Store-shaped mutations for one parsed transaction.
#[derive(Clone, Debug)]
pub struct DBModelEvent {
  pub tx: entities::txs::Model,
  pub inscriptions: Option<(DBAction, entities::inscriptions::Model)>,
  pub inscription_stats: Option<(DBAction, entities::inscriptions_stats::Model)>,
  pub balances: Vec<(DBAction, entities::balances::Model)>,
  pub address_txs: Vec<entities::address_txs::Model>,
  pub balance_txs: Vec<entities::balance_txn::Model>,
  pub utxos: Option<(DBAction, entities::utxos::Model)>,
}

/// The unit queued to the flush coordinator: every model event of one block.
#[derive(Clone, Debug)]
pub struct Event {
  pub chain: String,
  pub chain_id: i64,
  pub block_number: u64,
  pub block_time: u64,
  pub block_hash: String,
  pub items: Vec<DBModelEvent>,
}

pub(crate) fn block_time(secs: u64) -> DateTime {
  chrono::DateTime::from_timestamp(secs as i64, 0)
    .map(|t| t.naive_utc())
    .unwrap_or_default()
}

pub(crate) fn hash_bytes(hash: &str) -> Vec<u8> {
  hex::decode(hash.trim_start_matches("0x")).unwrap_or_default()
}
