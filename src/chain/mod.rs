use async_trait::async_trait;

mod http;

pub use http::{subscribe_blocks, HttpClient};

/// Block as delivered by the chain client, transactions in block order.
#[derive(Clone, Debug, Default)]
pub struct RpcBlock {
  pub number: u64,
  pub hash: String,
  pub time: u64,
  pub chain_id: i64,
  pub transactions: Vec<RpcTransaction>,
}

#[derive(Clone, Debug, Default)]
pub struct RpcTransaction {
  pub hash: String,
  pub from: String,
  pub to: String,
  pub input: String,
  /// Event log topics attached by the client, if any. A non-empty list
  /// passes the fast check even when the input carries no data prefix.
  pub events: Vec<String>,
  pub gas: u64,
  pub gas_price: u64,
  pub tx_index: u64,
  pub block_number: u64,
  pub chain_id: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct RpcReceipt {
  pub status: u64,
  pub effective_gas_price: u64,
  pub gas_used: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
  async fn transaction_receipt(&self, hash: &str) -> crate::Result<Option<RpcReceipt>>;
}
