use super::{ChainClient, RpcBlock, RpcReceipt, RpcTransaction};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Plain HTTP JSON-RPC client, enough chain surface for the indexer:
/// latest height, block with bodies, transaction receipt.
pub struct HttpClient {
  client: reqwest::Client,
  endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
  number: String,
  hash: String,
  timestamp: String,
  #[serde(default)]
  transactions: Vec<RawTransaction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
  hash: String,
  from: String,
  #[serde(default)]
  to: Option<String>,
  input: String,
  #[serde(default)]
  gas: Option<String>,
  #[serde(default)]
  gas_price: Option<String>,
  #[serde(default)]
  transaction_index: Option<String>,
  #[serde(default)]
  chain_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  effective_gas_price: Option<String>,
  #[serde(default)]
  gas_used: Option<String>,
}

fn hex_to_u64(data: &str) -> crate::Result<u64> {
  let data = data.trim_start_matches("0x");
  if data.is_empty() {
    return Ok(0);
  }
  Ok(u64::from_str_radix(data, 16)?)
}

impl HttpClient {
  pub fn new(endpoint: &str) -> crate::Result<HttpClient> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(HttpClient {
      client,
      endpoint: endpoint.to_string(),
    })
  }

  async fn call(&self, method: &str, params: Value) -> crate::Result<Value> {
    let body = json!({
      "jsonrpc": "2.0",
      "id": 1,
      "method": method,
      "params": params,
    });

    let resp: Value = self
      .client
      .post(&self.endpoint)
      .json(&body)
      .send()
      .await?
      .json()
      .await?;

    if let Some(err) = resp.get("error") {
      if !err.is_null() {
        bail!("rpc {method} failed: {err}");
      }
    }
    resp
      .get("result")
      .cloned()
      .ok_or_else(|| anyhow!("rpc {method} returned no result"))
  }

  pub async fn block_number(&self) -> crate::Result<u64> {
    let result = self.call("eth_blockNumber", json!([])).await?;
    hex_to_u64(result.as_str().unwrap_or_default())
  }

  pub async fn block_by_number(&self, number: u64, chain_id: i64) -> crate::Result<RpcBlock> {
    let result = self
      .call(
        "eth_getBlockByNumber",
        json!([format!("0x{number:x}"), true]),
      )
      .await?;
    if result.is_null() {
      bail!("block {number} not found");
    }

    let raw: RawBlock = serde_json::from_value(result)?;
    let block_number = hex_to_u64(&raw.number)?;
    let mut transactions = Vec::with_capacity(raw.transactions.len());
    for tx in raw.transactions {
      transactions.push(RpcTransaction {
        hash: tx.hash,
        from: tx.from,
        to: tx.to.unwrap_or_default(),
        input: tx.input,
        events: Vec::new(),
        gas: hex_to_u64(tx.gas.as_deref().unwrap_or_default())?,
        gas_price: hex_to_u64(tx.gas_price.as_deref().unwrap_or_default())?,
        tx_index: hex_to_u64(tx.transaction_index.as_deref().unwrap_or_default())?,
        block_number,
        chain_id: match tx.chain_id.as_deref() {
          Some(id) => Some(hex_to_u64(id)? as i64),
          None => None,
        },
      });
    }

    Ok(RpcBlock {
      number: block_number,
      hash: raw.hash,
      time: hex_to_u64(&raw.timestamp)?,
      chain_id,
      transactions,
    })
  }
}

#[async_trait]
impl ChainClient for HttpClient {
  async fn transaction_receipt(&self, hash: &str) -> crate::Result<Option<RpcReceipt>> {
    let result = self.call("eth_getTransactionReceipt", json!([hash])).await?;
    if result.is_null() {
      return Ok(None);
    }

    let raw: RawReceipt = serde_json::from_value(result)?;
    Ok(Some(RpcReceipt {
      status: hex_to_u64(raw.status.as_deref().unwrap_or_default())?,
      effective_gas_price: hex_to_u64(raw.effective_gas_price.as_deref().unwrap_or_default())?,
      gas_used: hex_to_u64(raw.gas_used.as_deref().unwrap_or_default())?,
    }))
  }
}

/// Polls the chain head and feeds blocks, in order, onto the indexer's
/// block channel until cancelled.
pub async fn subscribe_blocks(
  client: std::sync::Arc<HttpClient>,
  sender: mpsc::Sender<RpcBlock>,
  start_block: u64,
  interval: Duration,
  chain_id: i64,
  shutdown: CancellationToken,
) {
  let mut next = start_block;
  loop {
    if shutdown.is_cancelled() {
      break;
    }

    let latest = match client.block_number().await {
      Ok(latest) => latest,
      Err(err) => {
        log::error!("fetch chain head err:{err}");
        tokio::time::sleep(interval).await;
        continue;
      }
    };

    while next <= latest {
      if shutdown.is_cancelled() {
        return;
      }
      match client.block_by_number(next, chain_id).await {
        Ok(block) => {
          if sender.send(block).await.is_err() {
            return;
          }
          next += 1;
        }
        Err(err) => {
          log::error!("fetch block[{next}] err:{err}");
          tokio::time::sleep(Duration::from_millis(100)).await;
        }
      }
    }

    tokio::select! {
      _ = tokio::time::sleep(interval) => {}
      _ = shutdown.cancelled() => break,
    }
  }
  log::info!("block subscriber quit");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hex_quantities() {
    assert_eq!(hex_to_u64("0x0").unwrap(), 0);
    assert_eq!(hex_to_u64("0x1b4").unwrap(), 436);
    assert_eq!(hex_to_u64("").unwrap(), 0);
    assert!(hex_to_u64("0xzz").is_err());
  }
}
