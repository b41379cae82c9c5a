use crate::chain::{RpcBlock, RpcTransaction};
use crate::devents::TxResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod asc20;

pub const OPERATE_DEPLOY: &str = "deploy";
pub const OPERATE_MINT: &str = "mint";
pub const OPERATE_TRANSFER: &str = "transfer";
pub const OPERATE_LIST: &str = "list";
pub const OPERATE_DELIST: &str = "delist";
pub const OPERATE_EXCHANGE: &str = "exchange";

/// Pre-parsed envelope of an inscription transaction. Protocol and tick are
/// canonical (lowercased) from here on.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
  pub chain: String,
  pub protocol: String,
  pub tick: String,
  pub operate: String,
  /// Raw JSON payload after the data prefix, handed to the decoder.
  pub data: String,
}

#[derive(Debug, Error)]
pub enum ParseError {
  /// Node outage or corruption. The whole block is retried.
  #[error("internal error: {0}")]
  Internal(#[source] anyhow::Error),
  /// Malformed or rule-breaking tx. Logged, skipped, the block continues.
  #[error("{0}")]
  Reject(String),
}

impl ParseError {
  pub fn internal(err: impl Into<anyhow::Error>) -> ParseError {
    ParseError::Internal(err.into())
  }

  pub fn reject(msg: impl Into<String>) -> ParseError {
    ParseError::Reject(msg.into())
  }

  pub fn is_internal(&self) -> bool {
    matches!(self, ParseError::Internal(_))
  }
}

#[async_trait]
pub trait Protocol: Send + Sync {
  /// Parses one enriched transaction into zero or more ledger effects.
  async fn parse(
    &self,
    block: &RpcBlock,
    tx: &RpcTransaction,
    md: Metadata,
  ) -> Result<Vec<TxResult>, ParseError>;
}

#[derive(Deserialize)]
struct Envelope {
  #[serde(default)]
  p: String,
  #[serde(default)]
  op: String,
  #[serde(default)]
  tick: String,
}

/// Maps a raw transaction to the decoder responsible for it.
pub struct Registry {
  chain: String,
  data_prefix: String,
  decoders: HashMap<String, Arc<dyn Protocol>>,
}

impl Registry {
  pub fn new(chain: &str, data_prefix: &str) -> Registry {
    Registry {
      chain: chain.to_string(),
      data_prefix: data_prefix.to_lowercase(),
      decoders: HashMap::new(),
    }
  }

  pub fn register(&mut self, protocol: &str, decoder: Arc<dyn Protocol>) {
    self.decoders.insert(protocol.to_lowercase(), decoder);
  }

  /// Resolves the decoder for a transaction along with its parsed metadata,
  /// or None when the input is not a recognized inscription.
  pub fn resolve(&self, tx: &RpcTransaction) -> Option<(Arc<dyn Protocol>, Metadata)> {
    let (envelope, payload) = self.decode_payload(&tx.input)?;
    let decoder = self.decoders.get(&envelope.p)?.clone();
    Some((
      decoder,
      Metadata {
        chain: self.chain.clone(),
        protocol: envelope.p,
        tick: envelope.tick,
        operate: envelope.op,
        data: payload,
      },
    ))
  }

  /// Operate preview for the read side; never called by the pipeline.
  pub fn operate_by_tx_input(&self, input: &str) -> Option<String> {
    let (envelope, _) = self.decode_payload(input)?;
    if envelope.op.is_empty() {
      None
    } else {
      Some(envelope.op)
    }
  }

  // Input shape: "0x" + hex("data:...,{json}").
  fn decode_payload(&self, input: &str) -> Option<(Envelope, String)> {
    let input = input.to_lowercase();
    if !input.starts_with("0x") || !input.starts_with(&self.data_prefix) {
      return None;
    }

    let bytes = hex::decode(input.trim_start_matches("0x")).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let payload = &text[text.find('{')?..];

    let mut envelope: Envelope = serde_json::from_str(payload).ok()?;
    envelope.p = envelope.p.to_lowercase();
    envelope.op = envelope.op.to_lowercase();
    envelope.tick = envelope.tick.to_lowercase();
    if envelope.p.is_empty() {
      return None;
    }
    Some((envelope, payload.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hex_input(text: &str) -> String {
    format!("0x{}", hex::encode(text))
  }

  fn registry() -> Registry {
    // "data:" => 0x646174613a
    Registry::new("avax", "0x646174613a")
  }

  #[test]
  fn decodes_envelope_behind_data_prefix() {
    let registry = registry();
    let input = hex_input(r#"data:,{"p":"ASC-20","op":"MINT","tick":"UXUY","amt":"100"}"#);
    let (envelope, payload) = registry.decode_payload(&input).unwrap();
    assert_eq!(envelope.p, "asc-20");
    assert_eq!(envelope.op, "mint");
    assert_eq!(envelope.tick, "uxuy");
    assert!(payload.starts_with('{'));
  }

  #[test]
  fn rejects_foreign_prefix() {
    let registry = registry();
    let input = hex_input(r#"text:,{"p":"asc-20","op":"mint"}"#);
    assert!(registry.decode_payload(&input).is_none());
    assert!(registry.decode_payload("not hex at all").is_none());
  }

  #[test]
  fn operate_preview() {
    let registry = registry();
    let input = hex_input(r#"data:,{"p":"asc-20","op":"deploy","tick":"uxuy"}"#);
    assert_eq!(registry.operate_by_tx_input(&input).as_deref(), Some("deploy"));
    assert_eq!(registry.operate_by_tx_input("0x00"), None);
  }
}
