use super::{Metadata, ParseError, Protocol, OPERATE_DEPLOY, OPERATE_MINT, OPERATE_TRANSFER};
use crate::cache::{Manager, TransferType};
use crate::chain::{RpcBlock, RpcTransaction};
use crate::devents::{BlockHeader, DeployEvent, MintEvent, Receive, TransferEvent, TxResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

pub const PROTOCOL_NAME: &str = "asc-20";

const MAX_TICK_LEN: usize = 18;
const MAX_DECIMALS: i8 = 18;

/// asc-20 decoder: JSON payload behind the "data:" input prefix. Holds the
/// cache handle for ledger checks (supply, balances, note ownership).
pub struct Asc20 {
  cache: Arc<Manager>,
}

#[derive(Debug, Deserialize)]
struct Payload {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  max: Option<String>,
  #[serde(default)]
  lim: Option<String>,
  #[serde(default)]
  dec: Option<String>,
  #[serde(rename = "type", default)]
  transfer_type: Option<String>,
  #[serde(default)]
  amt: Option<String>,
  #[serde(default)]
  sn: Option<String>,
}

fn parse_amount(field: &str, value: Option<&str>) -> Result<Decimal, ParseError> {
  let value = value.ok_or_else(|| ParseError::reject(format!("missing field[{field}]")))?;
  Decimal::from_str(value).map_err(|_| ParseError::reject(format!("invalid field[{field}]")))
}

impl Asc20 {
  pub fn new(cache: Arc<Manager>) -> Asc20 {
    Asc20 { cache }
  }

  fn result(block: &RpcBlock, tx: &RpcTransaction, md: Metadata) -> TxResult {
    TxResult {
      md,
      block: BlockHeader {
        number: block.number,
        hash: block.hash.clone(),
        time: block.time,
      },
      tx: tx.clone(),
      ..TxResult::default()
    }
  }

  fn parse_deploy(
    &self,
    block: &RpcBlock,
    tx: &RpcTransaction,
    md: Metadata,
    payload: &Payload,
  ) -> Result<Vec<TxResult>, ParseError> {
    if md.tick.is_empty() || md.tick.len() > MAX_TICK_LEN {
      return Err(ParseError::reject("invalid tick"));
    }
    if self.cache.inscription.get(&md.protocol, &md.tick).is_some() {
      return Err(ParseError::reject(format!("tick[{}] already deployed", md.tick)));
    }

    let max_supply = parse_amount("max", payload.max.as_deref())?;
    if max_supply <= Decimal::ZERO {
      return Err(ParseError::reject("invalid field[max]"));
    }

    let mint_limit = match payload.lim.as_deref() {
      Some(lim) => parse_amount("lim", Some(lim))?,
      None => max_supply,
    };
    if mint_limit <= Decimal::ZERO || mint_limit > max_supply {
      return Err(ParseError::reject("invalid field[lim]"));
    }

    let decimals = match payload.dec.as_deref() {
      Some(dec) => dec
        .parse::<i8>()
        .map_err(|_| ParseError::reject("invalid field[dec]"))?,
      None => MAX_DECIMALS,
    };
    if !(0..=MAX_DECIMALS).contains(&decimals) {
      return Err(ParseError::reject("invalid field[dec]"));
    }

    let transfer_type = match payload.transfer_type.as_deref() {
      None | Some("balance") => TransferType::Balance,
      Some("hash") => TransferType::Hash,
      Some(_) => return Err(ParseError::reject("invalid field[type]")),
    };

    let name = payload.name.clone().unwrap_or_else(|| md.tick.clone());
    let mut result = Self::result(block, tx, md);
    result.deploy = Some(DeployEvent {
      name,
      max_supply,
      mint_limit,
      decimals,
      transfer_type,
    });
    Ok(vec![result])
  }

  fn parse_mint(
    &self,
    block: &RpcBlock,
    tx: &RpcTransaction,
    md: Metadata,
    payload: &Payload,
  ) -> Result<Vec<TxResult>, ParseError> {
    let inscription = self
      .cache
      .inscription
      .get(&md.protocol, &md.tick)
      .ok_or_else(|| ParseError::reject(format!("tick[{}] not deployed", md.tick)))?;

    let amount = parse_amount("amt", payload.amt.as_deref())?;
    if amount <= Decimal::ZERO {
      return Err(ParseError::reject("invalid field[amt]"));
    }
    if amount > inscription.limit_per_mint {
      return Err(ParseError::reject("mint amount exceeds limit"));
    }

    let minter = tx.to.to_lowercase();
    if minter.is_empty() {
      return Err(ParseError::reject("missing mint recipient"));
    }

    let stats = self
      .cache
      .stats
      .get(&md.protocol, &md.tick)
      .unwrap_or_else(|| panic!("stats missing for tick[{}]", md.tick));
    if stats.minted >= inscription.total_supply {
      return Err(ParseError::reject("mint completed"));
    }

    // The final mint is clamped to the remaining supply.
    let amount = amount.min(inscription.total_supply - stats.minted);

    let mut result = Self::result(block, tx, md);
    result.mint = Some(MintEvent {
      minter,
      amount,
      init: false,
    });
    Ok(vec![result])
  }

  fn parse_transfer(
    &self,
    block: &RpcBlock,
    tx: &RpcTransaction,
    md: Metadata,
    payload: &Payload,
  ) -> Result<Vec<TxResult>, ParseError> {
    let inscription = self
      .cache
      .inscription
      .get(&md.protocol, &md.tick)
      .ok_or_else(|| ParseError::reject(format!("tick[{}] not deployed", md.tick)))?;

    let sender = tx.from.to_lowercase();
    let receiver = tx.to.to_lowercase();
    if receiver.is_empty() {
      return Err(ParseError::reject("missing transfer recipient"));
    }

    let (sn, amount) = match inscription.transfer_type {
      TransferType::Balance => {
        let amount = parse_amount("amt", payload.amt.as_deref())?;
        if amount <= Decimal::ZERO {
          return Err(ParseError::reject("invalid field[amt]"));
        }
        let balance = self
          .cache
          .balance
          .get(&md.protocol, &md.tick, &sender)
          .ok_or_else(|| ParseError::reject("insufficient balance"))?;
        if balance.available < amount {
          return Err(ParseError::reject("insufficient balance"));
        }
        (None, amount)
      }
      TransferType::Hash => {
        let sn = payload
          .sn
          .as_deref()
          .ok_or_else(|| ParseError::reject("missing field[sn]"))?
          .to_lowercase();
        let note = self
          .cache
          .utxo
          .get(&sn)
          .ok_or_else(|| ParseError::reject(format!("utxo[{sn}] not found")))?;
        if note.owner != sender {
          return Err(ParseError::reject(format!("utxo[{sn}] not owned by sender")));
        }
        if note.protocol != md.protocol || note.tick != md.tick {
          return Err(ParseError::reject(format!("utxo[{sn}] tick mismatch")));
        }
        (Some(sn), note.amount)
      }
    };

    let mut result = Self::result(block, tx, md);
    result.transfer = Some(TransferEvent {
      sender,
      sn,
      receives: vec![Receive {
        address: receiver,
        amount,
        init: false,
      }],
    });
    Ok(vec![result])
  }
}

#[async_trait]
impl Protocol for Asc20 {
  async fn parse(
    &self,
    block: &RpcBlock,
    tx: &RpcTransaction,
    md: Metadata,
  ) -> Result<Vec<TxResult>, ParseError> {
    let payload: Payload =
      serde_json::from_str(&md.data).map_err(|err| ParseError::reject(format!("bad payload: {err}")))?;

    match md.operate.as_str() {
      OPERATE_DEPLOY => self.parse_deploy(block, tx, md, &payload),
      OPERATE_MINT => self.parse_mint(block, tx, md, &payload),
      OPERATE_TRANSFER => self.parse_transfer(block, tx, md, &payload),
      other => Err(ParseError::reject(format!("unsupported operate[{other}]"))),
    }
  }
}
