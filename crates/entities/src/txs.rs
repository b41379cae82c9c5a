use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "txs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u64,

  pub chain: String,
  pub protocol: String,
  pub block_height: u64,
  pub position_in_block: u64,
  pub block_time: DateTime,
  pub tx_hash: Vec<u8>,
  pub from: String,
  pub to: String,
  pub op: String,
  pub tick: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub amount: Decimal,
  pub gas: i64,
  pub gas_price: i64,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
