use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "address_txs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u64,

  pub event: i8,
  pub tx_hash: Vec<u8>,
  pub address: String,
  pub related_address: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub amount: Decimal,
  pub tick: String,
  pub protocol: String,
  pub operate: String,
  pub chain: String,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
