use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "utxos")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u64,

  pub chain: String,
  pub protocol: String,
  pub tick: String,
  pub sn: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub amount: Decimal,
  pub address: String,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
