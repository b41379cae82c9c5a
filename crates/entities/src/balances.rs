use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "balances")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u64,

  pub sid: u64,
  pub chain: String,
  pub protocol: String,
  pub address: String,
  pub tick: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub available: Decimal,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub balance: Decimal,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
