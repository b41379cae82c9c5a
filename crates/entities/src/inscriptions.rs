use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "inscriptions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u32,

  pub sid: u32,
  pub chain: String,
  pub protocol: String,
  pub tick: String,
  pub name: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub limit_per_mint: Decimal,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub total_supply: Decimal,
  pub deploy_by: String,
  pub deploy_hash: String,
  pub deploy_time: DateTime,
  pub transfer_type: i8,
  pub decimals: i8,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
