use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "inscriptions_stats")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u32,

  pub sid: u32,
  pub chain: String,
  pub protocol: String,
  pub tick: String,
  #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
  pub minted: Decimal,
  #[sea_orm(nullable)]
  pub mint_completed_time: Option<DateTime>,
  pub mint_first_block: u64,
  pub mint_last_block: u64,
  pub holders: u64,
  pub tx_cnt: u64,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
