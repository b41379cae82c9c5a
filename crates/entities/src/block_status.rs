use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "block_status")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: u32,

  pub chain: String,
  pub chain_id: i64,
  pub block_number: u64,
  pub block_hash: String,
  pub block_time: DateTime,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
