use ::entities::txs::{Column, Entity, Model};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub struct Query;

impl Query {
  pub async fn find_by_hash(db: &DbConn, chain: &str, tx_hash: &[u8]) -> Result<Option<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::TxHash.eq(tx_hash))
      .one(db)
      .await
  }

  pub async fn find_by_block(db: &DbConn, chain: &str, block_height: u64) -> Result<Vec<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::BlockHeight.eq(block_height))
      .order_by_asc(Column::PositionInBlock)
      .all(db)
      .await
  }
}

pub struct Mutation;

impl Mutation {
  pub async fn creates<C>(db: &C, form_datas: &[Model]) -> Result<(), DbErr>
  where
    C: ConnectionTrait,
  {
    if form_datas.is_empty() {
      return Ok(());
    }

    let mut batch = vec![];
    for form_data in form_datas.iter() {
      let mut data = form_data.clone().into_active_model();
      data.id = NotSet;
      batch.push(data);
    }

    Entity::insert_many(batch)
      .on_conflict(
        OnConflict::column(Column::TxHash)
          .update_columns([Column::Gas, Column::GasPrice, Column::UpdatedAt])
          .to_owned(),
      )
      .exec(db)
      .await?;
    Ok(())
  }
}
