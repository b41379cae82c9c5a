use ::entities::block_status::{Column, Entity, Model};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub struct Query;

impl Query {
  pub async fn find_last_block(db: &DbConn, chain: &str) -> Result<Option<Model>, DbErr> {
    Entity::find().filter(Column::Chain.eq(chain)).one(db).await
  }
}

pub struct Mutation;

impl Mutation {
  // One watermark row per chain; advancing it is the flush's durability
  // commitment, so it always rides in the same transaction as the batches.
  pub async fn upsert<C>(db: &C, form_data: &Model) -> Result<(), DbErr>
  where
    C: ConnectionTrait,
  {
    let mut data = form_data.clone().into_active_model();
    data.id = NotSet;

    Entity::insert(data)
      .on_conflict(
        OnConflict::column(Column::Chain)
          .update_columns([
            Column::ChainId,
            Column::BlockNumber,
            Column::BlockHash,
            Column::BlockTime,
            Column::UpdatedAt,
          ])
          .to_owned(),
      )
      .exec(db)
      .await?;
    Ok(())
  }
}
