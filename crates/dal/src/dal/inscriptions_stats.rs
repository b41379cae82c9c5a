use ::entities::inscriptions_stats::{ActiveModel, Column, Entity, Model};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub struct Query;

impl Query {
  pub async fn find_by_tick(
    db: &DbConn,
    chain: &str,
    protocol: &str,
    tick: &str,
  ) -> Result<Option<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Protocol.eq(protocol))
      .filter(Column::Tick.eq(tick))
      .one(db)
      .await
  }

  // If ok, returns (stats models, num pages).
  pub async fn find_in_page(
    db: &DbConn,
    chain: &str,
    page: u64,
    count_per_page: u64,
  ) -> Result<(Vec<Model>, u64), DbErr> {
    let paginator = Entity::find()
      .filter(Column::Chain.eq(chain))
      .order_by_asc(Column::Sid)
      .paginate(db, count_per_page);
    let num_pages = paginator.num_pages().await?;

    paginator.fetch_page(page - 1).await.map(|p| (p, num_pages))
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
        OnConflict::column(Column::Sid)
          .update_columns([
            Column::Minted,
            Column::MintCompletedTime,
            Column::MintFirstBlock,
            Column::MintLastBlock,
            Column::Holders,
            Column::TxCnt,
            Column::UpdatedAt,
          ])
          .to_owned(),
      )
      .exec(db)
      .await?;
    Ok(())
  }

  // Mint lifecycle columns are written only when set, so an update from a
  // later flush window cannot zero out the sticky first/last mint marks.
  pub async fn updates<C>(db: &C, form_datas: &[Model]) -> Result<(), DbErr>
  where
    C: ConnectionTrait,
  {
    for form_data in form_datas.iter() {
      let mut data = ActiveModel {
        minted: Set(form_data.minted),
        holders: Set(form_data.holders),
        tx_cnt: Set(form_data.tx_cnt),
        updated_at: Set(form_data.updated_at),
        ..Default::default()
      };
      if form_data.mint_first_block > 0 {
        data.mint_first_block = Set(form_data.mint_first_block);
      }
      if form_data.mint_last_block > 0 {
        data.mint_last_block = Set(form_data.mint_last_block);
      }
      if form_data.mint_completed_time.is_some() {
        data.mint_completed_time = Set(form_data.mint_completed_time);
      }

      Entity::update_many()
        .set(data)
        .filter(Column::Sid.eq(form_data.sid))
        .exec(db)
        .await?;
    }
    Ok(())
  }
}
