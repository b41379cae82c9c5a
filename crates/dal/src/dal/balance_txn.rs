use ::entities::balance_txn::{Column, Entity, Model};
use sea_orm::*;

pub struct Query;

impl Query {
  // If ok, returns (balance journal models, num pages).
  pub async fn find_by_address_tick_in_page(
    db: &DbConn,
    chain: &str,
    protocol: &str,
    tick: &str,
    address: &str,
    page: u64,
    count_per_page: u64,
  ) -> Result<(Vec<Model>, u64), DbErr> {
    let paginator = Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Protocol.eq(protocol))
      .filter(Column::Tick.eq(tick))
      .filter(Column::Address.eq(address))
      .order_by_desc(Column::Id)
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

    Entity::insert_many(batch).exec(db).await?;
    Ok(())
  }
}
