use ::entities::utxos::{ActiveModel, Column, Entity, Model};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub struct Query;

impl Query {
  pub async fn find_by_sn(db: &DbConn, chain: &str, sn: &str) -> Result<Option<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Sn.eq(sn))
      .one(db)
      .await
  }

  pub async fn find_by_address(
    db: &DbConn,
    chain: &str,
    protocol: &str,
    tick: &str,
    address: &str,
  ) -> Result<Vec<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Protocol.eq(protocol))
      .filter(Column::Tick.eq(tick))
      .filter(Column::Address.eq(address))
      .all(db)
      .await
  }

  // If ok, returns (utxo models, num pages).
  pub async fn find_in_page(
    db: &DbConn,
    chain: &str,
    page: u64,
    count_per_page: u64,
  ) -> Result<(Vec<Model>, u64), DbErr> {
    let paginator = Entity::find()
      .filter(Column::Chain.eq(chain))
      .order_by_asc(Column::Id)
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
        OnConflict::column(Column::Sn)
          .update_columns([Column::Address, Column::UpdatedAt])
          .to_owned(),
      )
      .exec(db)
      .await?;
    Ok(())
  }

  pub async fn updates<C>(db: &C, form_datas: &[Model]) -> Result<(), DbErr>
  where
    C: ConnectionTrait,
  {
    for form_data in form_datas.iter() {
      let data = ActiveModel {
        address: Set(form_data.address.clone()),
        updated_at: Set(form_data.updated_at),
        ..Default::default()
      };

      Entity::update_many()
        .set(data)
        .filter(Column::Sn.eq(form_data.sn.clone()))
        .exec(db)
        .await?;
    }
    Ok(())
  }
}
