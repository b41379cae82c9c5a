use ::entities::balances::{ActiveModel, Column, Entity, Model};
use sea_orm::sea_query::OnConflict;
use sea_orm::{prelude::Decimal, *};

pub struct Query;

impl Query {
  pub async fn find_by_address_tick(
    db: &DbConn,
    chain: &str,
    protocol: &str,
    tick: &str,
    address: &str,
  ) -> Result<Option<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Protocol.eq(protocol))
      .filter(Column::Tick.eq(tick))
      .filter(Column::Address.eq(address))
      .one(db)
      .await
  }

  // If ok, returns (balance models, num pages). Balances held by one address
  // across every tick, used by the address-inscriptions read contract.
  pub async fn find_by_address_in_page(
    db: &DbConn,
    chain: &str,
    address: &str,
    page: u64,
    count_per_page: u64,
  ) -> Result<(Vec<Model>, u64), DbErr> {
    let paginator = Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Address.eq(address))
      .order_by_asc(Column::Sid)
      .paginate(db, count_per_page);
    let num_pages = paginator.num_pages().await?;

    paginator.fetch_page(page - 1).await.map(|p| (p, num_pages))
  }

  // Holders of one tick, largest balance first.
  pub async fn find_holders_by_tick(
    db: &DbConn,
    chain: &str,
    protocol: &str,
    tick: &str,
    page: u64,
    count_per_page: u64,
  ) -> Result<(Vec<Model>, u64), DbErr> {
    let paginator = Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::Protocol.eq(protocol))
      .filter(Column::Tick.eq(tick))
      .filter(Column::Balance.gt(Decimal::ZERO))
      .order_by_desc(Column::Balance)
      .paginate(db, count_per_page);
    let num_pages = paginator.num_pages().await?;

    paginator.fetch_page(page - 1).await.map(|p| (p, num_pages))
  }

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
          .update_columns([Column::Available, Column::Balance, Column::UpdatedAt])
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
        available: Set(form_data.available),
        balance: Set(form_data.balance),
        updated_at: Set(form_data.updated_at),
        ..Default::default()
      };

      Entity::update_many()
        .set(data)
        .filter(Column::Sid.eq(form_data.sid))
        .exec(db)
        .await?;
    }
    Ok(())
  }
}
