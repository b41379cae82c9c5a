use ::entities::inscriptions::{ActiveModel, Column, Entity, Model};
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

  pub async fn find_by_deploy_by(
    db: &DbConn,
    chain: &str,
    deploy_by: &str,
  ) -> Result<Vec<Model>, DbErr> {
    Entity::find()
      .filter(Column::Chain.eq(chain))
      .filter(Column::DeployBy.eq(deploy_by))
      .all(db)
      .await
  }

  // If ok, returns (inscription models, num pages).
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
            Column::Name,
            Column::LimitPerMint,
            Column::TotalSupply,
            Column::DeployBy,
            Column::DeployHash,
            Column::DeployTime,
            Column::TransferType,
            Column::Decimals,
            Column::UpdatedAt,
          ])
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
        name: Set(form_data.name.clone()),
        limit_per_mint: Set(form_data.limit_per_mint),
        total_supply: Set(form_data.total_supply),
        transfer_type: Set(form_data.transfer_type),
        decimals: Set(form_data.decimals),
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
