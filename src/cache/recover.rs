use super::{Balance, Inscription, InscriptionStats, Manager, TransferType};
use sea_orm::DbConn;

const RECOVER_PAGE_SIZE: u64 = 1000;

/// Rebuilds the state cache from the durable store and re-seeds the sid
/// counters, so sids keep agreeing with persisted rows across restarts.
pub async fn recover(db: &DbConn, chain: &str) -> crate::Result<Manager> {
  let cache = Manager::new();

  let mut page = 1;
  loop {
    let (models, pages) =
      dal::dal::inscriptions::Query::find_in_page(db, chain, page, RECOVER_PAGE_SIZE).await?;
    for m in models {
      cache.inscription.put(
        &m.protocol,
        &m.tick,
        Inscription {
          sid: m.sid,
          name: m.name,
          limit_per_mint: m.limit_per_mint,
          total_supply: m.total_supply,
          deploy_by: m.deploy_by,
          deploy_hash: m.deploy_hash,
          deploy_time: m.deploy_time.and_utc().timestamp() as u64,
          transfer_type: TransferType::from_code(m.transfer_type),
          decimals: m.decimals,
        },
      );
    }
    if page >= pages {
      break;
    }
    page += 1;
  }

  let mut page = 1;
  loop {
    let (models, pages) =
      dal::dal::inscriptions_stats::Query::find_in_page(db, chain, page, RECOVER_PAGE_SIZE).await?;
    for m in models {
      cache.stats.put(
        &m.protocol,
        &m.tick,
        InscriptionStats {
          sid: m.sid,
          minted: m.minted,
          holders: m.holders,
          tx_cnt: m.tx_cnt,
        },
      );
    }
    if page >= pages {
      break;
    }
    page += 1;
  }

  let mut page = 1;
  loop {
    let (models, pages) =
      dal::dal::balances::Query::find_in_page(db, chain, page, RECOVER_PAGE_SIZE).await?;
    for m in models {
      cache.balance.put(
        &m.protocol,
        &m.tick,
        &m.address,
        Balance {
          sid: m.sid,
          available: m.available,
          overall: m.balance,
        },
      );
    }
    if page >= pages {
      break;
    }
    page += 1;
  }

  let mut page = 1;
  loop {
    let (models, pages) =
      dal::dal::utxos::Query::find_in_page(db, chain, page, RECOVER_PAGE_SIZE).await?;
    for m in models {
      cache
        .utxo
        .add(&m.protocol, &m.tick, &m.sn, &m.address, m.amount);
    }
    if page >= pages {
      break;
    }
    page += 1;
  }

  log::info!("cache recovered for chain[{chain}]");
  Ok(cache)
}
