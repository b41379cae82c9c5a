use super::{build_db_update_model, DBModelsFlattened, Event};
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Write handle for the pipeline. Enqueueing blocks when the ingress queue
/// is full; events are never dropped.
#[derive(Clone)]
pub struct DEvents {
  sender: mpsc::Sender<Event>,
}

impl DEvents {
  pub fn channel(capacity: usize) -> (DEvents, mpsc::Receiver<Event>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (DEvents { sender }, receiver)
  }

  pub async fn write_db_async(&self, event: Event) -> crate::Result {
    self
      .sender
      .send(event)
      .await
      .map_err(|_| anyhow::anyhow!("flusher is gone"))
  }
}

/// Drains the block-event queue, flattens each window into one batch and
/// commits it in a single transaction ending with the watermark advance.
pub struct Flusher {
  receiver: mpsc::Receiver<Event>,
  db: DatabaseConnection,
  flush_depth: usize,
  shutdown: CancellationToken,
}

impl Flusher {
  pub fn new(
    receiver: mpsc::Receiver<Event>,
    db: DatabaseConnection,
    flush_depth: usize,
    shutdown: CancellationToken,
  ) -> Flusher {
    Flusher {
      receiver,
      db,
      flush_depth,
      shutdown,
    }
  }

  pub async fn run(mut self) {
    loop {
      tokio::select! {
        maybe = self.receiver.recv() => match maybe {
          Some(first) => {
            let events = self.drain(first);
            self.flush(events).await;
          }
          None => break,
        },
        _ = self.shutdown.cancelled() => {
          // Drain what the pipeline already enqueued, then exit.
          while let Ok(first) = self.receiver.try_recv() {
            let events = self.drain(first);
            self.flush(events).await;
          }
          break;
        }
      }
    }
    log::info!("flush db quit");
  }

  fn drain(&mut self, first: Event) -> Vec<Event> {
    let mut events = vec![first];
    while events.len() < self.flush_depth {
      match self.receiver.try_recv() {
        Ok(event) => events.push(event),
        Err(_) => break,
      }
    }
    events
  }

  async fn flush(&self, events: Vec<Event>) {
    let start = Instant::now();
    let first_block = events[0].block_number;
    let blocks = events.len();
    let batch = build_db_update_model(events);

    // The watermark only advances on success, so a failing store is retried
    // with the same batch until it takes.
    let mut retry = 0;
    while let Err(err) = self.write(&batch).await {
      retry += 1;
      log::error!(
        "flush blocks[{first_block}..] failed err:{err} & retry later[{retry}]"
      );
      tokio::time::sleep(Duration::from_secs(1)).await;
    }

    log::info!(
      "flushed blocks[{first_block}..{}] count[{blocks}] in {} ms",
      batch.block_status.block_number,
      start.elapsed().as_millis(),
    );
  }

  async fn write(&self, batch: &DBModelsFlattened) -> Result<(), DbErr> {
    let txn = self.db.begin().await?;

    dal::dal::inscriptions::Mutation::creates(&txn, &batch.inscription_creates).await?;
    dal::dal::inscriptions::Mutation::updates(&txn, &batch.inscription_updates).await?;
    dal::dal::inscriptions_stats::Mutation::creates(&txn, &batch.stats_creates).await?;
    dal::dal::inscriptions_stats::Mutation::updates(&txn, &batch.stats_updates).await?;
    dal::dal::balances::Mutation::creates(&txn, &batch.balance_creates).await?;
    dal::dal::balances::Mutation::updates(&txn, &batch.balance_updates).await?;
    dal::dal::utxos::Mutation::creates(&txn, &batch.utxo_creates).await?;
    dal::dal::utxos::Mutation::updates(&txn, &batch.utxo_updates).await?;
    dal::dal::txs::Mutation::creates(&txn, &batch.txs).await?;
    dal::dal::address_txs::Mutation::creates(&txn, &batch.address_txs).await?;
    dal::dal::balance_txn::Mutation::creates(&txn, &batch.balance_txs).await?;
    dal::dal::block_status::Mutation::upsert(&txn, &batch.block_status).await?;

    txn.commit().await
  }
}
