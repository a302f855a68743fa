//! Find-then-write persistence of keyed records.
//!
//! Each upsert runs in its own transaction. Upserts issued through clones of
//! one [`UpsertGateway`] are serialized. Gateways over separate connections to
//! the same file queue on the SQLite write lock, which every transaction takes
//! with its first statement, so the last committer wins.

use crate::{
    data::{Database, Table, Tx},
    record::{Keyed, Restaurant, Review},
    CrawlerError,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Stored<R> {
    pub id: i64,
    /// `false` when an existing row was overwritten.
    pub inserted: bool,
    pub record: R,
}

#[derive(Debug, Clone)]
pub struct UpsertGateway {
    db: Database,
    lock: Arc<Mutex<()>>,
}

impl UpsertGateway {
    pub fn new(db: Database) -> Self {
        UpsertGateway {
            db,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn upsert_restaurant(
        &self,
        restaurant: Restaurant,
    ) -> Result<Stored<Restaurant>, CrawlerError> {
        self.upsert(&self.db.restaurants, restaurant).await
    }

    pub async fn upsert_review(&self, review: Review) -> Result<Stored<Review>, CrawlerError> {
        self.upsert(&self.db.reviews, review).await
    }

    /// Overwrites every field of the row sharing the record's key, or inserts
    /// a new row. Nothing is written when any step fails.
    pub async fn upsert<T: Table>(
        &self,
        table: &T,
        record: T::Record,
    ) -> Result<Stored<T::Record>, CrawlerError> {
        let _guard = self.lock.lock().await;
        let mut tx = self.db.begin().await?;

        match write(table, &mut tx, &record).await {
            Ok((id, inserted)) => {
                tx.commit().await?;
                debug!(
                    "{} {} {} (id {})",
                    if inserted { "Inserted" } else { "Updated" },
                    table.get_name(),
                    record.unique_key(),
                    id
                );
                Ok(Stored {
                    id,
                    inserted,
                    record,
                })
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback on {} failed: {}", table.get_name(), rollback);
                }
                Err(e.into())
            }
        }
    }
}

/// Insert first, then overwrite. A read must not precede the first write of
/// the transaction, or a concurrent writer makes the lock upgrade fail.
async fn write<T: Table>(
    table: &T,
    tx: &mut Tx,
    record: &T::Record,
) -> Result<(i64, bool), sqlx::Error> {
    if let Some(id) = table.insert_new(tx, record).await? {
        return Ok((id, true));
    }
    match table.find_existing(tx, record).await? {
        Some(id) => {
            table.update(tx, id, record).await?;
            Ok((id, false))
        }
        // Ignored for another reason than a stored duplicate; a plain insert
        // reports it.
        None => Ok((table.insert(tx, record).await?, true)),
    }
}
