/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Snapshot repository abstraction layer
//!
//! [`SnapshotRepository`] is the storage contract shared by the ingestion
//! cycle, the web front end and the CLI. [`DatabaseContext`] owns the r2d2
//! pool and hands out the Postgres implementation; diesel is synchronous, so
//! every call runs on the blocking thread pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tc_core::{validate_cycle, CoinSnapshot, SnapshotViolation};
use thiserror::Error;

use crate::connection::run_pending_migrations;
use crate::models::{CoinSnapshotRow, IngestionRun, NewIngestionRun};
use crate::schema::{coin_snapshots, ingestion_runs};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

const MAX_POOL_SIZE: u32 = 10;
const MIN_POOL_IDLE: u32 = 1;
/// Connection timeout in seconds - pool will fail instead of retrying forever
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Database repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("Connection pool error: {0}")]
  Pool(String),

  #[error("Storage error: {0}")]
  Storage(String),

  #[error("Cycle {0} is already stored")]
  DuplicateCycle(DateTime<Utc>),

  #[error("Write deadline passed {0}; nothing was committed")]
  DeadlineExceeded(String),

  #[error("Invalid snapshot: {0}")]
  InvalidSnapshot(#[from] SnapshotViolation),

  #[error("Constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Migration error: {0}")]
  Migration(String),
}

impl From<DieselError> for RepositoryError {
  fn from(err: DieselError) -> Self {
    match err {
      DieselError::NotFound => RepositoryError::Storage("Record not found".to_string()),
      DieselError::DatabaseError(kind, info) => match kind {
        DatabaseErrorKind::UniqueViolation
        | DatabaseErrorKind::ForeignKeyViolation
        | DatabaseErrorKind::CheckViolation => {
          RepositoryError::ConstraintViolation(info.message().to_string())
        }
        _ => RepositoryError::Storage(info.message().to_string()),
      },
      DieselError::SerializationError(e) | DieselError::DeserializationError(e) => {
        RepositoryError::Serialization(e.to_string())
      }
      _ => RepositoryError::Storage(err.to_string()),
    }
  }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
  fn from(err: diesel::r2d2::PoolError) -> Self {
    RepositoryError::Pool(err.to_string())
  }
}

impl From<serde_json::Error> for RepositoryError {
  fn from(err: serde_json::Error) -> Self {
    RepositoryError::Serialization(err.to_string())
  }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Durable storage for ranked snapshots and the ingestion run log
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
  /// Store one cycle atomically.
  ///
  /// Fails with `DuplicateCycle` when any row already carries `fetched_at`;
  /// nothing is overwritten and no partial cycle is ever visible.
  async fn upsert(
    &self,
    fetched_at: DateTime<Utc>,
    rows: &[CoinSnapshot],
  ) -> RepositoryResult<usize> {
    self.upsert_within(fetched_at, rows, None).await
  }

  /// [`upsert`](Self::upsert) that gives up with `DeadlineExceeded` once
  /// `deadline` passes.
  ///
  /// The deadline is enforced by the write itself, so when this returns an
  /// error the cycle is not stored and never will be by this call.
  async fn upsert_within(
    &self,
    fetched_at: DateTime<Utc>,
    rows: &[CoinSnapshot],
    deadline: Option<Instant>,
  ) -> RepositoryResult<usize>;

  /// Rows of the most recent cycle ordered by rank, empty when none exists
  async fn latest_snapshot(&self) -> RepositoryResult<Vec<CoinSnapshot>>;

  /// Timestamp of the most recent stored cycle
  async fn latest_cycle_at(&self) -> RepositoryResult<Option<DateTime<Utc>>>;

  /// Delete snapshot rows and run log entries older than `cutoff`.
  ///
  /// The most recent cycle and the most recent run survive regardless of age.
  /// Returns the number of snapshot rows deleted.
  async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize>;

  /// Every stored row for one coin since `since`, oldest first
  async fn coin_history(
    &self,
    coin_id: &str,
    since: DateTime<Utc>,
  ) -> RepositoryResult<Vec<CoinSnapshot>>;

  /// Append an entry to the ingestion run log
  async fn record_run(&self, run: NewIngestionRun) -> RepositoryResult<IngestionRun>;

  /// Most recently recorded run
  async fn last_run(&self) -> RepositoryResult<Option<IngestionRun>>;
}

/// Reject rows that do not form a single well-formed cycle at `fetched_at`
pub fn check_cycle(fetched_at: DateTime<Utc>, rows: &[CoinSnapshot]) -> RepositoryResult<()> {
  validate_cycle(rows)?;
  if rows.iter().any(|row| row.fetched_at != fetched_at) {
    return Err(SnapshotViolation::MixedCycle.into());
  }
  Ok(())
}

/// Time left before `deadline`, or `DeadlineExceeded` naming `stage`
pub fn remaining_before(
  deadline: Option<Instant>,
  stage: &str,
) -> RepositoryResult<Option<Duration>> {
  match deadline {
    None => Ok(None),
    Some(deadline) => {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        Err(RepositoryError::DeadlineExceeded(stage.to_string()))
      } else {
        Ok(Some(remaining))
      }
    }
  }
}

/// Database context that provides access to repositories and connection pool
#[derive(Clone)]
pub struct DatabaseContext {
  pool: Arc<DbPool>,
  statement_timeout: Option<Duration>,
}

impl DatabaseContext {
  /// Create a new database context with connection pooling
  ///
  /// Fails fast if the database is unavailable by testing the connection at startup.
  /// This prevents the r2d2 pool from spawning background threads that retry forever.
  pub fn new(database_url: &str) -> RepositoryResult<Self> {
    Self::with_pool_config(database_url, MAX_POOL_SIZE, MIN_POOL_IDLE, CONNECTION_TIMEOUT_SECS)
  }

  /// Create with custom pool configuration and connection timeout
  pub fn with_pool_config(
    database_url: &str,
    max_size: u32,
    min_idle: u32,
    timeout_secs: u64,
  ) -> RepositoryResult<Self> {
    // Test connection BEFORE creating the pool to fail fast without background retry noise
    PgConnection::establish(database_url)
      .map_err(|e| RepositoryError::Pool(format!("Failed to connect to database: {}", e)))?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size)
      .min_idle(Some(min_idle))
      .connection_timeout(Duration::from_secs(timeout_secs))
      .build(manager)
      .map_err(|e| RepositoryError::Pool(e.to_string()))?;

    Ok(Self { pool: Arc::new(pool), statement_timeout: None })
  }

  /// Bound every write transaction with a server-side statement timeout
  pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
    self.statement_timeout = Some(timeout);
    self
  }

  /// Get the underlying pool
  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  /// Create a snapshot repository instance
  pub fn snapshot_repository(&self) -> PgSnapshotRepository {
    PgSnapshotRepository { context: self.clone() }
  }

  /// Apply embedded migrations
  pub async fn run_migrations(&self) -> RepositoryResult<Vec<String>> {
    let applied =
      self.run(|conn| run_pending_migrations(conn).map_err(RepositoryError::Migration)).await?;
    if !applied.is_empty() {
      info!("Applied {} migration(s): {}", applied.len(), applied.join(", "));
    }
    Ok(applied)
  }

  /// Execute a blocking database operation asynchronously
  pub async fn run<F, R>(&self, f: F) -> RepositoryResult<R>
  where
    F: FnOnce(&mut DbConnection) -> RepositoryResult<R> + Send + 'static,
    R: Send + 'static,
  {
    self.run_before(None, f).await
  }

  /// Like [`run`](Self::run), but the pool checkout waits no longer than
  /// `deadline`
  pub async fn run_before<F, R>(&self, deadline: Option<Instant>, f: F) -> RepositoryResult<R>
  where
    F: FnOnce(&mut DbConnection) -> RepositoryResult<R> + Send + 'static,
    R: Send + 'static,
  {
    let pool = Arc::clone(&self.pool);
    tokio::task::spawn_blocking(move || {
      let mut conn = match remaining_before(deadline, "before a connection was available")? {
        None => pool.get()?,
        Some(remaining) => pool.get_timeout(remaining).map_err(|e| {
          if remaining_before(deadline, "").is_err() {
            RepositoryError::DeadlineExceeded("before a connection was available".to_string())
          } else {
            RepositoryError::from(e)
          }
        })?,
      };
      f(&mut conn)
    })
    .await
    .map_err(|e| RepositoryError::Storage(format!("Task join error: {}", e)))?
  }
}

/// Postgres implementation of [`SnapshotRepository`]
#[derive(Clone)]
pub struct PgSnapshotRepository {
  context: DatabaseContext,
}

fn latest_fetched_at(conn: &mut PgConnection) -> QueryResult<Option<DateTime<Utc>>> {
  coin_snapshots::table.select(max(coin_snapshots::fetched_at)).get_result(conn)
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
  async fn upsert_within(
    &self,
    fetched_at: DateTime<Utc>,
    rows: &[CoinSnapshot],
    deadline: Option<Instant>,
  ) -> RepositoryResult<usize> {
    check_cycle(fetched_at, rows)?;
    let new_rows: Vec<CoinSnapshotRow> = rows.iter().map(CoinSnapshotRow::from).collect();
    let configured_timeout = self.context.statement_timeout;

    self
      .context
      .run_before(deadline, move |conn| {
        let outcome = conn.transaction::<usize, RepositoryError, _>(|conn| {
          let remaining = remaining_before(deadline, "before the transaction started")?;
          let statement_timeout = match (configured_timeout, remaining) {
            (Some(configured), Some(remaining)) => Some(configured.min(remaining)),
            (configured, remaining) => configured.or(remaining),
          };
          if let Some(timeout) = statement_timeout {
            // Zero would disable the limit
            let millis = timeout.as_millis().max(1);
            diesel::sql_query(format!("SET LOCAL statement_timeout = {}", millis)).execute(conn)?;
          }

          let existing: i64 = coin_snapshots::table
            .filter(coin_snapshots::fetched_at.eq(fetched_at))
            .count()
            .get_result(conn)?;
          if existing > 0 {
            return Err(RepositoryError::DuplicateCycle(fetched_at));
          }

          remaining_before(deadline, "before the insert")?;
          let inserted = diesel::insert_into(coin_snapshots::table)
            .values(&new_rows)
            .execute(conn)
            .map_err(|e| match e {
              // Lost a race with another writer for the same cycle
              DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                RepositoryError::DuplicateCycle(fetched_at)
              }
              other => {
                error!("Failed to insert cycle {}: {}", fetched_at, other);
                RepositoryError::from(other)
              }
            })?;

          // Returning an error here rolls the insert back
          remaining_before(deadline, "before commit")?;
          debug!("Inserted {} snapshot rows for cycle {}", inserted, fetched_at);
          Ok(inserted)
        });

        match outcome {
          // A statement cancelled by statement_timeout surfaces as a plain storage error
          Err(RepositoryError::Storage(detail)) if remaining_before(deadline, "").is_err() => {
            Err(RepositoryError::DeadlineExceeded(format!("during the write ({})", detail)))
          }
          other => other,
        }
      })
      .await
  }

  async fn latest_snapshot(&self) -> RepositoryResult<Vec<CoinSnapshot>> {
    self
      .context
      .run(|conn| {
        // Both reads see the same committed state
        conn.build_transaction().read_only().repeatable_read().run::<_, RepositoryError, _>(
          |conn| {
            let Some(latest) = latest_fetched_at(conn)? else {
              return Ok(Vec::new());
            };

            let rows = coin_snapshots::table
              .filter(coin_snapshots::fetched_at.eq(latest))
              .order(coin_snapshots::rank.asc())
              .select(CoinSnapshotRow::as_select())
              .load(conn)?;

            Ok(rows.into_iter().map(CoinSnapshot::from).collect())
          },
        )
      })
      .await
  }

  async fn latest_cycle_at(&self) -> RepositoryResult<Option<DateTime<Utc>>> {
    self.context.run(|conn| Ok(latest_fetched_at(conn)?)).await
  }

  async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
    let statement_timeout = self.context.statement_timeout;
    self
      .context
      .run(move |conn| {
        conn.transaction::<usize, RepositoryError, _>(|conn| {
          if let Some(timeout) = statement_timeout {
            let millis = timeout.as_millis().max(1);
            diesel::sql_query(format!("SET LOCAL statement_timeout = {}", millis)).execute(conn)?;
          }

          let snapshots_deleted = match latest_fetched_at(conn)? {
            Some(latest) => diesel::delete(
              coin_snapshots::table
                .filter(coin_snapshots::fetched_at.lt(cutoff))
                .filter(coin_snapshots::fetched_at.ne(latest)),
            )
            .execute(conn)?,
            None => 0,
          };

          let latest_run: Option<i32> =
            ingestion_runs::table.select(max(ingestion_runs::id)).get_result(conn)?;
          let runs_deleted = match latest_run {
            Some(latest_id) => diesel::delete(
              ingestion_runs::table
                .filter(ingestion_runs::recorded_at.lt(cutoff))
                .filter(ingestion_runs::id.ne(latest_id)),
            )
            .execute(conn)?,
            None => 0,
          };

          info!(
            "Pruned {} snapshot rows and {} run log entries older than {}",
            snapshots_deleted, runs_deleted, cutoff
          );
          Ok(snapshots_deleted)
        })
      })
      .await
  }

  async fn coin_history(
    &self,
    coin_id: &str,
    since: DateTime<Utc>,
  ) -> RepositoryResult<Vec<CoinSnapshot>> {
    let coin_id = coin_id.to_string();

    self
      .context
      .run(move |conn| {
        let rows = coin_snapshots::table
          .filter(coin_snapshots::coin_id.eq(&coin_id))
          .filter(coin_snapshots::fetched_at.ge(since))
          .order(coin_snapshots::fetched_at.asc())
          .select(CoinSnapshotRow::as_select())
          .load(conn)?;

        Ok(rows.into_iter().map(CoinSnapshot::from).collect())
      })
      .await
  }

  async fn record_run(&self, run: NewIngestionRun) -> RepositoryResult<IngestionRun> {
    self
      .context
      .run(move |conn| {
        let stored = diesel::insert_into(ingestion_runs::table)
          .values(&run)
          .returning(IngestionRun::as_returning())
          .get_result(conn)?;
        Ok(stored)
      })
      .await
  }

  async fn last_run(&self) -> RepositoryResult<Option<IngestionRun>> {
    self
      .context
      .run(|conn| {
        let run = ingestion_runs::table
          .order(ingestion_runs::id.desc())
          .select(IngestionRun::as_select())
          .first(conn)
          .optional()?;
        Ok(run)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bigdecimal::BigDecimal;
  use chrono::TimeZone;

  fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
  }

  fn row(rank: i32, fetched_at: DateTime<Utc>) -> CoinSnapshot {
    CoinSnapshot {
      coin_id: format!("coin-{}", rank),
      rank,
      symbol: format!("C{}", rank),
      name: format!("Coin {}", rank),
      price_usd: BigDecimal::from(100),
      market_cap_usd: BigDecimal::from(1_000_000),
      volume_24h_usd: None,
      change_24h_pct: None,
      fetched_at,
    }
  }

  #[test]
  fn test_check_cycle_accepts_contiguous_ranks() {
    let rows: Vec<_> = (1..=3).map(|r| row(r, ts())).collect();
    assert!(check_cycle(ts(), &rows).is_ok());
  }

  #[test]
  fn test_check_cycle_rejects_foreign_timestamp() {
    let mut rows: Vec<_> = (1..=2).map(|r| row(r, ts())).collect();
    rows[1].fetched_at = ts() + chrono::Duration::seconds(1);

    let err = check_cycle(ts(), &rows).unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidSnapshot(_)));
  }

  #[test]
  fn test_check_cycle_rejects_mismatched_argument() {
    let rows = vec![row(1, ts())];
    let other = ts() + chrono::Duration::minutes(5);
    assert!(matches!(
      check_cycle(other, &rows),
      Err(RepositoryError::InvalidSnapshot(SnapshotViolation::MixedCycle))
    ));
  }

  #[test]
  fn test_check_cycle_rejects_empty() {
    assert!(matches!(
      check_cycle(ts(), &[]),
      Err(RepositoryError::InvalidSnapshot(SnapshotViolation::Empty))
    ));
  }

  #[test]
  fn test_error_display() {
    let err = RepositoryError::DuplicateCycle(ts());
    assert_eq!(err.to_string(), "Cycle 2025-03-01 09:00:00 UTC is already stored");

    let err = RepositoryError::Storage("connection reset".to_string());
    assert_eq!(err.to_string(), "Storage error: connection reset");
  }

  #[test]
  fn test_diesel_not_found_maps_to_storage() {
    let err: RepositoryError = DieselError::NotFound.into();
    assert!(matches!(err, RepositoryError::Storage(_)));
  }

  #[test]
  fn test_remaining_before_deadline() {
    assert_eq!(remaining_before(None, "before commit").unwrap(), None);

    let ahead = Instant::now() + Duration::from_secs(60);
    let remaining = remaining_before(Some(ahead), "before commit").unwrap().unwrap();
    assert!(remaining > Duration::from_secs(59));

    let passed = Instant::now();
    let err = remaining_before(Some(passed), "before commit").unwrap_err();
    assert_eq!(err.to_string(), "Write deadline passed before commit; nothing was committed");
  }
}
