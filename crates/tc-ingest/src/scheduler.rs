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

//! The ingestion cycle: fetch, validate, store, prune, notify.
//!
//! [`IngestionScheduler::run_cycle`] is the single entry point used by the
//! daily timer, the refresh endpoint and `tc run`. A one-permit semaphore
//! keeps cycles from overlapping; a caller that finds the permit taken gets
//! [`IngestError::CycleInProgress`] immediately instead of waiting.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tc_client::MarketDataSource;
use tc_core::{cycle_timestamp, rank_records, validate_cycle, Config, FailureKind, IngestionResult};
use tc_database_postgres::{NewIngestionRun, RepositoryError, SnapshotRepository};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::cycle_tracker::{CycleState, CycleTracker};
use crate::error::{IngestError, IngestResult};
use crate::notify::ReportDispatcher;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Extra wait for a store that has passed its write deadline to report back
const STORE_GRACE: Duration = Duration::from_secs(1);

/// Limits applied to every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
  pub top_n: usize,
  /// Total fetch budget, retries included
  pub cycle_timeout: Duration,
  pub store_timeout: Duration,
  pub retention_days: i64,
}

impl Default for CycleSettings {
  fn default() -> Self {
    Self {
      top_n: tc_core::TOP_N,
      cycle_timeout: Duration::from_secs(30),
      store_timeout: Duration::from_secs(15),
      retention_days: tc_core::DEFAULT_RETENTION_DAYS,
    }
  }
}

impl CycleSettings {
  pub fn from_config(config: &Config) -> Self {
    Self {
      top_n: config.provider.top_n,
      cycle_timeout: Duration::from_secs(config.pipeline.cycle_timeout_secs),
      store_timeout: Duration::from_secs(config.pipeline.store_timeout_secs),
      retention_days: config.pipeline.retention_days,
    }
  }
}

/// Runs ingestion cycles one at a time
pub struct IngestionScheduler {
  source: Arc<dyn MarketDataSource>,
  store: Arc<dyn SnapshotRepository>,
  dispatcher: Arc<ReportDispatcher>,
  settings: CycleSettings,
  gate: Arc<Semaphore>,
  tracker: CycleTracker,
  last_cycle_at: Mutex<Option<DateTime<Utc>>>,
  clock: Clock,
}

impl IngestionScheduler {
  pub fn new(
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn SnapshotRepository>,
    dispatcher: Arc<ReportDispatcher>,
    settings: CycleSettings,
  ) -> Self {
    Self {
      source,
      store,
      dispatcher,
      settings,
      gate: Arc::new(Semaphore::new(1)),
      tracker: CycleTracker::new(),
      last_cycle_at: Mutex::new(None),
      clock: Arc::new(Utc::now),
    }
  }

  /// Replace the wall clock used to stamp cycles
  pub fn with_clock<F>(mut self, clock: F) -> Self
  where
    F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
  {
    self.clock = Arc::new(clock);
    self
  }

  pub fn with_tracker(mut self, tracker: CycleTracker) -> Self {
    self.tracker = tracker;
    self
  }

  pub fn settings(&self) -> &CycleSettings {
    &self.settings
  }

  pub fn tracker(&self) -> &CycleTracker {
    &self.tracker
  }

  pub fn store(&self) -> &Arc<dyn SnapshotRepository> {
    &self.store
  }

  /// True while a cycle holds the gate
  pub fn is_running(&self) -> bool {
    self.gate.available_permits() == 0
  }

  /// Run one complete cycle.
  ///
  /// Always yields an [`IngestionResult`] once the gate is acquired, whatever
  /// failed along the way, and always attempts exactly one notification.
  #[instrument(skip(self), fields(source = self.source.source_name()))]
  pub async fn run_cycle(&self) -> IngestResult<IngestionResult> {
    let _permit = Arc::clone(&self.gate).try_acquire_owned().map_err(|_| {
      warn!("Refusing to start a cycle while another one is running");
      IngestError::CycleInProgress
    })?;

    let fetched_at = self.next_cycle_timestamp();
    self.tracker.start(fetched_at).await;
    info!("Starting ingestion cycle {}", fetched_at);

    let mut result = self.ingest(fetched_at).await;
    if result.is_stored() {
      self.tracker.transition(CycleState::Pruning).await;
      self.prune(&mut result).await;
    }

    self.tracker.transition(CycleState::Notifying).await;
    let notification_sent = self.dispatcher.send_report(&result).await.is_ok();

    self.record_run(&result, notification_sent).await;
    self.tracker.complete(result.status).await;
    info!("Cycle {} finished: {}", fetched_at, result.summary());
    Ok(result)
  }

  /// Strictly increasing, microsecond precision
  fn next_cycle_timestamp(&self) -> DateTime<Utc> {
    let mut fetched_at = cycle_timestamp((self.clock)());
    let mut last = match self.last_cycle_at.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(previous) = *last {
      if fetched_at <= previous {
        fetched_at = previous + TimeDelta::microseconds(1);
      }
    }
    *last = Some(fetched_at);
    fetched_at
  }

  async fn ingest(&self, fetched_at: DateTime<Utc>) -> IngestionResult {
    let fetch = self.source.fetch_top(self.settings.top_n);
    let fetched = match timeout(self.settings.cycle_timeout, fetch).await {
      Ok(Ok(fetched)) => fetched,
      Ok(Err(e)) => {
        return self.fail(fetched_at, e.failure_kind(), e.to_string(), e.records_dropped()).await
      }
      Err(_) => {
        let detail =
          format!("no market data within {}s", self.settings.cycle_timeout.as_secs_f64());
        return self.fail(fetched_at, FailureKind::FetchTimeout, detail, 0).await;
      }
    };

    self.tracker.transition(CycleState::Validating).await;
    let (rows, duplicates) = rank_records(fetched_at, fetched.records, self.settings.top_n);
    let dropped = fetched.dropped + duplicates;
    if let Err(violation) = validate_cycle(&rows) {
      let detail = violation.to_string();
      return self.fail(fetched_at, FailureKind::InvalidSnapshot, detail, dropped).await;
    }

    self.tracker.transition(CycleState::Storing).await;
    // The store enforces the deadline itself and rolls back once it passes; the
    // outer bound only covers a store that stops responding altogether.
    let deadline = Instant::now() + self.settings.store_timeout;
    let write = self.store.upsert_within(fetched_at, &rows, Some(deadline));
    match timeout(self.settings.store_timeout + STORE_GRACE, write).await {
      Ok(Ok(stored)) => {
        info!("Stored {} coins for cycle {} ({} dropped)", stored, fetched_at, dropped);
        IngestionResult::success(fetched_at, rows, dropped)
      }
      Ok(Err(e)) => {
        let kind = match &e {
          RepositoryError::DeadlineExceeded(_) => FailureKind::StorageTimeout,
          RepositoryError::DuplicateCycle(_) => FailureKind::DuplicateCycle,
          RepositoryError::InvalidSnapshot(_) => FailureKind::InvalidSnapshot,
          _ => FailureKind::Storage,
        };
        self.fail(fetched_at, kind, e.to_string(), dropped).await
      }
      Err(_) => {
        let detail =
          format!("storage did not respond within {}s", self.settings.store_timeout.as_secs_f64());
        self.fail(fetched_at, FailureKind::StorageTimeout, detail, dropped).await
      }
    }
  }

  async fn fail(
    &self,
    fetched_at: DateTime<Utc>,
    kind: FailureKind,
    detail: String,
    dropped: usize,
  ) -> IngestionResult {
    error!("Cycle {} failed ({}): {}", fetched_at, kind, detail);
    self.tracker.transition(CycleState::Failed).await;
    IngestionResult::failure(fetched_at, kind, detail, dropped)
  }

  async fn prune(&self, result: &mut IngestionResult) {
    let cutoff = match TimeDelta::try_days(self.settings.retention_days)
      .and_then(|window| result.fetched_at.checked_sub_signed(window))
    {
      Some(cutoff) => cutoff,
      None => {
        warn!("Retention of {} days is out of range", self.settings.retention_days);
        result.record_prune_failure("retention window out of range");
        return;
      }
    };
    match timeout(self.settings.store_timeout, self.store.prune_older_than(cutoff)).await {
      Ok(Ok(deleted)) => result.record_pruned(deleted),
      Ok(Err(e)) => {
        warn!("Pruning rows older than {} failed: {}", cutoff, e);
        result.record_prune_failure(e.to_string());
      }
      Err(_) => {
        warn!("Pruning rows older than {} timed out", cutoff);
        result.record_prune_failure("pruning timed out");
      }
    }
  }

  async fn record_run(&self, result: &IngestionResult, notification_sent: bool) {
    let run = NewIngestionRun::from_result(result, notification_sent, Utc::now());
    if let Err(e) = self.store.record_run(run).await {
      warn!("Failed to record ingestion run {}: {}", result.fetched_at, e);
    }
  }
}
