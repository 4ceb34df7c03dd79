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

//! In-memory [`SnapshotRepository`] for tests.
//!
//! A whole cycle is inserted under one write lock, so readers only ever see
//! complete cycles. Failures and latency can be injected to exercise the
//! ingestion error paths without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tc_core::CoinSnapshot;

use crate::models::{IngestionRun, NewIngestionRun};
use crate::repository::{
  check_cycle, remaining_before, RepositoryError, RepositoryResult, SnapshotRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
  rows: Vec<CoinSnapshot>,
  runs: Vec<IngestionRun>,
}

/// Snapshot store backed by process memory
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
  state: RwLock<MemoryState>,
  fail_upserts: AtomicBool,
  fail_prunes: AtomicBool,
  fail_runs: AtomicBool,
  upsert_delay_ms: AtomicU64,
}

impl InMemorySnapshotRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every subsequent `upsert` fail with a storage error
  pub fn fail_upserts(&self, fail: bool) {
    self.fail_upserts.store(fail, Ordering::SeqCst);
  }

  /// Make every subsequent `prune_older_than` fail with a storage error
  pub fn fail_prunes(&self, fail: bool) {
    self.fail_prunes.store(fail, Ordering::SeqCst);
  }

  /// Make every subsequent `record_run` fail with a storage error
  pub fn fail_runs(&self, fail: bool) {
    self.fail_runs.store(fail, Ordering::SeqCst);
  }

  /// Delay each `upsert` before it touches the store
  pub fn set_upsert_delay(&self, delay: Duration) {
    self.upsert_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
  }

  /// Total stored snapshot rows across all cycles
  pub fn row_count(&self) -> usize {
    self.read().map(|state| state.rows.len()).unwrap_or(0)
  }

  /// Distinct cycle timestamps, oldest first
  pub fn cycles(&self) -> Vec<DateTime<Utc>> {
    let mut cycles: Vec<_> = self
      .read()
      .map(|state| state.rows.iter().map(|row| row.fetched_at).collect())
      .unwrap_or_default();
    cycles.sort();
    cycles.dedup();
    cycles
  }

  /// Every recorded run, oldest first
  pub fn runs(&self) -> Vec<IngestionRun> {
    self.read().map(|state| state.runs.clone()).unwrap_or_default()
  }

  fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, MemoryState>> {
    self.state.read().map_err(|e| RepositoryError::Storage(format!("Lock poisoned: {}", e)))
  }

  fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, MemoryState>> {
    self.state.write().map_err(|e| RepositoryError::Storage(format!("Lock poisoned: {}", e)))
  }
}

fn latest_of(rows: &[CoinSnapshot]) -> Option<DateTime<Utc>> {
  rows.iter().map(|row| row.fetched_at).max()
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
  async fn upsert_within(
    &self,
    fetched_at: DateTime<Utc>,
    rows: &[CoinSnapshot],
    deadline: Option<Instant>,
  ) -> RepositoryResult<usize> {
    check_cycle(fetched_at, rows)?;

    let delay = self.upsert_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if self.fail_upserts.load(Ordering::SeqCst) {
      return Err(RepositoryError::Storage("injected upsert failure".to_string()));
    }

    let mut state = self.write()?;
    remaining_before(deadline, "before commit")?;
    if state.rows.iter().any(|row| row.fetched_at == fetched_at) {
      return Err(RepositoryError::DuplicateCycle(fetched_at));
    }
    state.rows.extend(rows.iter().cloned());
    Ok(rows.len())
  }

  async fn latest_snapshot(&self) -> RepositoryResult<Vec<CoinSnapshot>> {
    let state = self.read()?;
    let Some(latest) = latest_of(&state.rows) else {
      return Ok(Vec::new());
    };

    let mut rows: Vec<_> =
      state.rows.iter().filter(|row| row.fetched_at == latest).cloned().collect();
    rows.sort_by_key(|row| row.rank);
    Ok(rows)
  }

  async fn latest_cycle_at(&self) -> RepositoryResult<Option<DateTime<Utc>>> {
    Ok(latest_of(&self.read()?.rows))
  }

  async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
    if self.fail_prunes.load(Ordering::SeqCst) {
      return Err(RepositoryError::Storage("injected prune failure".to_string()));
    }

    let mut state = self.write()?;
    let before = state.rows.len();
    if let Some(latest) = latest_of(&state.rows) {
      state.rows.retain(|row| row.fetched_at >= cutoff || row.fetched_at == latest);
    }
    let latest_run = state.runs.iter().map(|run| run.id).max();
    state.runs.retain(|run| run.recorded_at >= cutoff || Some(run.id) == latest_run);

    Ok(before - state.rows.len())
  }

  async fn coin_history(
    &self,
    coin_id: &str,
    since: DateTime<Utc>,
  ) -> RepositoryResult<Vec<CoinSnapshot>> {
    let state = self.read()?;
    let mut rows: Vec<_> = state
      .rows
      .iter()
      .filter(|row| row.coin_id == coin_id && row.fetched_at >= since)
      .cloned()
      .collect();
    rows.sort_by_key(|row| row.fetched_at);
    Ok(rows)
  }

  async fn record_run(&self, run: NewIngestionRun) -> RepositoryResult<IngestionRun> {
    if self.fail_runs.load(Ordering::SeqCst) {
      return Err(RepositoryError::Storage("injected run log failure".to_string()));
    }

    let mut state = self.write()?;
    let id = state.runs.iter().map(|run| run.id).max().unwrap_or(0) + 1;
    let stored = run.into_run(id);
    state.runs.push(stored.clone());
    Ok(stored)
  }

  async fn last_run(&self) -> RepositoryResult<Option<IngestionRun>> {
    Ok(self.read()?.runs.iter().max_by_key(|run| run.id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bigdecimal::BigDecimal;
  use chrono::{Duration as ChronoDuration, TimeZone};
  use pretty_assertions::assert_eq;
  use tc_core::{IngestionResult, SnapshotViolation};

  fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
  }

  fn cycle(fetched_at: DateTime<Utc>, count: i32) -> Vec<CoinSnapshot> {
    (1..=count)
      .map(|rank| CoinSnapshot {
        coin_id: format!("coin-{}", rank),
        rank,
        symbol: format!("C{}", rank),
        name: format!("Coin {}", rank),
        price_usd: BigDecimal::from(1000 / rank),
        market_cap_usd: BigDecimal::from(1_000_000 / rank),
        volume_24h_usd: Some(BigDecimal::from(5_000)),
        change_24h_pct: Some(BigDecimal::from(rank - 5)),
        fetched_at,
      })
      .collect()
  }

  #[tokio::test]
  async fn test_upsert_then_latest_in_rank_order() {
    let repo = InMemorySnapshotRepository::new();
    repo.upsert(ts(1), &cycle(ts(1), 3)).await.unwrap();
    let expected = cycle(ts(2), 10);

    let stored = repo.upsert(ts(2), &expected).await.unwrap();
    assert_eq!(stored, 10);
    assert_eq!(repo.latest_snapshot().await.unwrap(), expected);
    assert_eq!(repo.latest_cycle_at().await.unwrap(), Some(ts(2)));
  }

  #[tokio::test]
  async fn test_latest_snapshot_empty_store() {
    let repo = InMemorySnapshotRepository::new();
    assert!(repo.latest_snapshot().await.unwrap().is_empty());
    assert_eq!(repo.latest_cycle_at().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_duplicate_cycle_rejected_without_change() {
    let repo = InMemorySnapshotRepository::new();
    repo.upsert(ts(1), &cycle(ts(1), 10)).await.unwrap();

    let err = repo.upsert(ts(1), &cycle(ts(1), 3)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateCycle(t) if t == ts(1)));
    assert_eq!(repo.row_count(), 10);
  }

  #[tokio::test]
  async fn test_invalid_snapshot_is_rejected() {
    let repo = InMemorySnapshotRepository::new();
    let mut rows = cycle(ts(1), 3);
    rows[2].rank = 5;

    let err = repo.upsert(ts(1), &rows).await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidSnapshot(SnapshotViolation::RankGap { .. })));
    assert_eq!(repo.row_count(), 0);
  }

  #[tokio::test]
  async fn test_prune_keeps_recent_cycles() {
    let repo = InMemorySnapshotRepository::new();
    for day in [1, 10, 20] {
      repo.upsert(ts(day), &cycle(ts(day), 2)).await.unwrap();
    }

    let deleted = repo.prune_older_than(ts(10)).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(repo.cycles(), vec![ts(10), ts(20)]);
  }

  #[tokio::test]
  async fn test_prune_never_removes_latest_cycle() {
    let repo = InMemorySnapshotRepository::new();
    repo.upsert(ts(1), &cycle(ts(1), 10)).await.unwrap();
    repo.upsert(ts(2), &cycle(ts(2), 4)).await.unwrap();

    let deleted = repo.prune_older_than(ts(2) + ChronoDuration::days(60)).await.unwrap();
    assert_eq!(deleted, 10);
    assert_eq!(repo.cycles(), vec![ts(2)]);
    assert_eq!(repo.latest_snapshot().await.unwrap().len(), 4);
  }

  #[tokio::test]
  async fn test_coin_history_oldest_first() {
    let repo = InMemorySnapshotRepository::new();
    for day in [3, 1, 2] {
      repo.upsert(ts(day), &cycle(ts(day), 2)).await.unwrap();
    }

    let history = repo.coin_history("coin-2", ts(2)).await.unwrap();
    let times: Vec<_> = history.iter().map(|r| r.fetched_at).collect();
    assert_eq!(times, vec![ts(2), ts(3)]);
    assert!(repo.coin_history("missing", ts(1)).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_injected_upsert_failure_stores_nothing() {
    let repo = InMemorySnapshotRepository::new();
    repo.fail_upserts(true);

    let err = repo.upsert(ts(1), &cycle(ts(1), 10)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Storage(_)));
    assert_eq!(repo.row_count(), 0);
  }

  #[tokio::test]
  async fn test_write_past_deadline_stores_nothing() {
    let repo = InMemorySnapshotRepository::new();
    repo.set_upsert_delay(Duration::from_millis(100));
    let deadline = Instant::now() + Duration::from_millis(20);

    let err = repo.upsert_within(ts(1), &cycle(ts(1), 10), Some(deadline)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DeadlineExceeded(_)));
    assert_eq!(repo.row_count(), 0);

    let later = Instant::now() + Duration::from_secs(5);
    assert_eq!(repo.upsert_within(ts(1), &cycle(ts(1), 10), Some(later)).await.unwrap(), 10);
  }

  #[tokio::test]
  async fn test_run_log_and_retention() {
    let repo = InMemorySnapshotRepository::new();
    let old = IngestionResult::success(ts(1), Vec::new(), 0);
    let recent = IngestionResult::success(ts(20), Vec::new(), 0);

    let first = repo.record_run(NewIngestionRun::from_result(&old, true, ts(1))).await.unwrap();
    let second =
      repo.record_run(NewIngestionRun::from_result(&recent, false, ts(20))).await.unwrap();
    assert_eq!((first.id, second.id), (1, 2));
    assert_eq!(repo.last_run().await.unwrap(), Some(second.clone()));

    repo.prune_older_than(ts(10)).await.unwrap();
    assert_eq!(repo.runs(), vec![second]);
  }
}
