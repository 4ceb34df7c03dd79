//! Outcome of one ingestion cycle

use crate::types::snapshot::{top_mover, CoinSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
  /// Snapshot stored and housekeeping completed
  Success,
  /// Snapshot stored, pruning failed
  Partial,
  /// Nothing stored for this cycle
  Failure,
}

impl IngestionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      IngestionStatus::Success => "success",
      IngestionStatus::Partial => "partial",
      IngestionStatus::Failure => "failure",
    }
  }
}

impl fmt::Display for IngestionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Classification of the error that ended a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  TransientFetch,
  TerminalFetch,
  Auth,
  EmptyResult,
  FetchTimeout,
  InvalidSnapshot,
  DuplicateCycle,
  Storage,
  StorageTimeout,
}

impl FailureKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FailureKind::TransientFetch => "transient_fetch",
      FailureKind::TerminalFetch => "terminal_fetch",
      FailureKind::Auth => "auth",
      FailureKind::EmptyResult => "empty_result",
      FailureKind::FetchTimeout => "fetch_timeout",
      FailureKind::InvalidSnapshot => "invalid_snapshot",
      FailureKind::DuplicateCycle => "duplicate_cycle",
      FailureKind::Storage => "storage",
      FailureKind::StorageTimeout => "storage_timeout",
    }
  }

  /// True for failures raised before anything reached storage
  pub fn is_fetch_stage(&self) -> bool {
    matches!(
      self,
      FailureKind::TransientFetch
        | FailureKind::TerminalFetch
        | FailureKind::Auth
        | FailureKind::EmptyResult
        | FailureKind::FetchTimeout
    )
  }
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFailure {
  pub kind: FailureKind,
  pub detail: String,
}

/// Everything the notifier and the run log need to know about a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
  pub status: IngestionStatus,
  pub fetched_at: DateTime<Utc>,
  pub coins_stored: usize,
  pub records_dropped: usize,
  pub snapshot: Vec<CoinSnapshot>,
  pub failure: Option<CycleFailure>,
  pub rows_pruned: usize,
  pub prune_error: Option<String>,
}

impl IngestionResult {
  pub fn success(
    fetched_at: DateTime<Utc>,
    snapshot: Vec<CoinSnapshot>,
    records_dropped: usize,
  ) -> Self {
    Self {
      status: IngestionStatus::Success,
      fetched_at,
      coins_stored: snapshot.len(),
      records_dropped,
      snapshot,
      failure: None,
      rows_pruned: 0,
      prune_error: None,
    }
  }

  pub fn failure(
    fetched_at: DateTime<Utc>,
    kind: FailureKind,
    detail: impl Into<String>,
    records_dropped: usize,
  ) -> Self {
    Self {
      status: IngestionStatus::Failure,
      fetched_at,
      coins_stored: 0,
      records_dropped,
      snapshot: Vec::new(),
      failure: Some(CycleFailure { kind, detail: detail.into() }),
      rows_pruned: 0,
      prune_error: None,
    }
  }

  pub fn record_pruned(&mut self, rows: usize) {
    self.rows_pruned = rows;
  }

  /// Pruning failures downgrade a stored cycle to `Partial`
  pub fn record_prune_failure(&mut self, error: impl Into<String>) {
    self.prune_error = Some(error.into());
    if self.status == IngestionStatus::Success {
      self.status = IngestionStatus::Partial;
    }
  }

  /// Snapshot reached storage
  pub fn is_stored(&self) -> bool {
    self.status != IngestionStatus::Failure
  }

  pub fn failure_kind(&self) -> Option<FailureKind> {
    self.failure.as_ref().map(|f| f.kind)
  }

  pub fn top_mover(&self) -> Option<&CoinSnapshot> {
    top_mover(&self.snapshot)
  }

  /// One-line description used for logs and the run log
  pub fn summary(&self) -> String {
    match (&self.failure, &self.prune_error) {
      (Some(failure), _) => format!("{}: {}", failure.kind, failure.detail),
      (None, Some(prune_error)) => {
        format!("stored {} coins, pruning failed: {}", self.coins_stored, prune_error)
      }
      (None, None) => format!(
        "stored {} coins ({} dropped), pruned {} rows",
        self.coins_stored, self.records_dropped, self.rows_pruned
      ),
    }
  }
}
