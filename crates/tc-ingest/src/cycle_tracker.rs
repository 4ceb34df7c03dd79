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

//! Cycle tracking for monitoring ingestion runs
//! Keeps the state transitions of recent cycles in memory

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tc_core::IngestionStatus;
use tokio::sync::Mutex;

/// Number of cycles kept by default
pub const DEFAULT_HISTORY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
  Idle,
  Fetching,
  Validating,
  Storing,
  Pruning,
  Notifying,
  Failed,
}

impl fmt::Display for CycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CycleState::Idle => "idle",
      CycleState::Fetching => "fetching",
      CycleState::Validating => "validating",
      CycleState::Storing => "storing",
      CycleState::Pruning => "pruning",
      CycleState::Notifying => "notifying",
      CycleState::Failed => "failed",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone)]
pub struct CycleInfo {
  pub fetched_at: DateTime<Utc>,
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  pub state: CycleState,
  /// Every state entered, in order, starting with `Fetching`
  pub transitions: Vec<CycleState>,
  pub status: Option<IngestionStatus>,
}

/// In-memory cycle tracker
#[derive(Clone)]
pub struct CycleTracker {
  cycles: Arc<Mutex<VecDeque<CycleInfo>>>,
  capacity: usize,
}

impl Default for CycleTracker {
  fn default() -> Self {
    Self::new()
  }
}

impl CycleTracker {
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_HISTORY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self { cycles: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
  }

  /// Open a record for a cycle entering `Fetching`
  pub async fn start(&self, fetched_at: DateTime<Utc>) {
    let mut cycles = self.cycles.lock().await;
    if cycles.len() == self.capacity {
      cycles.pop_front();
    }
    cycles.push_back(CycleInfo {
      fetched_at,
      start_time: Utc::now(),
      end_time: None,
      state: CycleState::Fetching,
      transitions: vec![CycleState::Fetching],
      status: None,
    });
  }

  pub async fn transition(&self, state: CycleState) {
    let mut cycles = self.cycles.lock().await;
    if let Some(last) = cycles.back_mut() {
      last.state = state;
      last.transitions.push(state);
    }
  }

  /// Close the current record and return to `Idle`
  pub async fn complete(&self, status: IngestionStatus) {
    let mut cycles = self.cycles.lock().await;
    if let Some(last) = cycles.back_mut() {
      last.state = CycleState::Idle;
      last.transitions.push(CycleState::Idle);
      last.status = Some(status);
      last.end_time = Some(Utc::now());
    }
  }

  /// State of the most recent cycle, `Idle` when none has run
  pub async fn current_state(&self) -> CycleState {
    self.cycles.lock().await.back().map(|c| c.state).unwrap_or(CycleState::Idle)
  }

  pub async fn last(&self) -> Option<CycleInfo> {
    self.cycles.lock().await.back().cloned()
  }

  pub async fn get_all(&self) -> Vec<CycleInfo> {
    self.cycles.lock().await.iter().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap()
  }

  #[tokio::test]
  async fn test_records_transitions_in_order() {
    let tracker = CycleTracker::new();
    assert_eq!(tracker.current_state().await, CycleState::Idle);

    tracker.start(ts(0)).await;
    tracker.transition(CycleState::Validating).await;
    tracker.transition(CycleState::Storing).await;
    assert_eq!(tracker.current_state().await, CycleState::Storing);

    tracker.complete(IngestionStatus::Success).await;
    let last = tracker.last().await.unwrap();
    assert_eq!(
      last.transitions,
      vec![CycleState::Fetching, CycleState::Validating, CycleState::Storing, CycleState::Idle]
    );
    assert_eq!(last.status, Some(IngestionStatus::Success));
    assert!(last.end_time.is_some());
  }

  #[tokio::test]
  async fn test_history_is_bounded() {
    let tracker = CycleTracker::with_capacity(2);
    for minute in 0..3 {
      tracker.start(ts(minute)).await;
      tracker.complete(IngestionStatus::Failure).await;
    }

    let all = tracker.get_all().await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].fetched_at, ts(1));
    assert_eq!(all[1].fetched_at, ts(2));
  }

  #[test]
  fn test_state_display() {
    assert_eq!(CycleState::Notifying.to_string(), "notifying");
    assert_eq!(CycleState::Failed.to_string(), "failed");
  }
}
