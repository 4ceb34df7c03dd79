//! Daily wall-clock trigger for ingestion cycles

use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use std::future::Future;
use std::sync::Arc;
use tc_core::{IngestionResult, ScheduleConfig};
use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};
use crate::scheduler::IngestionScheduler;

/// First instant strictly after `now` whose local time is `hour:minute`.
///
/// Local times skipped by a DST change fall back to one hour later. Returns
/// `None` for an out-of-range hour or minute.
pub fn next_run_after<Tz: TimeZone>(
  now: &DateTime<Tz>,
  hour: u32,
  minute: u32,
) -> Option<DateTime<Tz>> {
  let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
  let tz = now.timezone();
  let mut date = now.date_naive();

  for _ in 0..3 {
    let local = date.and_time(time);
    let candidate = tz
      .from_local_datetime(&local)
      .earliest()
      .or_else(|| tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest());
    if let Some(candidate) = candidate {
      if candidate > *now {
        return Some(candidate);
      }
    }
    date = date.succ_opt()?;
  }
  None
}

/// Fires one cycle per day at the configured local time
pub struct DailyTimer {
  scheduler: Arc<IngestionScheduler>,
  hour: u32,
  minute: u32,
}

impl DailyTimer {
  pub fn new(scheduler: Arc<IngestionScheduler>, schedule: &ScheduleConfig) -> IngestResult<Self> {
    if NaiveTime::from_hms_opt(schedule.hour, schedule.minute, 0).is_none() {
      return Err(IngestError::ConfigurationError(format!(
        "invalid schedule time {:02}:{:02}",
        schedule.hour, schedule.minute
      )));
    }
    Ok(Self { scheduler, hour: schedule.hour, minute: schedule.minute })
  }

  /// Next firing after `now` in local time
  pub fn next_fire(&self, now: &DateTime<Local>) -> IngestResult<DateTime<Local>> {
    next_run_after(now, self.hour, self.minute).ok_or_else(|| {
      IngestError::ConfigurationError(format!(
        "no valid local time for {:02}:{:02}",
        self.hour, self.minute
      ))
    })
  }

  /// One firing. A cycle already in progress is logged and skipped.
  pub async fn fire(&self) -> Option<IngestionResult> {
    match self.scheduler.run_cycle().await {
      Ok(result) => Some(result),
      Err(IngestError::CycleInProgress) => {
        warn!("Scheduled cycle skipped: another cycle is still running");
        None
      }
      Err(e) => {
        warn!("Scheduled cycle could not start: {}", e);
        None
      }
    }
  }

  /// Sleep until each daily firing until `shutdown` completes
  pub async fn run_until<F>(&self, shutdown: F) -> IngestResult<()>
  where
    F: Future<Output = ()>,
  {
    tokio::pin!(shutdown);

    loop {
      let now = Local::now();
      let next = self.next_fire(&now)?;
      let wait = (next - now).to_std().unwrap_or_default();
      info!("Next ingestion cycle at {} (in {}s)", next, wait.as_secs());

      tokio::select! {
        _ = &mut shutdown => {
          info!("Daily timer stopped");
          return Ok(());
        }
        _ = tokio::time::sleep(wait) => {
          self.fire().await;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{FixedOffset, Utc};

  #[test]
  fn test_next_run_later_today() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 7, 30, 0).unwrap();
    let next = next_run_after(&now, 9, 0).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
  }

  #[test]
  fn test_next_run_rolls_to_tomorrow() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let next = next_run_after(&now, 9, 0).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap());
  }

  #[test]
  fn test_next_run_crosses_month_end() {
    let now = Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 0).unwrap();
    let next = next_run_after(&now, 0, 0).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn test_next_run_respects_offset() {
    let tz = FixedOffset::east_opt(9 * 3600).unwrap();
    let now = tz.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
    let next = next_run_after(&now, 9, 0).unwrap();
    assert_eq!(next, tz.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap());
    assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());
  }

  #[test]
  fn test_invalid_time_has_no_next_run() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 7, 30, 0).unwrap();
    assert!(next_run_after(&now, 24, 0).is_none());
    assert!(next_run_after(&now, 9, 60).is_none());
  }
}
