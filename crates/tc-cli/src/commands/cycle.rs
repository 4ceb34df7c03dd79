use anyhow::{Context, Result};
use tc_core::{IngestionResult, IngestionStatus};
use tc_ingest::{DailyTimer, IngestError, IngestResult};
use tc_web::{start_server, AppState};
use tracing::{error, info, warn};

use super::build_scheduler;
use crate::config::Config;

/// Process exit status for one cycle: 0 stored, 1 failed, 2 already running
pub fn exit_status(outcome: &IngestResult<IngestionResult>) -> u8 {
  match outcome {
    Ok(result) => match result.status {
      IngestionStatus::Success | IngestionStatus::Partial => 0,
      IngestionStatus::Failure => 1,
    },
    Err(IngestError::CycleInProgress) => 2,
    Err(_) => 1,
  }
}

/// Run exactly one cycle
pub async fn run_once(config: &Config) -> Result<u8> {
  let scheduler = build_scheduler(config).await?;
  let outcome = scheduler.run_cycle().await;

  match &outcome {
    Ok(result) if result.status == IngestionStatus::Failure => {
      error!("Cycle {} failed: {}", result.fetched_at, result.summary())
    }
    Ok(result) => info!("Cycle {} {}: {}", result.fetched_at, result.status, result.summary()),
    Err(e) => warn!("Cycle not run: {}", e),
  }
  Ok(exit_status(&outcome))
}

/// Fire a cycle every day at the configured time, optionally serving the API
pub async fn schedule(config: &Config, serve: bool) -> Result<()> {
  let scheduler = build_scheduler(config).await?;
  let timer = DailyTimer::new(scheduler.clone(), &config.core.schedule)
    .context("Invalid schedule configuration")?;
  let shutdown = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!("Failed to listen for shutdown signal: {}", e);
      std::future::pending::<()>().await;
    }
  };

  if !serve {
    return timer.run_until(shutdown).await.context("Daily timer stopped unexpectedly");
  }

  let state = AppState::new(scheduler);
  tokio::select! {
    res = timer.run_until(shutdown) => res.context("Daily timer stopped unexpectedly"),
    res = start_server(state, &config.bind_addr) => res.context("HTTP server failed"),
  }
}

/// Serve the API only; cycles run on demand through the refresh endpoint
pub async fn serve(config: &Config) -> Result<()> {
  let scheduler = build_scheduler(config).await?;
  start_server(AppState::new(scheduler), &config.bind_addr)
    .await
    .with_context(|| format!("HTTP server on {} failed", config.bind_addr))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use tc_core::FailureKind;

  #[test]
  fn test_exit_status() {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

    let stored = IngestionResult::success(ts, Vec::new(), 0);
    assert_eq!(exit_status(&Ok(stored.clone())), 0);

    let mut partial = stored;
    partial.record_prune_failure("lock timeout");
    assert_eq!(exit_status(&Ok(partial)), 0);

    let failed = IngestionResult::failure(ts, FailureKind::TransientFetch, "HTTP 503", 0);
    assert_eq!(exit_status(&Ok(failed)), 1);

    assert_eq!(exit_status(&Err(IngestError::CycleInProgress)), 2);
    assert_eq!(exit_status(&Err(IngestError::ConfigurationError("bad".to_string()))), 1);
  }
}
