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

//! Request handlers for the dashboard API

use actix_web::{web, HttpResponse};
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tc_core::{IngestionResult, IngestionStatus};
use tc_database_postgres::SnapshotRepository;
use tc_ingest::{IngestError, IngestionScheduler};
use tracing::{error, info, warn};

use crate::error::{WebError, WebResult};

/// Default lookback for coin history
pub const DEFAULT_HISTORY_DAYS: i64 = 7;

/// Longest lookback served; matches the retention window
pub const MAX_HISTORY_DAYS: i64 = 30;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
  pub scheduler: Arc<IngestionScheduler>,
  pub store: Arc<dyn SnapshotRepository>,
}

impl AppState {
  /// Read endpoints use the scheduler's own store
  pub fn new(scheduler: Arc<IngestionScheduler>) -> Self {
    let store = Arc::clone(scheduler.store());
    Self { scheduler, store }
  }
}

pub async fn health() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

/// Latest stored cycle, ordered by rank
pub async fn crypto_data(state: web::Data<AppState>) -> WebResult<HttpResponse> {
  let rows = state.store.latest_snapshot().await.map_err(|e| {
    error!("Failed to load latest snapshot: {}", e);
    WebError::from(e)
  })?;
  let fetched_at = rows.first().map(|row| row.fetched_at);

  Ok(HttpResponse::Ok().json(json!({
    "status": "success",
    "fetched_at": fetched_at,
    "data": rows,
  })))
}

/// Run one cycle now and report how it went
pub async fn refresh(state: web::Data<AppState>) -> HttpResponse {
  match state.scheduler.run_cycle().await {
    Ok(result) => refresh_response(&result),
    Err(IngestError::CycleInProgress) => {
      info!("Manual refresh rejected: cycle already running");
      HttpResponse::Conflict().json(json!({
        "status": "already-in-progress",
        "message": IngestError::CycleInProgress.to_string(),
      }))
    }
    Err(e) => {
      error!("Manual refresh could not start: {}", e);
      HttpResponse::InternalServerError()
        .json(json!({ "status": "error", "message": e.to_string() }))
    }
  }
}

fn refresh_response(result: &IngestionResult) -> HttpResponse {
  let body = json!({
    "status": result.status.as_str(),
    "fetched_at": result.fetched_at,
    "coins_stored": result.coins_stored,
    "records_dropped": result.records_dropped,
    "rows_pruned": result.rows_pruned,
    "failure_kind": result.failure_kind().map(|kind| kind.as_str()),
    "message": result.summary(),
  });

  match result.status {
    IngestionStatus::Success | IngestionStatus::Partial => HttpResponse::Ok().json(body),
    IngestionStatus::Failure => {
      warn!("Manual refresh failed: {}", result.summary());
      HttpResponse::BadGateway().json(body)
    }
  }
}

/// Most recent entry in the run log, or `null`
pub async fn last_update(state: web::Data<AppState>) -> WebResult<HttpResponse> {
  let run = state.store.last_run().await?;
  Ok(HttpResponse::Ok().json(run))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
  days: Option<i64>,
}

pub async fn coin_history(
  state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<HistoryQuery>,
) -> WebResult<HttpResponse> {
  let coin_id = path.into_inner();
  let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
  if days <= 0 {
    return Err(WebError::BadRequest("days must be positive".to_string()));
  }
  let days = days.min(MAX_HISTORY_DAYS);

  let since = Utc::now() - TimeDelta::days(days);
  let rows = state.store.coin_history(&coin_id, since).await.map_err(|e| {
    error!("Failed to load history for {}: {}", coin_id, e);
    WebError::from(e)
  })?;

  Ok(HttpResponse::Ok().json(json!({
    "status": "success",
    "coin_id": coin_id,
    "days": days,
    "data": rows,
  })))
}
