use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tc_client::FetchError;
use tc_database_postgres::{InMemorySnapshotRepository, SnapshotRepository};
use tc_ingest::testing::{sample_records, RecordingMailer, StaticSource};
use tc_ingest::{CycleSettings, IngestionScheduler, ReportDispatcher};
use tc_web::{configure, AppState};

struct Harness {
  state: AppState,
  store: Arc<InMemorySnapshotRepository>,
  mailer: Arc<RecordingMailer>,
}

fn harness(source: StaticSource) -> Harness {
  let store = Arc::new(InMemorySnapshotRepository::new());
  let mailer = Arc::new(RecordingMailer::new());
  let dispatcher = Arc::new(ReportDispatcher::new(mailer.clone(), "ops@example.com"));
  let scheduler = IngestionScheduler::new(
    Arc::new(source),
    store.clone(),
    dispatcher,
    CycleSettings::default(),
  );
  Harness { state: AppState::new(Arc::new(scheduler)), store, mailer }
}

macro_rules! app {
  ($state:expr) => {
    test::init_service(App::new().app_data(web::Data::new($state.clone())).configure(configure))
      .await
  };
}

#[actix_web::test]
async fn test_health() {
  let h = harness(StaticSource::healthy(10));
  let app = app!(h.state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_crypto_data_empty_store() {
  let h = harness(StaticSource::healthy(10));
  let app = app!(h.state);

  let req = test::TestRequest::get().uri("/api/crypto-data").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;

  assert_eq!(body["status"], "success");
  assert!(body["fetched_at"].is_null());
  assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn test_refresh_then_read_latest() {
  let h = harness(StaticSource::healthy(10));
  let app = app!(h.state);

  let req = test::TestRequest::post().uri("/api/refresh").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "success");
  assert_eq!(body["coins_stored"], 10);
  assert!(body["failure_kind"].is_null());

  let req = test::TestRequest::get().uri("/api/crypto-data").to_request();
  let latest: Value = test::call_and_read_body_json(&app, req).await;
  let data = latest["data"].as_array().cloned().unwrap_or_default();
  assert_eq!(data.len(), 10);
  assert_eq!(data[0]["coin_id"], "coin-1");
  assert_eq!(data[0]["rank"], 1);
  assert_eq!(data[9]["rank"], 10);
  assert_eq!(latest["fetched_at"], body["fetched_at"]);

  assert_eq!(h.mailer.sent().len(), 1);
}

#[actix_web::test]
async fn test_refresh_failure_is_bad_gateway() {
  let source = StaticSource::new(vec![Err(FetchError::Auth("HTTP 401".to_string()))]);
  let h = harness(source);
  let app = app!(h.state);

  let req = test::TestRequest::get().uri("/api/refresh").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "failure");
  assert_eq!(body["failure_kind"], "auth");
  assert_eq!(h.store.row_count(), 0);
}

#[actix_web::test]
async fn test_refresh_while_running_is_conflict() {
  let h = harness(StaticSource::healthy(10).with_delay(Duration::from_millis(300)));
  let app = app!(h.state);

  let running = {
    let scheduler = Arc::clone(&h.state.scheduler);
    actix_web::rt::spawn(async move { scheduler.run_cycle().await })
  };
  actix_web::rt::time::sleep(Duration::from_millis(50)).await;

  let req = test::TestRequest::post().uri("/api/refresh").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "already-in-progress");

  assert!(running.await.unwrap().is_ok());
  assert_eq!(h.store.cycles().len(), 1);
}

#[actix_web::test]
async fn test_last_update() {
  let h = harness(StaticSource::healthy(3));
  let app = app!(h.state);

  let req = test::TestRequest::get().uri("/api/last-update").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert!(body.is_null());

  h.state.scheduler.run_cycle().await.unwrap();

  let req = test::TestRequest::get().uri("/api/last-update").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["status"], "success");
  assert_eq!(body["coins_stored"], 3);
  assert_eq!(body["notification_sent"], true);
}

#[actix_web::test]
async fn test_coin_history_window() {
  let h = harness(StaticSource::healthy(10));
  let app = app!(h.state);

  let old_at = Utc::now() - TimeDelta::days(10);
  let old = tc_core::rank_records(old_at, sample_records(10), 10).0;
  h.store.upsert(old_at, &old).await.unwrap();
  h.state.scheduler.run_cycle().await.unwrap();

  let req = test::TestRequest::get().uri("/api/coins/coin-2/history").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["days"], 7);
  assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

  let req = test::TestRequest::get().uri("/api/coins/coin-2/history?days=90").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["days"], 30);
  let data = body["data"].as_array().cloned().unwrap_or_default();
  assert_eq!(data.len(), 2);
  assert!(data.iter().all(|row| row["coin_id"] == "coin-2"));

  let req = test::TestRequest::get().uri("/api/coins/coin-2/history?days=0").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
