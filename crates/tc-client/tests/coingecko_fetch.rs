//! End-to-end fetch behaviour against a mock CoinGecko server

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tc_client::{CoinGeckoClient, FetchError, MarketDataSource};
use tc_core::ProviderConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_config(server: &MockServer) -> ProviderConfig {
  ProviderConfig {
    base_url: server.uri(),
    retry_base_ms: 5,
    min_call_interval_ms: 0,
    max_attempts: 3,
    ..Default::default()
  }
}

fn market_coin(rank: u32) -> Value {
  json!({
    "id": format!("coin-{}", rank),
    "symbol": format!("c{}", rank),
    "name": format!("Coin {}", rank),
    "current_price": 100.0 / rank as f64,
    "market_cap": 1.0e12 / rank as f64,
    "market_cap_rank": rank,
    "total_volume": 1.0e9,
    "price_change_percentage_24h": rank as f64 - 5.0
  })
}

fn top_ten() -> Value {
  Value::Array((1..=10).map(market_coin).collect())
}

#[tokio::test]
async fn test_fetch_top_ten_valid_records() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .and(query_param("vs_currency", "usd"))
    .and(query_param("per_page", "10"))
    .respond_with(ResponseTemplate::new(200).set_body_json(top_ten()))
    .expect(1)
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let fetched = client.fetch_top(10).await.unwrap();

  assert_eq!(fetched.records.len(), 10);
  assert_eq!(fetched.dropped, 0);
  assert_eq!(fetched.records[0].coin_id, "coin-1");
  assert_eq!(fetched.records[0].symbol, "C1");
  assert_eq!(fetched.records[9].provider_rank, Some(10));
}

#[tokio::test]
async fn test_three_valid_seven_malformed() {
  let server = MockServer::start().await;
  let mut items: Vec<Value> = (1..=3).map(market_coin).collect();
  items.extend((0..7).map(|i| json!({"id": format!("broken-{}", i), "current_price": null})));

  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(items)))
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let fetched = client.fetch_top(10).await.unwrap();

  assert_eq!(fetched.records.len(), 3);
  assert_eq!(fetched.dropped, 7);
}

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(503))
    .up_to_n_times(2)
    .expect(2)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(top_ten()))
    .expect(1)
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let fetched = client.fetch_top(10).await.unwrap();
  assert_eq!(fetched.records.len(), 10);
}

#[tokio::test]
async fn test_rate_limited_response_is_retried() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(429))
    .up_to_n_times(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(top_ten()))
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  assert!(client.fetch_top(10).await.is_ok());
}

#[tokio::test]
async fn test_exhausted_retries_surface_as_transient() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(502))
    .expect(3)
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let err = client.fetch_top(10).await.unwrap_err();

  match err {
    FetchError::Transient { attempts, reason } => {
      assert_eq!(attempts, 3);
      assert!(reason.contains("502"));
    }
    other => panic!("Expected Transient error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_request_timeouts_are_retried() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(top_ten()).set_delay(Duration::from_millis(500)),
    )
    .expect(3)
    .mount(&server)
    .await;

  let client =
    CoinGeckoClient::with_request_timeout(&provider_config(&server), Duration::from_millis(50))
      .unwrap();
  let err = client.fetch_top(10).await.unwrap_err();
  assert!(matches!(err, FetchError::Transient { attempts: 3, .. }));
}

#[tokio::test]
async fn test_client_errors_are_terminal() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(404))
    .expect(1)
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let err = client.fetch_top(10).await.unwrap_err();
  assert_eq!(err, FetchError::Terminal("HTTP 404 Not Found".to_string()));
}

#[tokio::test]
async fn test_unauthorized_is_auth_failure() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .and(query_param("x_cg_demo_api_key", "bad-key"))
    .respond_with(ResponseTemplate::new(401))
    .expect(1)
    .mount(&server)
    .await;

  let mut config = provider_config(&server);
  config.api_key = Some("bad-key".to_string());
  let client = CoinGeckoClient::new(&config).unwrap();

  assert!(matches!(client.fetch_top(10).await, Err(FetchError::Auth(_))));
}

#[tokio::test]
async fn test_malformed_payload_is_not_retried() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
    .expect(1)
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  assert!(matches!(client.fetch_top(10).await, Err(FetchError::MalformedPayload(_))));
}

#[tokio::test]
async fn test_object_payload_is_malformed() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"status": {"error_code": 10002}})),
    )
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  let err = client.fetch_top(10).await.unwrap_err();
  assert!(matches!(err, FetchError::MalformedPayload(ref m) if m.contains("an object")));
}

#[tokio::test]
async fn test_all_invalid_records_is_empty_result() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "x"}, {"id": "y"}])))
    .mount(&server)
    .await;

  let client = CoinGeckoClient::new(&provider_config(&server)).unwrap();
  assert_eq!(client.fetch_top(10).await, Err(FetchError::EmptyResult { dropped: 2 }));
}

#[tokio::test]
async fn test_shared_rate_limiter_spaces_calls() {
  use governor::{Quota, RateLimiter};

  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/coins/markets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(top_ten()))
    .expect(2)
    .mount(&server)
    .await;

  let limiter = Arc::new(RateLimiter::direct(
    Quota::with_period(Duration::from_millis(200)).unwrap(),
  ));
  let client = CoinGeckoClient::with_rate_limiter(&provider_config(&server), limiter).unwrap();

  let started = std::time::Instant::now();
  client.fetch_top(10).await.unwrap();
  client.fetch_top(10).await.unwrap();
  assert!(started.elapsed() >= Duration::from_millis(150));
}
