//! Test doubles for the ingestion cycle

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tc_client::{FetchError, FetchResult, FetchedCoins, MarketDataSource};
use tc_core::RawCoinRecord;

use crate::error::{NotificationError, NotificationResult};
use crate::notify::{MailTransport, Report};

/// `count` well-formed records in market cap order
pub fn sample_records(count: u32) -> Vec<RawCoinRecord> {
  (1..=count)
    .map(|rank| RawCoinRecord {
      coin_id: format!("coin-{}", rank),
      symbol: format!("C{}", rank),
      name: format!("Coin {}", rank),
      price_usd: BigDecimal::from(10_000 / rank),
      market_cap_usd: BigDecimal::from(1_000_000_000u64 / rank as u64),
      volume_24h_usd: Some(BigDecimal::from(25_000)),
      change_24h_pct: Some(BigDecimal::from(rank as i32 - 4)),
      provider_rank: Some(rank),
    })
    .collect()
}

/// Market data source replaying canned responses.
///
/// Responses are served in order; the last one repeats once the queue is
/// down to a single entry.
pub struct StaticSource {
  responses: Mutex<VecDeque<FetchResult<FetchedCoins>>>,
  delay: Option<Duration>,
  calls: AtomicUsize,
}

impl StaticSource {
  pub fn new(responses: Vec<FetchResult<FetchedCoins>>) -> Self {
    Self { responses: Mutex::new(responses.into()), delay: None, calls: AtomicUsize::new(0) }
  }

  /// Always returns `count` valid records
  pub fn healthy(count: u32) -> Self {
    Self::new(vec![Ok(FetchedCoins { records: sample_records(count), dropped: 0 })])
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn next_response(&self) -> FetchResult<FetchedCoins> {
    let mut responses = match self.responses.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    match responses.len() {
      0 => Err(FetchError::Client("no canned response".to_string())),
      1 => responses[0].clone(),
      _ => responses.pop_front().unwrap_or_else(|| Err(FetchError::Client("empty".to_string()))),
    }
  }
}

#[async_trait]
impl MarketDataSource for StaticSource {
  async fn fetch_top(&self, limit: usize) -> FetchResult<FetchedCoins> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.next_response().map(|mut fetched| {
      fetched.records.truncate(limit);
      fetched
    })
  }

  fn source_name(&self) -> &'static str {
    "static"
  }
}

/// Mail transport that keeps every report it is asked to send
#[derive(Default)]
pub struct RecordingMailer {
  sent: Mutex<Vec<Report>>,
  attempts: AtomicUsize,
  fail: AtomicBool,
}

impl RecordingMailer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every send fails with a transport error
  pub fn failing() -> Self {
    let mailer = Self::default();
    mailer.fail.store(true, Ordering::SeqCst);
    mailer
  }

  pub fn sent(&self) -> Vec<Report> {
    match self.sent.lock() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl MailTransport for RecordingMailer {
  async fn send(&self, report: &Report) -> NotificationResult<()> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if self.fail.load(Ordering::SeqCst) {
      return Err(NotificationError::TransportError("relay unavailable".to_string()));
    }
    match self.sent.lock() {
      Ok(mut guard) => guard.push(report.clone()),
      Err(poisoned) => poisoned.into_inner().push(report.clone()),
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "recording"
  }
}
