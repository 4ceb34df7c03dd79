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

//! HTTP transport layer for market data requests

use crate::error::{FetchError, FetchResult};
use governor::{
  clock::DefaultClock,
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
  Quota, RateLimiter,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tc_core::ProviderConfig;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub type CallLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Result of one network attempt
#[derive(Debug)]
enum AttemptError {
  /// Timeouts, connection failures, 429 and 5xx
  Retryable(String),
  /// Everything retrying cannot fix
  Terminal(FetchError),
}

/// HTTP transport with bounded retries and call spacing
pub struct Transport {
  client: Client,
  timeout: Duration,
  max_attempts: u32,
  retry_base: Duration,
  limiter: Option<Arc<CallLimiter>>,
}

impl Transport {
  /// Create a new transport instance
  pub fn new(config: &ProviderConfig) -> FetchResult<Self> {
    let client = Client::builder()
      .user_agent(concat!("tc-client/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| FetchError::Client(format!("Failed to create HTTP client: {}", e)))?;

    let limiter = Quota::with_period(Duration::from_millis(config.min_call_interval_ms))
      .map(|quota| Arc::new(RateLimiter::direct(quota)));

    Ok(Self {
      client,
      timeout: Duration::from_secs(config.timeout_secs),
      max_attempts: config.max_attempts.max(1),
      retry_base: Duration::from_millis(config.retry_base_ms),
      limiter,
    })
  }

  /// Share a limiter with other transports in the same process
  pub fn with_limiter(mut self, limiter: Arc<CallLimiter>) -> Self {
    self.limiter = Some(limiter);
    self
  }

  /// Override the per-request timeout
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// GET `url` and deserialize the JSON body.
  ///
  /// Retryable failures are attempted up to `max_attempts` times with a delay
  /// of `retry_base * 2^(attempt - 1)` between attempts. Terminal failures
  /// return immediately.
  #[instrument(skip(self, url), fields(path = %url.path()))]
  pub async fn get_json<T>(&self, url: &Url) -> FetchResult<T>
  where
    T: DeserializeOwned,
  {
    let mut attempt: u32 = 0;
    let mut last_error = None;

    while attempt < self.max_attempts {
      if attempt > 0 {
        let delay = self.backoff_delay(attempt);
        warn!("Retrying request in {}ms (attempt {})", delay.as_millis(), attempt + 1);
        tokio::time::sleep(delay).await;
      }
      attempt += 1;

      match self.attempt(url).await {
        Ok(text) => {
          debug!("Response body length: {} bytes", text.len());
          return serde_json::from_str::<T>(&text).map_err(|e| {
            error!("Failed to parse JSON response: {}", e);
            FetchError::MalformedPayload(format!(
              "{}. Response: {}",
              e,
              &text[..floor_char_boundary(&text, 200)]
            ))
          });
        }
        Err(AttemptError::Retryable(reason)) => {
          warn!("Request failed (attempt {}): {}", attempt, reason);
          last_error = Some(reason);
        }
        Err(AttemptError::Terminal(e)) => {
          error!("Request failed with terminal error: {}", e);
          return Err(e);
        }
      }
    }

    Err(FetchError::Transient {
      attempts: attempt,
      reason: last_error.unwrap_or_else(|| "Max attempts exceeded".to_string()),
    })
  }

  /// Delay before the attempt following `completed` attempts
  pub fn backoff_delay(&self, completed: u32) -> Duration {
    let exponent = completed.saturating_sub(1).min(16);
    self.retry_base.saturating_mul(1u32 << exponent)
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Get request timeout duration
  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  async fn attempt(&self, url: &Url) -> Result<String, AttemptError> {
    if let Some(limiter) = &self.limiter {
      limiter.until_ready().await;
    }

    let response = self
      .client
      .get(url.clone())
      .timeout(self.timeout)
      .header("accept", "application/json")
      .send()
      .await
      .map_err(|e| AttemptError::Retryable(describe_reqwest_error(&e)))?;

    let status = response.status();
    if let Some(err) = classify_status(status) {
      return Err(err);
    }

    info!("Request successful with status: {}", status);
    response
      .text()
      .await
      .map_err(|e| AttemptError::Retryable(format!("Failed to read response body: {}", e)))
  }
}

fn classify_status(status: StatusCode) -> Option<AttemptError> {
  if status.is_success() {
    return None;
  }
  let err = match status {
    StatusCode::TOO_MANY_REQUESTS => {
      AttemptError::Retryable(format!("HTTP {} (rate limited)", status))
    }
    s if s.is_server_error() => AttemptError::Retryable(format!("HTTP {}", s)),
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      AttemptError::Terminal(FetchError::Auth(format!("HTTP {}", status)))
    }
    s => AttemptError::Terminal(FetchError::Terminal(format!("HTTP {}", s))),
  };
  Some(err)
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
  if e.is_timeout() {
    format!("Request timed out: {}", e)
  } else if e.is_connect() {
    format!("Connection failed: {}", e)
  } else {
    format!("Request failed: {}", e)
  }
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
  let mut end = max.min(text.len());
  while !text.is_char_boundary(end) {
    end -= 1;
  }
  end
}

#[cfg(test)]
mod tests {
  use super::*;

  fn transport(base_ms: u64) -> Transport {
    let config =
      ProviderConfig { retry_base_ms: base_ms, min_call_interval_ms: 0, ..Default::default() };
    Transport::new(&config).unwrap()
  }

  #[test]
  fn test_backoff_doubles() {
    let transport = transport(500);
    assert_eq!(transport.backoff_delay(1), Duration::from_millis(500));
    assert_eq!(transport.backoff_delay(2), Duration::from_millis(1000));
    assert_eq!(transport.backoff_delay(3), Duration::from_millis(2000));
  }

  #[test]
  fn test_zero_interval_disables_limiter() {
    let transport = transport(1);
    assert!(transport.limiter.is_none());
    assert_eq!(transport.max_attempts(), 3);
  }

  #[test]
  fn test_classify_status() {
    assert!(classify_status(StatusCode::OK).is_none());
    assert!(matches!(
      classify_status(StatusCode::TOO_MANY_REQUESTS),
      Some(AttemptError::Retryable(_))
    ));
    assert!(matches!(
      classify_status(StatusCode::BAD_GATEWAY),
      Some(AttemptError::Retryable(_))
    ));
    assert!(matches!(
      classify_status(StatusCode::UNAUTHORIZED),
      Some(AttemptError::Terminal(FetchError::Auth(_)))
    ));
    assert!(matches!(
      classify_status(StatusCode::NOT_FOUND),
      Some(AttemptError::Terminal(FetchError::Terminal(_)))
    ));
  }

  #[test]
  fn test_floor_char_boundary() {
    let text = "ab€cd";
    assert_eq!(floor_char_boundary(text, 3), 2);
    assert_eq!(floor_char_boundary(text, 100), text.len());
  }
}
