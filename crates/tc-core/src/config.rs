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

//! Configuration management for the snapshot pipeline
//!
//! Every setting is read from the environment (a `.env` file is honoured via
//! `dotenvy`). Unset values fall back to the defaults below; values that are set
//! but unparsable are reported as [`Error::Config`].

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Market data provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
  /// Optional CoinGecko API key (`CG-` prefixed keys use the pro endpoint)
  pub api_key: Option<String>,

  /// Base URL for the CoinGecko API
  pub base_url: String,

  /// Per-request timeout in seconds
  pub timeout_secs: u64,

  /// Maximum attempts per logical fetch, including the first
  pub max_attempts: u32,

  /// Base retry delay in milliseconds, doubled on each further attempt
  pub retry_base_ms: u64,

  /// Minimum spacing between provider calls in milliseconds
  pub min_call_interval_ms: u64,

  /// Number of coins requested per cycle (1..=10)
  pub top_n: usize,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: crate::COINGECKO_BASE_URL.to_string(),
      timeout_secs: 10,
      max_attempts: 3,
      retry_base_ms: 500,
      min_call_interval_ms: 2000,
      top_n: crate::TOP_N,
    }
  }
}

/// Ingestion cycle settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
  /// Total fetch budget per cycle in seconds, retries included
  pub cycle_timeout_secs: u64,

  /// Upper bound on the storage write in seconds
  pub store_timeout_secs: u64,

  /// Snapshot retention window in days
  pub retention_days: i64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      cycle_timeout_secs: 30,
      store_timeout_secs: 15,
      retention_days: crate::DEFAULT_RETENTION_DAYS,
    }
  }
}

/// Notification transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
  /// When false, reports are only logged
  pub enabled: bool,
  pub smtp_host: Option<String>,
  pub smtp_port: u16,
  pub username: Option<String>,
  #[serde(skip_serializing)]
  pub password: Option<String>,
  pub from: Option<String>,
  pub to: Option<String>,
}

impl Default for MailConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      smtp_host: None,
      smtp_port: 587,
      username: None,
      password: None,
      from: None,
      to: None,
    }
  }
}

/// Daily trigger time, local wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleConfig {
  pub hour: u32,
  pub minute: u32,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self { hour: 9, minute: 0 }
  }
}

/// Main configuration struct
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
  pub provider: ProviderConfig,
  pub pipeline: PipelineConfig,
  pub mail: MailConfig,
  pub schedule: ScheduleConfig,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Load configuration from an arbitrary key lookup
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let provider_defaults = ProviderConfig::default();
    let pipeline_defaults = PipelineConfig::default();
    let schedule_defaults = ScheduleConfig::default();

    let api_key = lookup("COINGECKO_API_KEY").filter(|k| !k.trim().is_empty());

    let provider = ProviderConfig {
      api_key,
      base_url: lookup("COINGECKO_BASE_URL").unwrap_or(provider_defaults.base_url),
      timeout_secs: parse_or(&lookup, "TC_TIMEOUT_SECS", provider_defaults.timeout_secs)?,
      max_attempts: parse_or(&lookup, "TC_MAX_ATTEMPTS", provider_defaults.max_attempts)?,
      retry_base_ms: parse_or(&lookup, "TC_RETRY_BASE_MS", provider_defaults.retry_base_ms)?,
      min_call_interval_ms: parse_or(
        &lookup,
        "TC_MIN_CALL_INTERVAL_MS",
        provider_defaults.min_call_interval_ms,
      )?,
      top_n: parse_or(&lookup, "TOP_N", provider_defaults.top_n)?,
    };

    let pipeline = PipelineConfig {
      cycle_timeout_secs: parse_or(
        &lookup,
        "TC_CYCLE_TIMEOUT_SECS",
        pipeline_defaults.cycle_timeout_secs,
      )?,
      store_timeout_secs: parse_or(
        &lookup,
        "TC_STORE_TIMEOUT_SECS",
        pipeline_defaults.store_timeout_secs,
      )?,
      retention_days: parse_or(&lookup, "DATA_RETENTION_DAYS", pipeline_defaults.retention_days)?,
    };

    let mail = MailConfig {
      enabled: parse_flag(&lookup, "ENABLE_EMAIL_NOTIFICATIONS", true)?,
      smtp_host: lookup("SMTP_HOST"),
      smtp_port: parse_or(&lookup, "SMTP_PORT", 587)?,
      username: lookup("SMTP_USERNAME"),
      password: lookup("SMTP_PASSWORD"),
      from: lookup("MAIL_FROM"),
      to: lookup("MAIL_TO"),
    };

    let schedule = ScheduleConfig {
      hour: parse_or(&lookup, "UPDATE_SCHEDULE_HOUR", schedule_defaults.hour)?,
      minute: parse_or(&lookup, "UPDATE_SCHEDULE_MINUTE", schedule_defaults.minute)?,
    };

    let config = Config { provider, pipeline, mail, schedule };
    config.validate()?;
    Ok(config)
  }

  /// Check cross-field constraints
  pub fn validate(&self) -> Result<()> {
    if self.provider.top_n == 0 || self.provider.top_n > crate::TOP_N {
      return Err(Error::Config(format!("TOP_N must be between 1 and {}", crate::TOP_N)));
    }
    if self.provider.max_attempts == 0 {
      return Err(Error::Config("TC_MAX_ATTEMPTS must be at least 1".to_string()));
    }
    if self.pipeline.retention_days <= 0
      || self.pipeline.retention_days > crate::MAX_RETENTION_DAYS
    {
      return Err(Error::Config(format!(
        "DATA_RETENTION_DAYS must be between 1 and {}",
        crate::MAX_RETENTION_DAYS
      )));
    }
    if self.schedule.hour > 23 || self.schedule.minute > 59 {
      return Err(Error::Config(format!(
        "Invalid schedule time {:02}:{:02}",
        self.schedule.hour, self.schedule.minute
      )));
    }
    if self.mail.enabled {
      for (key, value) in [
        ("SMTP_HOST", &self.mail.smtp_host),
        ("MAIL_FROM", &self.mail.from),
        ("MAIL_TO", &self.mail.to),
      ] {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
          return Err(Error::MissingSetting(format!(
            "{} (or set ENABLE_EMAIL_NOTIFICATIONS=false)",
            key
          )));
        }
      }
    }
    Ok(())
  }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
  F: Fn(&str) -> Option<String>,
  T: FromStr,
{
  match lookup(key) {
    Some(raw) => raw.trim().parse().map_err(|_| Error::Config(format!("Invalid {}", key))),
    None => Ok(default),
  }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
  F: Fn(&str) -> Option<String>,
{
  match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
    None => Ok(default),
    Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
    Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
    Some(_) => Err(Error::Config(format!("Invalid {}", key))),
  }
}
