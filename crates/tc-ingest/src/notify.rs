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

//! Report delivery for finished cycles.
//!
//! [`ReportDispatcher::send_report`] turns an [`IngestionResult`] into a plain
//! text [`Report`] and hands it to a [`MailTransport`] exactly once. There is
//! no retry here; the caller logs the error and moves on.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tc_core::{CoinSnapshot, IngestionResult, IngestionStatus, MailConfig};
use tracing::{error, info, instrument};

use crate::error::{NotificationError, NotificationResult};

const SMTP_TIMEOUT_SECS: u64 = 30;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub subject: String,
  pub body: String,
  /// One address or a comma separated list
  pub recipient: String,
}

/// Delivers one report per call
#[async_trait]
pub trait MailTransport: Send + Sync {
  async fn send(&self, report: &Report) -> NotificationResult<()>;

  fn name(&self) -> &'static str;
}

/// SMTP delivery over a STARTTLS relay
pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from: Mailbox,
}

impl SmtpMailer {
  pub fn from_config(config: &MailConfig) -> NotificationResult<Self> {
    let host = config.smtp_host.as_deref().ok_or_else(|| {
      NotificationError::TransportError("SMTP_HOST is required for email delivery".to_string())
    })?;
    let from = config.from.as_deref().ok_or_else(|| NotificationError::InvalidAddress {
      address: String::new(),
      reason: "MAIL_FROM is not set".to_string(),
    })?;

    let mut builder =
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(config.smtp_port);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
      builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(Self {
      transport: builder.timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS))).build(),
      from: parse_mailbox(from)?,
    })
  }
}

#[async_trait]
impl MailTransport for SmtpMailer {
  async fn send(&self, report: &Report) -> NotificationResult<()> {
    let mut builder = Message::builder()
      .from(self.from.clone())
      .subject(report.subject.as_str())
      .header(ContentType::TEXT_PLAIN);
    for address in report.recipient.split(',').map(str::trim).filter(|a| !a.is_empty()) {
      builder = builder.to(parse_mailbox(address)?);
    }
    let message = builder.body(report.body.clone())?;

    self.transport.send(message).await?;
    Ok(())
  }

  fn name(&self) -> &'static str {
    "smtp"
  }
}

fn parse_mailbox(address: &str) -> NotificationResult<Mailbox> {
  address.parse::<Mailbox>().map_err(|e| NotificationError::InvalidAddress {
    address: address.to_string(),
    reason: e.to_string(),
  })
}

/// Writes reports to the log instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyMailer;

#[async_trait]
impl MailTransport for LogOnlyMailer {
  async fn send(&self, report: &Report) -> NotificationResult<()> {
    info!("Email notifications disabled; report '{}':\n{}", report.subject, report.body);
    Ok(())
  }

  fn name(&self) -> &'static str {
    "log"
  }
}

/// Builds and sends cycle reports
pub struct ReportDispatcher {
  transport: Arc<dyn MailTransport>,
  recipient: String,
}

impl ReportDispatcher {
  pub fn new(transport: Arc<dyn MailTransport>, recipient: impl Into<String>) -> Self {
    Self { transport, recipient: recipient.into() }
  }

  /// SMTP when notifications are enabled, log-only otherwise
  pub fn from_config(config: &MailConfig) -> NotificationResult<Self> {
    let recipient = config.to.clone().unwrap_or_default();
    if config.enabled {
      Ok(Self::new(Arc::new(SmtpMailer::from_config(config)?), recipient))
    } else {
      Ok(Self::new(Arc::new(LogOnlyMailer), recipient))
    }
  }

  pub fn transport_name(&self) -> &'static str {
    self.transport.name()
  }

  pub fn build_report(&self, result: &IngestionResult) -> Report {
    let (subject, body) = match result.status {
      IngestionStatus::Success | IngestionStatus::Partial => {
        (success_subject(result), success_body(result))
      }
      IngestionStatus::Failure => (failure_subject(result), failure_body(result)),
    };
    Report { subject, body, recipient: self.recipient.clone() }
  }

  /// Exactly one transport call per invocation
  #[instrument(
    skip(self, result),
    fields(status = %result.status, transport = self.transport.name())
  )]
  pub async fn send_report(&self, result: &IngestionResult) -> NotificationResult<()> {
    let report = self.build_report(result);
    match self.transport.send(&report).await {
      Ok(()) => {
        info!("Sent report '{}'", report.subject);
        Ok(())
      }
      Err(e) => {
        error!("Failed to send report '{}': {}", report.subject, e);
        Err(e)
      }
    }
  }
}

pub fn success_subject(result: &IngestionResult) -> String {
  format!("Daily Crypto Dashboard - Top 10 - {}", result.fetched_at.format("%Y-%m-%d"))
}

pub fn failure_subject(result: &IngestionResult) -> String {
  format!("Crypto Dashboard Error - {}", result.fetched_at.format("%Y-%m-%d %H:%M:%S"))
}

fn success_body(result: &IngestionResult) -> String {
  let mut body = String::new();
  let _ = writeln!(body, "Top cryptocurrencies by market cap");
  let _ = writeln!(body, "Captured at: {}", result.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
  let _ = writeln!(body, "Status: {}", result.status);
  let _ = writeln!(body, "Coins stored: {}", result.coins_stored);
  let _ = writeln!(body, "Records dropped: {}", result.records_dropped);
  match result.top_mover() {
    Some(coin) => {
      let _ = writeln!(
        body,
        "Top mover (24h): {} ({}) {}",
        coin.name,
        coin.symbol,
        signed_pct(coin.change_24h_pct.as_ref())
      );
    }
    None => {
      let _ = writeln!(body, "Top mover (24h): n/a");
    }
  }
  if let Some(prune_error) = &result.prune_error {
    let _ = writeln!(body, "Warning: pruning old snapshots failed: {}", prune_error);
  }

  let _ = writeln!(body);
  body.push_str(&ranking_table(&result.snapshot));
  body
}

/// Plain text ranking table, one line per coin
pub fn ranking_table(rows: &[CoinSnapshot]) -> String {
  let mut table = format!(
    "{:>4}  {:<8} {:<20} {:>16} {:>20} {:>9}\n",
    "Rank", "Symbol", "Name", "Price (USD)", "Market Cap (USD)", "24h"
  );
  for coin in rows {
    let _ = writeln!(table, "{}", table_row(coin));
  }
  table
}

fn failure_body(result: &IngestionResult) -> String {
  let mut body = String::new();
  let _ = writeln!(body, "The crypto dashboard ingestion cycle failed.");
  let _ = writeln!(body);
  let _ = writeln!(body, "Cycle: {}", result.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
  if let Some(failure) = &result.failure {
    let _ = writeln!(body, "Failure: {}", failure.kind);
    let _ = writeln!(body, "Detail: {}", failure.detail);
  }
  let _ = writeln!(body, "Records dropped: {}", result.records_dropped);
  let _ = writeln!(body, "No snapshot was stored; the previous snapshot remains current.");
  body
}

fn table_row(coin: &CoinSnapshot) -> String {
  format!(
    "{:>4}  {:<8} {:<20} {:>16} {:>20} {:>9}",
    coin.rank,
    coin.symbol,
    coin.name,
    coin.price_usd.with_scale(2).to_string(),
    coin.market_cap_usd.with_scale(0).to_string(),
    signed_pct(coin.change_24h_pct.as_ref())
  )
}

fn signed_pct(value: Option<&BigDecimal>) -> String {
  match value {
    Some(v) if *v >= BigDecimal::zero() => format!("+{}%", v.with_scale(2)),
    Some(v) => format!("{}%", v.with_scale(2)),
    None => "n/a".to_string(),
  }
}
