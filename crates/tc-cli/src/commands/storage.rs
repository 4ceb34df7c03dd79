use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tc_database_postgres::SnapshotRepository;
use tc_ingest::ranking_table;

use super::connect;
use crate::config::Config;

/// Print the latest stored cycle as a ranking table
pub async fn latest(config: &Config) -> Result<()> {
  let repo = connect(config)?.snapshot_repository();
  let rows = repo.latest_snapshot().await.context("Failed to load latest snapshot")?;

  match rows.first() {
    None => println!("No snapshots stored yet"),
    Some(first) => {
      println!("Cycle {}", first.fetched_at.format("%Y-%m-%d %H:%M:%S%.6f UTC"));
      print!("{}", ranking_table(&rows));
    }
  }

  if let Some(run) = repo.last_run().await.context("Failed to load run log")? {
    println!(
      "Last run: {} at {} ({} coins, notification sent: {})",
      run.status, run.recorded_at, run.coins_stored, run.notification_sent
    );
  }
  Ok(())
}

/// Delete rows older than `days`; the latest cycle is always kept
pub async fn prune(config: &Config, days: Option<i64>) -> Result<()> {
  let days = days.unwrap_or(config.core.pipeline.retention_days);
  let cutoff = prune_cutoff(Utc::now(), days)?;
  let repo = connect(config)?.snapshot_repository();
  let removed = repo.prune_older_than(cutoff).await.context("Failed to prune snapshots")?;
  println!("Removed {} row(s) older than {}", removed, cutoff.format("%Y-%m-%d %H:%M:%S UTC"));
  Ok(())
}

fn prune_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
  if days <= 0 {
    bail!("--days must be positive");
  }
  match TimeDelta::try_days(days).and_then(|window| now.checked_sub_signed(window)) {
    Some(cutoff) => Ok(cutoff),
    None => bail!("--days {} reaches past the earliest representable date", days),
  }
}

pub async fn migrate(config: &Config) -> Result<()> {
  let applied = connect(config)?.run_migrations().await.context("Failed to run migrations")?;
  if applied.is_empty() {
    println!("Database schema is up to date");
  }
  for version in applied {
    println!("Applied {}", version);
  }
  Ok(())
}
