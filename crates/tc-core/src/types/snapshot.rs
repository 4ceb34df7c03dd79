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

//! Snapshot rows and the invariants of a single ingestion cycle

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A provider record that passed payload validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCoinRecord {
  pub coin_id: String,
  pub symbol: String,
  pub name: String,
  pub price_usd: BigDecimal,
  pub market_cap_usd: BigDecimal,
  pub volume_24h_usd: Option<BigDecimal>,
  pub change_24h_pct: Option<BigDecimal>,
  /// Rank as reported by the provider; informational only
  pub provider_rank: Option<u32>,
}

/// One coin within one ingestion cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSnapshot {
  pub coin_id: String,
  pub rank: i32,
  pub symbol: String,
  pub name: String,
  pub price_usd: BigDecimal,
  pub market_cap_usd: BigDecimal,
  pub volume_24h_usd: Option<BigDecimal>,
  pub change_24h_pct: Option<BigDecimal>,
  pub fetched_at: DateTime<Utc>,
}

impl CoinSnapshot {
  pub fn from_record(record: RawCoinRecord, rank: i32, fetched_at: DateTime<Utc>) -> Self {
    Self {
      coin_id: record.coin_id,
      rank,
      symbol: record.symbol,
      name: record.name,
      price_usd: record.price_usd,
      market_cap_usd: record.market_cap_usd,
      volume_24h_usd: record.volume_24h_usd,
      change_24h_pct: record.change_24h_pct,
      fetched_at,
    }
  }
}

/// Ways a set of rows can fail to be a well-formed cycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotViolation {
  #[error("snapshot has no rows")]
  Empty,

  #[error("snapshot has {0} rows, at most {max} allowed", max = crate::TOP_N)]
  TooManyRows(usize),

  #[error("rank {found} at position {position}, expected {expected}")]
  RankGap { position: usize, expected: i32, found: i32 },

  #[error("coin {0} appears more than once")]
  DuplicateCoin(String),

  #[error("empty coin id at rank {0}")]
  EmptyCoinId(i32),

  #[error("negative {field} for coin {coin_id}")]
  NegativeValue { coin_id: String, field: &'static str },

  #[error("rows belong to more than one cycle")]
  MixedCycle,
}

/// Assign contiguous ranks 1..=N in provider order.
///
/// Later duplicates of a coin id are skipped and at most `limit` rows are kept.
/// Returns the ranked rows and the number of records skipped as duplicates.
pub fn rank_records(
  fetched_at: DateTime<Utc>,
  records: Vec<RawCoinRecord>,
  limit: usize,
) -> (Vec<CoinSnapshot>, usize) {
  let mut seen = HashSet::new();
  let mut duplicates = 0;
  let mut rows = Vec::with_capacity(limit.min(records.len()));

  for record in records {
    if rows.len() == limit {
      break;
    }
    if !seen.insert(record.coin_id.clone()) {
      duplicates += 1;
      continue;
    }
    let rank = rows.len() as i32 + 1;
    rows.push(CoinSnapshot::from_record(record, rank, fetched_at));
  }

  (rows, duplicates)
}

/// Check the per-cycle invariants: 1..=10 rows, ranks 1..N in order,
/// unique non-empty coin ids, non-negative price and market cap, one timestamp.
pub fn validate_cycle(rows: &[CoinSnapshot]) -> Result<(), SnapshotViolation> {
  let first = rows.first().ok_or(SnapshotViolation::Empty)?;
  if rows.len() > crate::TOP_N {
    return Err(SnapshotViolation::TooManyRows(rows.len()));
  }

  let zero = BigDecimal::zero();
  let mut seen = HashSet::new();
  for (position, row) in rows.iter().enumerate() {
    let expected = position as i32 + 1;
    if row.rank != expected {
      return Err(SnapshotViolation::RankGap { position, expected, found: row.rank });
    }
    if row.coin_id.trim().is_empty() {
      return Err(SnapshotViolation::EmptyCoinId(row.rank));
    }
    if !seen.insert(row.coin_id.as_str()) {
      return Err(SnapshotViolation::DuplicateCoin(row.coin_id.clone()));
    }
    if row.price_usd < zero {
      return Err(SnapshotViolation::NegativeValue {
        coin_id: row.coin_id.clone(),
        field: "price_usd",
      });
    }
    if row.market_cap_usd < zero {
      return Err(SnapshotViolation::NegativeValue {
        coin_id: row.coin_id.clone(),
        field: "market_cap_usd",
      });
    }
    if row.fetched_at != first.fetched_at {
      return Err(SnapshotViolation::MixedCycle);
    }
  }
  Ok(())
}

/// The row with the largest absolute 24h change, if any row reports one
pub fn top_mover(rows: &[CoinSnapshot]) -> Option<&CoinSnapshot> {
  rows
    .iter()
    .filter_map(|row| row.change_24h_pct.as_ref().map(|change| (change.abs(), row)))
    .fold(None, |best: Option<(BigDecimal, &CoinSnapshot)>, (magnitude, row)| match best {
      Some((best_magnitude, best_row)) if best_magnitude >= magnitude => {
        Some((best_magnitude, best_row))
      }
      _ => Some((magnitude, row)),
    })
    .map(|(_, row)| row)
}

/// Cycle identity: `now` truncated to the microsecond precision Postgres stores.
pub fn cycle_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
  now.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use pretty_assertions::assert_eq;
  use std::str::FromStr;

  fn record(id: &str, change: Option<&str>) -> RawCoinRecord {
    RawCoinRecord {
      coin_id: id.to_string(),
      symbol: id[..3.min(id.len())].to_uppercase(),
      name: id.to_string(),
      price_usd: BigDecimal::from(100),
      market_cap_usd: BigDecimal::from(1_000_000),
      volume_24h_usd: None,
      change_24h_pct: change.map(|c| BigDecimal::from_str(c).unwrap()),
      provider_rank: None,
    }
  }

  fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap()
  }

  #[test]
  fn test_rank_records_assigns_contiguous_ranks() {
    let records = vec![record("bitcoin", None), record("ethereum", None), record("tether", None)];
    let (rows, duplicates) = rank_records(ts(), records, 10);

    assert_eq!(duplicates, 0);
    let ranks: Vec<i32> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(rows[0].coin_id, "bitcoin");
    assert!(rows.iter().all(|r| r.fetched_at == ts()));
    assert!(validate_cycle(&rows).is_ok());
  }

  #[test]
  fn test_rank_records_skips_duplicates_and_truncates() {
    let mut records = vec![record("bitcoin", None), record("bitcoin", None)];
    records.extend((0..12).map(|i| record(&format!("coin-{}", i), None)));

    let (rows, duplicates) = rank_records(ts(), records, 10);

    assert_eq!(duplicates, 1);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[1].coin_id, "coin-0");
    assert_eq!(rows[9].rank, 10);
    assert!(validate_cycle(&rows).is_ok());
  }

  #[test]
  fn test_validate_cycle_violations() {
    assert_eq!(validate_cycle(&[]), Err(SnapshotViolation::Empty));

    let (mut rows, _) = rank_records(ts(), vec![record("a", None), record("b", None)], 10);
    rows[1].rank = 3;
    assert!(matches!(validate_cycle(&rows), Err(SnapshotViolation::RankGap { found: 3, .. })));

    let (mut rows, _) = rank_records(ts(), vec![record("a", None), record("b", None)], 10);
    rows[1].coin_id = "a".to_string();
    assert_eq!(validate_cycle(&rows), Err(SnapshotViolation::DuplicateCoin("a".to_string())));

    let (mut rows, _) = rank_records(ts(), vec![record("a", None), record("b", None)], 10);
    rows[1].fetched_at = ts() + TimeDelta::seconds(1);
    assert_eq!(validate_cycle(&rows), Err(SnapshotViolation::MixedCycle));

    let (mut rows, _) = rank_records(ts(), vec![record("a", None)], 10);
    rows[0].price_usd = BigDecimal::from(-1);
    assert!(matches!(
      validate_cycle(&rows),
      Err(SnapshotViolation::NegativeValue { field: "price_usd", .. })
    ));

    let (rows, _) =
      rank_records(ts(), (0..11).map(|i| record(&format!("c{}", i), None)).collect(), 11);
    assert_eq!(validate_cycle(&rows), Err(SnapshotViolation::TooManyRows(11)));
  }

  #[test]
  fn test_top_mover_uses_absolute_change() {
    let (rows, _) = rank_records(
      ts(),
      vec![
        record("bitcoin", Some("2.5")),
        record("ethereum", Some("-7.25")),
        record("tether", None),
        record("solana", Some("7.0")),
      ],
      10,
    );

    let mover = top_mover(&rows).unwrap();
    assert_eq!(mover.coin_id, "ethereum");
  }

  #[test]
  fn test_top_mover_none_without_changes() {
    let (rows, _) = rank_records(ts(), vec![record("tether", None)], 10);
    assert!(top_mover(&rows).is_none());
  }

  #[test]
  fn test_cycle_timestamp_truncates_to_micros() {
    let now = ts() + TimeDelta::nanoseconds(1_234_567);
    let truncated = cycle_timestamp(now);
    assert_eq!(truncated, ts() + TimeDelta::microseconds(1_234));
  }
}
