//! Row mapping for the `coin_snapshots` table

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tc_core::CoinSnapshot;

use crate::schema::coin_snapshots;

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = coin_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CoinSnapshotRow {
    pub fetched_at: DateTime<Utc>,
    pub coin_id: String,
    pub rank: i32,
    pub symbol: String,
    pub name: String,
    pub price_usd: BigDecimal,
    pub market_cap_usd: BigDecimal,
    pub volume_24h_usd: Option<BigDecimal>,
    pub change_24h_pct: Option<BigDecimal>,
}

impl From<&CoinSnapshot> for CoinSnapshotRow {
    fn from(snapshot: &CoinSnapshot) -> Self {
        Self {
            fetched_at: snapshot.fetched_at,
            coin_id: snapshot.coin_id.clone(),
            rank: snapshot.rank,
            symbol: snapshot.symbol.clone(),
            name: snapshot.name.clone(),
            price_usd: snapshot.price_usd.clone(),
            market_cap_usd: snapshot.market_cap_usd.clone(),
            volume_24h_usd: snapshot.volume_24h_usd.clone(),
            change_24h_pct: snapshot.change_24h_pct.clone(),
        }
    }
}

impl From<CoinSnapshotRow> for CoinSnapshot {
    fn from(row: CoinSnapshotRow) -> Self {
        Self {
            coin_id: row.coin_id,
            rank: row.rank,
            symbol: row.symbol,
            name: row.name,
            price_usd: row.price_usd,
            market_cap_usd: row.market_cap_usd,
            volume_24h_usd: row.volume_24h_usd,
            change_24h_pct: row.change_24h_pct,
            fetched_at: row.fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_row_conversion_keeps_every_field() {
        let snapshot = CoinSnapshot {
            coin_id: "bitcoin".to_string(),
            rank: 1,
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            price_usd: BigDecimal::from_str("64250.12").unwrap(),
            market_cap_usd: BigDecimal::from_str("1265000000000").unwrap(),
            volume_24h_usd: None,
            change_24h_pct: Some(BigDecimal::from_str("-1.25").unwrap()),
            fetched_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        };

        let row = CoinSnapshotRow::from(&snapshot);
        assert_eq!(row.coin_id, "bitcoin");
        assert_eq!(row.rank, 1);
        assert_eq!(CoinSnapshot::from(row), snapshot);
    }
}
