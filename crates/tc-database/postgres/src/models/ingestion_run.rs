//! Ingestion audit log models

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tc_core::{IngestionResult, IngestionStatus};

use crate::schema::ingestion_runs;

// ===== IngestionRun =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = ingestion_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IngestionRun {
    pub id: i32,
    pub fetched_at: DateTime<Utc>,
    pub status: String,
    pub coins_stored: i32,
    pub error_message: Option<String>,
    pub notification_sent: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = ingestion_runs)]
pub struct NewIngestionRun {
    pub fetched_at: DateTime<Utc>,
    pub status: String,
    pub coins_stored: i32,
    pub error_message: Option<String>,
    pub notification_sent: bool,
    pub recorded_at: DateTime<Utc>,
}

impl NewIngestionRun {
    /// Audit row for a finished cycle
    pub fn from_result(
        result: &IngestionResult,
        notification_sent: bool,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let error_message = match result.status {
            IngestionStatus::Success => None,
            IngestionStatus::Partial | IngestionStatus::Failure => Some(result.summary()),
        };

        Self {
            fetched_at: result.fetched_at,
            status: result.status.as_str().to_string(),
            coins_stored: i32::try_from(result.coins_stored).unwrap_or(i32::MAX),
            error_message,
            notification_sent,
            recorded_at,
        }
    }

    /// Materialize with an assigned id, as the in-memory store does
    pub fn into_run(self, id: i32) -> IngestionRun {
        IngestionRun {
            id,
            fetched_at: self.fetched_at,
            status: self.status,
            coins_stored: self.coins_stored,
            error_message: self.error_message,
            notification_sent: self.notification_sent,
            recorded_at: self.recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tc_core::FailureKind;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_success_run_has_no_error_message() {
        let result = IngestionResult::success(ts(), Vec::new(), 0);
        let run = NewIngestionRun::from_result(&result, true, ts());

        assert_eq!(run.status, "success");
        assert_eq!(run.error_message, None);
        assert!(run.notification_sent);
    }

    #[test]
    fn test_failure_run_carries_classification() {
        let result =
            IngestionResult::failure(ts(), FailureKind::FetchTimeout, "no response in 30s", 0);
        let run = NewIngestionRun::from_result(&result, false, ts());

        assert_eq!(run.status, "failure");
        assert_eq!(run.coins_stored, 0);
        let message = run.error_message.unwrap();
        assert!(message.contains("fetch_timeout"));
        assert!(message.contains("no response in 30s"));
    }

    #[test]
    fn test_into_run_assigns_id() {
        let result = IngestionResult::success(ts(), Vec::new(), 0);
        let run = NewIngestionRun::from_result(&result, true, ts()).into_run(7);
        assert_eq!(run.id, 7);
        assert_eq!(run.fetched_at, ts());
    }
}
