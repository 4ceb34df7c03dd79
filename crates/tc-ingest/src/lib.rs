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

//! # tc-ingest
//!
//! The ingestion pipeline for top-coin snapshots.
//!
//! [`IngestionScheduler`] runs one cycle at a time: fetch the ranked list from a
//! [`tc_client::MarketDataSource`], validate it, store it through a
//! [`tc_database_postgres::SnapshotRepository`], prune rows past the retention
//! window and hand the outcome to the [`ReportDispatcher`]. [`DailyTimer`]
//! fires cycles at a local wall-clock time.

pub mod cycle_tracker;
pub mod error;
pub mod notify;
pub mod scheduler;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod timer;

pub use cycle_tracker::{CycleInfo, CycleState, CycleTracker};
pub use error::{IngestError, IngestResult, NotificationError, NotificationResult};
pub use notify::{
  ranking_table, LogOnlyMailer, MailTransport, Report, ReportDispatcher, SmtpMailer,
};
pub use scheduler::{CycleSettings, IngestionScheduler};
pub use timer::{next_run_after, DailyTimer};

// Prelude for convenient imports
pub mod prelude {
  pub use crate::{
    CycleSettings, CycleState, DailyTimer, IngestError, IngestionScheduler, ReportDispatcher,
  };
}
