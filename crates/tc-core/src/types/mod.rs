//! Data model shared by the tc-* crates

pub mod ingestion;
pub mod snapshot;

pub use ingestion::{CycleFailure, FailureKind, IngestionResult, IngestionStatus};
pub use snapshot::{
  cycle_timestamp, rank_records, top_mover, validate_cycle, CoinSnapshot, RawCoinRecord,
  SnapshotViolation,
};
