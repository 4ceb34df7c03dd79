pub mod ingestion_run;
pub mod snapshot;

// Re-export commonly used types
pub use ingestion_run::{IngestionRun, NewIngestionRun};
pub use snapshot::CoinSnapshotRow;
