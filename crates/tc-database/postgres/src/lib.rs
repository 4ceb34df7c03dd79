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

//! PostgreSQL storage for ranked top-coin snapshots.
//!
//! - [`repository::SnapshotRepository`]: the storage contract
//! - [`repository::DatabaseContext`]: r2d2 pool, migrations and the Postgres implementation
//! - `memory::InMemorySnapshotRepository`: process-local store, behind the
//!   `test-utils` feature

pub mod connection;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export commonly used items
pub use connection::{establish_connection, run_pending_migrations, MIGRATIONS};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySnapshotRepository;
pub use models::{CoinSnapshotRow, IngestionRun, NewIngestionRun};
pub use repository::{
  DatabaseContext, PgSnapshotRepository, RepositoryError, RepositoryResult, SnapshotRepository,
};
