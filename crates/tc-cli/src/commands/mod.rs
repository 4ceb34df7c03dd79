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

pub mod cycle;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tc_client::CoinGeckoClient;
use tc_database_postgres::DatabaseContext;
use tc_ingest::{CycleSettings, IngestionScheduler, ReportDispatcher};
use tracing::{debug, info};

use crate::config::Config;

/// Open the pool with the store timeout applied server-side
pub fn connect(config: &Config) -> Result<DatabaseContext> {
  let store_timeout = Duration::from_secs(config.core.pipeline.store_timeout_secs);
  let context = DatabaseContext::new(&config.database_url)
    .context("Failed to connect to database")?
    .with_statement_timeout(store_timeout);
  Ok(context)
}

/// Build the scheduler over Postgres, CoinGecko and the configured mail transport
pub async fn build_scheduler(config: &Config) -> Result<Arc<IngestionScheduler>> {
  let context = connect(config)?;
  let applied = context.run_migrations().await.context("Failed to run migrations")?;
  if !applied.is_empty() {
    info!("Applied {} migration(s)", applied.len());
  }

  let client =
    CoinGeckoClient::new(&config.core.provider).context("Failed to create CoinGecko client")?;
  let dispatcher = ReportDispatcher::from_config(&config.core.mail)
    .context("Failed to configure notifications")?;
  debug!("Notification transport: {}", dispatcher.transport_name());

  let scheduler = IngestionScheduler::new(
    Arc::new(client),
    Arc::new(context.snapshot_repository()),
    Arc::new(dispatcher),
    CycleSettings::from_config(&config.core),
  );
  Ok(Arc::new(scheduler))
}
