/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-dot-]browne[-at-]dwightjbrowne[-dot-]com
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

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "tc")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Run one ingestion cycle and exit (0 stored, 1 failed, 2 already running)
  Run,

  /// Run a cycle every day at UPDATE_SCHEDULE_HOUR:UPDATE_SCHEDULE_MINUTE local time
  Schedule {
    /// Serve the dashboard API alongside the timer
    #[arg(long)]
    serve: bool,
  },

  /// Serve the dashboard API and manual refresh endpoint
  Serve {
    /// Listen address
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,
  },

  /// Show the latest stored cycle
  Latest,

  /// Delete snapshots older than the retention window
  Prune {
    /// Retention window in days (defaults to DATA_RETENTION_DAYS)
    #[arg(short, long)]
    days: Option<i64>,
  },

  /// Apply pending database migrations
  Migrate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  dotenv().ok();

  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  let mut config = config::Config::from_env()?;

  match cli.command {
    Commands::Run => return Ok(ExitCode::from(commands::cycle::run_once(&config).await?)),
    Commands::Schedule { serve } => commands::cycle::schedule(&config, serve).await?,
    Commands::Serve { bind } => {
      if let Some(bind) = bind {
        config.bind_addr = bind;
      }
      commands::cycle::serve(&config).await?
    }
    Commands::Latest => commands::storage::latest(&config).await?,
    Commands::Prune { days } => commands::storage::prune(&config, days).await?,
    Commands::Migrate => commands::storage::migrate(&config).await?,
  }

  Ok(ExitCode::SUCCESS)
}
