use anyhow::{Context, Result};
use std::env;
use tc_core::Config as CoreConfig;

/// Default listen address for the dashboard API
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct Config {
  pub core: CoreConfig,
  pub database_url: String,
  pub bind_addr: String,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let core = CoreConfig::from_env().context("Invalid pipeline configuration")?;
    Self::from_parts(core, |key| env::var(key).ok())
  }

  fn from_parts<F>(core: CoreConfig, lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let database_url =
      lookup("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    Ok(Self { core, database_url, bind_addr })
  }
}
