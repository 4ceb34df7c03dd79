use thiserror::Error;

/// The main error type for tc-* configuration and shared helpers
#[derive(Error, Debug)]
pub enum Error {
  /// Environment variable error
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// Serialization/Deserialization error
  #[error("Serialization error")]
  Serde(#[from] serde_json::Error),

  /// Missing required setting
  #[error("Missing required setting: {0}")]
  MissingSetting(String),
}

/// Result type alias for tc-* crates
pub type Result<T> = std::result::Result<T, Error>;
