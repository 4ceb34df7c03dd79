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

use thiserror::Error;

/// Errors that stop a cycle from starting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
  #[error("An ingestion cycle is already in progress")]
  CycleInProgress,

  #[error("Configuration error: {0}")]
  ConfigurationError(String),
}

/// Report delivery failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
  #[error("Invalid address {address}: {reason}")]
  InvalidAddress { address: String, reason: String },

  #[error("Failed to build message: {0}")]
  MessageError(String),

  #[error("Transport error: {0}")]
  TransportError(String),
}

impl From<lettre::error::Error> for NotificationError {
  fn from(err: lettre::error::Error) -> Self {
    NotificationError::MessageError(err.to_string())
  }
}

impl From<lettre::transport::smtp::Error> for NotificationError {
  fn from(err: lettre::transport::smtp::Error) -> Self {
    NotificationError::TransportError(err.to_string())
  }
}

impl From<tc_core::Error> for IngestError {
  fn from(err: tc_core::Error) -> Self {
    IngestError::ConfigurationError(err.to_string())
  }
}

pub type IngestResult<T> = Result<T, IngestError>;
pub type NotificationResult<T> = Result<T, NotificationError>;
