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

//! Error types for market data fetching.

use tc_core::FailureKind;
use thiserror::Error;

/// Errors surfaced by a logical fetch.
///
/// Retryable failures never leave the transport until the attempt budget is
/// spent; they then surface as [`FetchError::Transient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  #[error("Transient failure after {attempts} attempt(s): {reason}")]
  Transient { attempts: u32, reason: String },

  #[error("Provider returned terminal error: {0}")]
  Terminal(String),

  #[error("Malformed payload: {0}")]
  MalformedPayload(String),

  #[error("Provider rejected credentials: {0}")]
  Auth(String),

  #[error("No valid records in provider response ({dropped} dropped)")]
  EmptyResult { dropped: usize },

  #[error("HTTP client error: {0}")]
  Client(String),
}

impl FetchError {
  /// Classification carried into the cycle result and failure report
  pub fn failure_kind(&self) -> FailureKind {
    match self {
      FetchError::Transient { .. } => FailureKind::TransientFetch,
      FetchError::Auth(_) => FailureKind::Auth,
      FetchError::EmptyResult { .. } => FailureKind::EmptyResult,
      FetchError::Terminal(_) | FetchError::MalformedPayload(_) | FetchError::Client(_) => {
        FailureKind::TerminalFetch
      }
    }
  }

  /// Records dropped by validation before the error was raised
  pub fn records_dropped(&self) -> usize {
    match self {
      FetchError::EmptyResult { dropped } => *dropped,
      _ => 0,
    }
  }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
