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

//! # tc-web
//!
//! JSON endpoints over stored snapshots plus the manual refresh trigger.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /api/crypto-data` | latest stored cycle |
//! | `GET\|POST /api/refresh` | run one cycle now (200 / 409 / 502) |
//! | `GET /api/last-update` | latest run log entry |
//! | `GET /api/coins/{coin_id}/history?days=N` | raw rows for one coin |
//! | `GET /health` | liveness |

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{WebError, WebResult};
pub use handlers::AppState;
pub use routes::{configure, start_server};
