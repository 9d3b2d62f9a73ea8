// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An async client for the [Snowflake SQL REST API].
//!
//! The client submits SQL statements to the `/api/v2/statements` endpoint
//! and exposes the statement handle (query id) of every submission, which
//! callers use to chain `result_scan` queries against earlier result sets.
//!
//! Statement failures reported by the platform come back in two flavors,
//! matching the two ways callers consume them:
//!
//!   * [`Client::execute`] turns a platform error into [`Error::Sql`],
//!     carrying the Snowflake error code. Use this when a failed statement
//!     should abort the operation.
//!   * [`Client::execute_unchecked`] never fails on a platform error;
//!     it returns a [`StatementOutcome`] with a nonzero error code instead.
//!     Use this when executing batches that must continue past failures.
//!
//! [Snowflake SQL REST API]: https://docs.snowflake.com/en/developer-guide/sql-api/index

mod client;
mod config;
mod error;

pub use client::{Client, StatementOutcome, StatementResult};
pub use config::ClientConfig;
pub use error::Error;
