// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

/// Errors returned by the Snowflake client.
#[derive(Error, Debug)]
pub enum Error {
    /// An error in the underlying HTTP transport.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// An invalid endpoint URL.
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    /// A statement that the platform rejected, with its reported error code.
    #[error("SQL error {code}: {message}")]
    Sql {
        /// The Snowflake error code.
        code: i64,
        /// The error message reported by the platform.
        message: String,
    },
    /// A response the client could not make sense of.
    #[error("malformed response from the SQL API: {0}")]
    MalformedResponse(String),
}
