// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;

/// The query tag attached to every session this client opens, so that
/// statements issued by the tool are attributable in the query history.
const QUERY_TAG: &str = "CONTROL";

/// An API client for the Snowflake SQL REST API.
///
/// The client is cheap to clone and sharable across tasks: clones reuse the
/// underlying HTTP connection pool, and every statement submission is
/// independent, so concurrent use requires no coordination.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
    url: Url,
    user: String,
    password: String,
    role: Option<String>,
    statement_timeout: Duration,
}

/// The result set of a successfully executed statement.
#[derive(Clone, Debug)]
pub struct StatementResult {
    /// The statement handle assigned by the platform, usable in
    /// `result_scan` queries.
    pub statement_id: String,
    /// Result column names, in result order.
    pub columns: Vec<String>,
    /// Result rows. Values are stringly typed, as the API delivers them;
    /// `None` is SQL `NULL`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl StatementResult {
    /// Returns the index of the named column, matching case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// The outcome of a statement executed without error checking.
///
/// A `code` of zero indicates success; any other value is the error code
/// reported by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementOutcome {
    /// The statement handle, or a locally generated id if the platform did
    /// not assign one. Unique per submission either way.
    pub statement_id: String,
    /// Zero on success, otherwise the Snowflake error code.
    pub code: i64,
    /// The error message, when the statement failed.
    pub message: Option<String>,
}

impl StatementOutcome {
    /// Reports whether the statement succeeded.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parameters: StatementParameters<'a>,
}

#[derive(Serialize)]
struct StatementParameters<'a> {
    query_tag: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    statement_handle: Option<String>,
    result_set_meta_data: Option<ResultSetMetaData>,
    data: Option<Vec<Vec<Option<String>>>>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<RowType>,
}

#[derive(Deserialize)]
struct RowType {
    name: String,
}

impl Client {
    pub(crate) fn new(
        inner: reqwest::Client,
        url: Url,
        user: String,
        password: String,
        role: Option<String>,
        statement_timeout: Duration,
    ) -> Client {
        Client {
            inner,
            url,
            user,
            password,
            role,
            statement_timeout,
        }
    }

    /// Executes a SQL statement and returns its result set.
    ///
    /// A statement the platform rejects surfaces as [`Error::Sql`] carrying
    /// the platform error code.
    pub async fn execute(&self, sql: &str) -> Result<StatementResult, Error> {
        let (ok, resp) = self.submit(sql).await?;
        if !ok {
            return Err(Error::Sql {
                code: parse_code(resp.code.as_deref()),
                message: resp.message.unwrap_or_else(|| "unknown error".into()),
            });
        }
        let statement_id = resp
            .statement_handle
            .ok_or_else(|| Error::MalformedResponse("missing statement handle".into()))?;
        let columns = resp
            .result_set_meta_data
            .map(|m| m.row_type.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        Ok(StatementResult {
            statement_id,
            columns,
            rows: resp.data.unwrap_or_default(),
        })
    }

    /// Executes a SQL statement, converting a platform rejection into a
    /// [`StatementOutcome`] with a nonzero code rather than an error.
    ///
    /// Only transport-level failures return `Err`.
    pub async fn execute_unchecked(&self, sql: &str) -> Result<StatementOutcome, Error> {
        let (ok, resp) = self.submit(sql).await?;
        let statement_id = resp
            .statement_handle
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if ok {
            Ok(StatementOutcome {
                statement_id,
                code: 0,
                message: None,
            })
        } else {
            Ok(StatementOutcome {
                statement_id,
                code: parse_code(resp.code.as_deref()),
                message: resp.message,
            })
        }
    }

    /// Returns the role the current session is acting as.
    pub async fn current_role(&self) -> Result<String, Error> {
        let result = self.execute("SELECT CURRENT_ROLE()").await?;
        match result.rows.first().and_then(|row| row.first()) {
            Some(Some(role)) => Ok(role.clone()),
            _ => Err(Error::MalformedResponse(
                "CURRENT_ROLE() returned no rows".into(),
            )),
        }
    }

    async fn submit(&self, sql: &str) -> Result<(bool, StatementResponse), Error> {
        let url = self
            .url
            .join("/api/v2/statements")
            .map_err(Error::UrlParse)?;
        let request = StatementRequest {
            statement: sql,
            timeout: self.statement_timeout.as_secs(),
            role: self.role.as_deref(),
            parameters: StatementParameters {
                query_tag: QUERY_TAG,
            },
        };
        debug!(statement = sql, "submitting statement");
        let resp = self
            .inner
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await?;
        let ok = resp.status().is_success();
        let payload = resp
            .json::<StatementResponse>()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok((ok, payload))
    }
}

/// Parses the stringly typed, zero-padded error code in an API response.
fn parse_code(code: Option<&str>) -> i64 {
    match code.and_then(|c| c.parse::<i64>().ok()) {
        Some(code) => code,
        // The platform reported a failure without a usable code. Keep it
        // distinguishable from success.
        None => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zero_padded_codes() {
        assert_eq!(parse_code(Some("090001")), 90001);
        assert_eq!(parse_code(Some("002003")), 2003);
        assert_eq!(parse_code(None), -1);
        assert_eq!(parse_code(Some("not a code")), -1);
    }

    #[test]
    fn deserializes_statement_response() {
        let payload = r#"{
            "statementHandle": "01b2c3d4-0000-1111-2222-333344445555",
            "resultSetMetaData": {
                "rowType": [{"name": "name"}, {"name": "kind"}]
            },
            "data": [["ANALYTICS", "STANDARD"], ["SHARED_SRC", null]],
            "code": "090001",
            "message": "Statement executed successfully."
        }"#;
        let resp: StatementResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(
            resp.statement_handle.as_deref(),
            Some("01b2c3d4-0000-1111-2222-333344445555")
        );
        let meta = resp.result_set_meta_data.unwrap();
        assert_eq!(meta.row_type.len(), 2);
        assert_eq!(meta.row_type[0].name, "name");
        let data = resp.data.unwrap();
        assert_eq!(data[1], vec![Some("SHARED_SRC".into()), None]);
    }

    #[test]
    fn deserializes_error_response() {
        let payload = r#"{
            "code": "002003",
            "message": "SQL compilation error: Role 'GONE' does not exist",
            "sqlState": "02000",
            "statementHandle": "01b2c3d4-0000-1111-2222-333344445555"
        }"#;
        let resp: StatementResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parse_code(resp.code.as_deref()), 2003);
        assert!(resp.data.is_none());
    }
}
