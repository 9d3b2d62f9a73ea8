// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Executing a rendered statement list against the platform.
//!
//! Applies are best effort: a failing statement is recorded and execution
//! continues, so one revoke against a vanished object does not strand the
//! rest of the plan. There is no transactional envelope and no undo; the
//! remedy for a partial apply is to re-plan and apply again.
//!
//! The executor runs against [`StatementExecutor`] rather than the client
//! directly so tests can drive it with scripted outcomes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sc_snowflake_client::{Client, Error as ClientError, StatementOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Error;
use crate::pool::{self, Mode};

/// The administrative role required to move grants.
const REQUIRED_ROLE: &str = "ACCOUNTADMIN";

/// The platform surface an apply runs against.
#[async_trait]
pub trait StatementExecutor: Sync {
    /// Executes a statement, reporting platform rejection as a nonzero
    /// outcome code rather than an error.
    async fn execute_unchecked(&self, sql: &str) -> Result<StatementOutcome, ClientError>;

    /// The role the session is acting as.
    async fn current_role(&self) -> Result<String, ClientError>;
}

#[async_trait]
impl StatementExecutor for Client {
    async fn execute_unchecked(&self, sql: &str) -> Result<StatementOutcome, ClientError> {
        Client::execute_unchecked(self, sql).await
    }

    async fn current_role(&self) -> Result<String, ClientError> {
        Client::current_role(self).await
    }
}

/// The recorded outcome of one applied statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub statement: String,
    /// Zero on success, otherwise the platform error code.
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Per-statement outcomes, keyed by the platform's execution identifier.
pub type ApplyReport = BTreeMap<String, Outcome>;

/// Executes a statement list.
///
/// The session must be acting as the top administrative role; anything else
/// aborts before the first statement is issued. In sequential mode
/// statements run in list order; in concurrent mode ordering is not
/// guaranteed. Only transport failures abort a run mid-way.
pub async fn apply_statements(
    executor: &dyn StatementExecutor,
    mode: Mode,
    workers: usize,
    statements: &[String],
) -> Result<ApplyReport, Error> {
    let role = executor.current_role().await?;
    if role != REQUIRED_ROLE {
        return Err(Error::NotAccountAdmin { role });
    }

    let tasks: Vec<_> = statements
        .iter()
        .map(|statement| apply_one(executor, statement))
        .collect();
    let mut report = ApplyReport::new();
    for result in pool::run_all(mode, workers, tasks).await {
        let (id, outcome) = result?;
        report.insert(id, outcome);
    }
    info!(
        statements = report.len(),
        failed = report.values().filter(|o| !o.success()).count(),
        "apply complete"
    );
    Ok(report)
}

async fn apply_one(
    executor: &dyn StatementExecutor,
    statement: &str,
) -> Result<(String, Outcome), Error> {
    let result = executor.execute_unchecked(statement).await?;
    if result.success() {
        info!("✓ {statement}");
    } else {
        warn!(code = result.code, "✗ {statement}");
    }
    Ok((
        result.statement_id,
        Outcome {
            statement: statement.to_string(),
            code: result.code,
            message: result.message,
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Scripts outcomes by statement text and records execution order.
    struct Script {
        role: String,
        failures: BTreeMap<String, i64>,
        executed: Mutex<Vec<String>>,
        next_id: Mutex<u64>,
    }

    impl Script {
        fn new(role: &str, failures: &[(&str, i64)]) -> Script {
            Script {
                role: role.to_string(),
                failures: failures
                    .iter()
                    .map(|(s, c)| (s.to_string(), *c))
                    .collect(),
                executed: Mutex::new(Vec::new()),
                next_id: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StatementExecutor for Script {
        async fn execute_unchecked(&self, sql: &str) -> Result<StatementOutcome, ClientError> {
            self.executed.lock().unwrap().push(sql.to_string());
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                format!("stmt-{:03}", *next)
            };
            match self.failures.get(sql) {
                Some(code) => Ok(StatementOutcome {
                    statement_id: id,
                    code: *code,
                    message: Some("SQL access control error".into()),
                }),
                None => Ok(StatementOutcome {
                    statement_id: id,
                    code: 0,
                    message: None,
                }),
            }
        }

        async fn current_role(&self) -> Result<String, ClientError> {
            Ok(self.role.clone())
        }
    }

    fn statements() -> Vec<String> {
        vec![
            "REVOKE INSERT ON TABLE DB.S.T2 FROM ROLE ANALYST".to_string(),
            "GRANT SELECT ON TABLE DB.S.GONE TO ROLE ANALYST".to_string(),
            "GRANT SELECT ON TABLE DB.S.T3 TO ROLE ANALYST".to_string(),
        ]
    }

    #[tokio::test]
    async fn sequential_apply_continues_past_failures() {
        let script = Script::new(
            "ACCOUNTADMIN",
            &[("GRANT SELECT ON TABLE DB.S.GONE TO ROLE ANALYST", 2003)],
        );
        let report = apply_statements(&script, Mode::Sequential, 1, &statements())
            .await
            .unwrap();
        // All three statements ran, in order, and each has its own keyed
        // outcome.
        assert_eq!(*script.executed.lock().unwrap(), statements());
        assert_eq!(report.len(), 3);
        let codes: Vec<i64> = report.values().map(|o| o.code).collect();
        assert_eq!(codes.iter().filter(|c| **c == 0).count(), 2);
        assert!(codes.contains(&2003));
        let failed = report.values().find(|o| !o.success()).unwrap();
        assert_eq!(
            failed.statement,
            "GRANT SELECT ON TABLE DB.S.GONE TO ROLE ANALYST"
        );
        assert_eq!(failed.message.as_deref(), Some("SQL access control error"));
    }

    #[tokio::test]
    async fn concurrent_apply_reports_every_statement() {
        let script = Script::new(
            "ACCOUNTADMIN",
            &[("GRANT SELECT ON TABLE DB.S.GONE TO ROLE ANALYST", 2003)],
        );
        let report = apply_statements(&script, Mode::Concurrent, 8, &statements())
            .await
            .unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.values().filter(|o| !o.success()).count(), 1);
    }

    #[tokio::test]
    async fn apply_requires_the_administrative_role() {
        let script = Script::new("SYSADMIN", &[]);
        let result = apply_statements(&script, Mode::Sequential, 1, &statements()).await;
        assert!(matches!(
            result,
            Err(Error::NotAccountAdmin { role }) if role == "SYSADMIN"
        ));
        // Nothing ran.
        assert!(script.executed.lock().unwrap().is_empty());
    }
}
