// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fetching the grants currently in force.
//!
//! Grant listings go through the same show-then-project chaining as the
//! inventory scanner, and rows are normalized with the same type mapper and
//! name canonicalizer, so live grants and target grants join on identical
//! tuples. Rows whose reported type the tool does not model are discarded;
//! the platform grows new object kinds faster than this tool does.
//!
//! A rejected `show grants` query (most commonly a role that was dropped
//! after it was configured) is deliberately treated as an empty grant set
//! rather than an error: one vanished role should not abort planning for
//! every other role in the run.

use std::collections::BTreeSet;

use sc_snowflake_client::{Client, Error as ClientError};
use tracing::{debug, warn};

use crate::error::Error;
use crate::grant::Grant;
use crate::names;
use crate::object::{Container, GrantOn, ObjectType};

/// Fetches the direct grants currently held by a role.
pub async fn current_grants_to_role(
    client: &Client,
    role: &str,
) -> Result<BTreeSet<Grant>, Error> {
    let listing = match client.execute(&format!("show grants to role {role}")).await {
        Ok(listing) => listing,
        Err(ClientError::Sql { code, message }) => {
            warn!(role, code, "fetching current grants failed: {message}");
            return Ok(BTreeSet::new());
        }
        Err(e) => return Err(e.into()),
    };
    let rows = project_grants(client, &listing.statement_id).await?;
    let mut grants = BTreeSet::new();
    for (privilege, granted_on, name) in rows {
        if let Some(grant) = direct_grant(&privilege, &granted_on, &name)? {
            grants.insert(grant);
        }
    }
    debug!(role, count = grants.len(), "fetched current grants");
    Ok(grants)
}

/// Fetches the future grants currently held by a role.
pub async fn future_grants_to_role(
    client: &Client,
    role: &str,
) -> Result<BTreeSet<Grant>, Error> {
    let listing = match client
        .execute(&format!("show future grants to role {role}"))
        .await
    {
        Ok(listing) => listing,
        Err(ClientError::Sql { code, message }) => {
            warn!(role, code, "fetching future grants failed: {message}");
            return Ok(BTreeSet::new());
        }
        Err(e) => return Err(e.into()),
    };
    let rows = project_grants(client, &listing.statement_id).await?;
    let mut grants = BTreeSet::new();
    for (privilege, granted_on, name) in rows {
        if let Some(grant) = future_grant(&privilege, &granted_on, &name) {
            grants.insert(grant);
        }
    }
    debug!(role, count = grants.len(), "fetched future grants");
    Ok(grants)
}

/// Fetches the roles currently granted to a user.
pub async fn current_user_roles(client: &Client, user: &str) -> Result<BTreeSet<String>, Error> {
    let listing = match client
        .execute(&format!("show grants to user \"{user}\""))
        .await
    {
        Ok(listing) => listing,
        Err(ClientError::Sql { code, message }) => {
            warn!(user, code, "fetching user grants failed: {message}");
            return Ok(BTreeSet::new());
        }
        Err(e) => return Err(e.into()),
    };
    let statement = format!(
        "select \"role\" from table(result_scan('{}'))",
        listing.statement_id
    );
    let result = client.execute(&statement).await?;
    let roles = result
        .rows
        .iter()
        .filter_map(|row| row.first().and_then(|v| v.as_deref()))
        // System-action grants surface as pseudo-roles like `USER$NAME`.
        .filter(|role| !role.is_empty() && !role.starts_with("USER$"))
        .map(|role| role.to_string())
        .collect();
    Ok(roles)
}

/// Projects a grant listing into `(privilege, granted_on, name)` triples.
/// Ownership rows and role-hierarchy rows are excluded in the query, as are
/// grants inside the platform's own namespace.
async fn project_grants(
    client: &Client,
    statement_id: &str,
) -> Result<Vec<(String, String, String)>, Error> {
    let statement = format!(
        "select \"privilege\", \"granted_on\", \"name\" \
         from table(result_scan('{statement_id}')) \
         where \"privilege\" <> 'OWNERSHIP' \
         and \"granted_on\" <> 'ROLE' \
         and \"name\" not like 'SNOWFLAKE.%'"
    );
    let result = client.execute(&statement).await?;
    let mut rows = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let field = |i: usize| row.get(i).and_then(|v| v.as_deref()).unwrap_or("");
        rows.push((
            field(0).to_string(),
            field(1).to_string(),
            field(2).to_string(),
        ));
    }
    Ok(rows)
}

/// Normalizes one current-grant row, or discards it when its type is not
/// modeled.
fn direct_grant(privilege: &str, granted_on: &str, name: &str) -> Result<Option<Grant>, Error> {
    if granted_on.eq_ignore_ascii_case("account") {
        return Ok(Some(Grant::new(privilege, GrantOn::Account, name)));
    }
    let Some(ty) = ObjectType::from_platform(granted_on) else {
        return Ok(None);
    };
    let canonical = names::canonicalize(name, ty)?;
    Ok(Some(Grant::new(
        privilege,
        GrantOn::Object(ty.generic()),
        &canonical,
    )))
}

/// Normalizes one future-grant row. The reported type is the type of the
/// objects to come; the name is their containing schema (or database, when
/// schemas themselves are the granted type).
fn future_grant(privilege: &str, granted_on: &str, name: &str) -> Option<Grant> {
    let ty = ObjectType::from_platform(granted_on)?;
    let container = match ty {
        ObjectType::Schema => Container::Database,
        _ => Container::Schema,
    };
    Some(Grant::new(
        privilege,
        GrantOn::Future {
            object_type: ty.generic(),
            container,
        },
        name,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_rows_become_account_grants() {
        let grant = direct_grant("MONITOR USAGE", "ACCOUNT", "MYACCT")
            .unwrap()
            .unwrap();
        assert_eq!(grant.on, GrantOn::Account);
        assert_eq!(grant.name, "MYACCT");
    }

    #[test]
    fn unknown_platform_types_are_discarded() {
        assert!(direct_grant("SELECT", "SEMANTIC_VIEW", "DB.S.SV")
            .unwrap()
            .is_none());
        assert!(future_grant("SELECT", "SEMANTIC_VIEW", "DB.S").is_none());
    }

    #[test]
    fn detailed_types_normalize_to_generic() {
        let grant = direct_grant("SELECT", "MATERIALIZED_VIEW", "DB.S.MV")
            .unwrap()
            .unwrap();
        assert_eq!(grant.on, GrantOn::Object(ObjectType::View));
    }

    #[test]
    fn callable_rows_canonicalize() {
        let grant = direct_grant("USAGE", "FUNCTION", "DB.S.\"F(A NUMBER):NUMBER\"")
            .unwrap()
            .unwrap();
        assert_eq!(grant.name, "DB.S.F(NUMBER)");
        assert_eq!(grant.on, GrantOn::Object(ObjectType::Function));
    }

    #[test]
    fn malformed_callable_rows_are_fatal() {
        assert!(matches!(
            direct_grant("USAGE", "FUNCTION", "DB.S.F"),
            Err(Error::MalformedCallable { .. })
        ));
    }

    #[test]
    fn future_rows_get_the_future_tag() {
        let grant = future_grant("SELECT", "TABLE", "ANALYTICS.SALES").unwrap();
        assert_eq!(grant.on.to_string(), "FUTURE TABLES IN SCHEMA");
        let grant = future_grant("USAGE", "SCHEMA", "ANALYTICS").unwrap();
        assert_eq!(grant.on.to_string(), "FUTURE SCHEMAS IN DATABASE");
    }
}
