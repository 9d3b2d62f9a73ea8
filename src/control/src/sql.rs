// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rendering a plan into literal grant and revoke statements.
//!
//! Rendering is deterministic: per recipient all revokes come first, then
//! all grants, each in delta order (target type, then name, then
//! privilege). Recipients render in map order.

use crate::error::Error;
use crate::grant::Grant;
use crate::object::GrantOn;
use crate::plan::Plan;

/// Renders every delta in a plan into its statement list, revokes before
/// grants, roles before users.
pub fn render_plan(plan: &Plan) -> Result<Vec<String>, Error> {
    let mut statements = Vec::new();
    for (role, delta) in &plan.roles {
        for grant in &delta.to_revoke {
            statements.push(role_statement(Verb::Revoke, grant, role));
        }
        for grant in &delta.to_grant {
            statements.push(role_statement(Verb::Grant, grant, role));
        }
    }
    for (user, delta) in &plan.users {
        for grant in &delta.to_revoke {
            statements.push(user_statement(Verb::Revoke, grant, user)?);
        }
        for grant in &delta.to_grant {
            statements.push(user_statement(Verb::Grant, grant, user)?);
        }
    }
    Ok(statements)
}

#[derive(Clone, Copy)]
enum Verb {
    Grant,
    Revoke,
}

impl Verb {
    /// The verb and its role-facing preposition.
    fn parts(self) -> (&'static str, &'static str) {
        match self {
            Verb::Grant => ("GRANT", "TO"),
            Verb::Revoke => ("REVOKE", "FROM"),
        }
    }
}

/// Renders one role-delta entry. Account-level privileges name no object.
fn role_statement(verb: Verb, grant: &Grant, role: &str) -> String {
    let (verb, preposition) = verb.parts();
    match grant.on {
        GrantOn::Account => format!(
            "{verb} {privilege} ON ACCOUNT {preposition} ROLE {role}",
            privilege = grant.privilege,
        ),
        _ => format!(
            "{verb} {privilege} ON {on} {name} {preposition} ROLE {role}",
            privilege = grant.privilege,
            on = grant.on,
            name = grant.name,
        ),
    }
}

/// Renders one user-delta entry. User deltas only ever move role
/// membership; anything else in one is a contract breach that aborts
/// rendering.
fn user_statement(verb: Verb, grant: &Grant, user: &str) -> Result<String, Error> {
    if grant.privilege != "USAGE" || grant.on != GrantOn::Role {
        return Err(Error::UserGrantContract {
            privilege: grant.privilege.clone(),
            object_type: grant.on.to_string(),
        });
    }
    let (verb, preposition) = verb.parts();
    Ok(format!(
        "{verb} ROLE {role} {preposition} USER \"{user}\"",
        role = grant.name,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Container, ObjectType};
    use crate::plan::Delta;

    fn grant(privilege: &str, on: GrantOn, name: &str) -> Grant {
        Grant::new(privilege, on, name)
    }

    #[test]
    fn renders_revokes_before_grants_in_delta_order() {
        let mut plan = Plan::default();
        plan.roles.insert(
            "ANALYST".into(),
            Delta {
                to_revoke: vec![
                    grant("INSERT", GrantOn::Object(ObjectType::Table), "DB.S.T2"),
                    grant("SELECT", GrantOn::Object(ObjectType::View), "DB.S.V"),
                ],
                ok: vec![grant("SELECT", GrantOn::Object(ObjectType::Table), "DB.S.T1")],
                to_grant: vec![grant(
                    "SELECT",
                    GrantOn::Object(ObjectType::Table),
                    "DB.S.T3",
                )],
            },
        );
        let statements = render_plan(&plan).unwrap();
        assert_eq!(
            statements,
            vec![
                "REVOKE INSERT ON TABLE DB.S.T2 FROM ROLE ANALYST",
                "REVOKE SELECT ON VIEW DB.S.V FROM ROLE ANALYST",
                "GRANT SELECT ON TABLE DB.S.T3 TO ROLE ANALYST",
            ]
        );
    }

    #[test]
    fn account_grants_omit_the_object_name() {
        let statement = role_statement(
            Verb::Grant,
            &grant("CREATE DATABASE", GrantOn::Account, "MYACCT"),
            "ADMIN",
        );
        assert_eq!(statement, "GRANT CREATE DATABASE ON ACCOUNT TO ROLE ADMIN");
    }

    #[test]
    fn future_grants_render_with_the_container() {
        let statement = role_statement(
            Verb::Grant,
            &grant(
                "SELECT",
                GrantOn::Future {
                    object_type: ObjectType::Table,
                    container: Container::Schema,
                },
                "ANALYTICS.SALES",
            ),
            "ANALYST",
        );
        assert_eq!(
            statement,
            "GRANT SELECT ON FUTURE TABLES IN SCHEMA ANALYTICS.SALES TO ROLE ANALYST"
        );
    }

    #[test]
    fn user_statements_quote_the_user() {
        let statement =
            user_statement(Verb::Grant, &grant("USAGE", GrantOn::Role, "LOADER"), "jdoe").unwrap();
        assert_eq!(statement, "GRANT ROLE LOADER TO USER \"jdoe\"");
        let statement = user_statement(
            Verb::Revoke,
            &grant("USAGE", GrantOn::Role, "LEGACY"),
            "jdoe",
        )
        .unwrap();
        assert_eq!(statement, "REVOKE ROLE LEGACY FROM USER \"jdoe\"");
    }

    #[test]
    fn user_deltas_reject_anything_but_role_membership() {
        let result = user_statement(
            Verb::Grant,
            &grant("SELECT", GrantOn::Object(ObjectType::Table), "DB.S.T1"),
            "jdoe",
        );
        assert!(matches!(result, Err(Error::UserGrantContract { .. })));
    }
}
