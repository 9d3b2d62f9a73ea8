// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Plan construction: the three-way diff between live and target grants.
//!
//! For every recipient, [`venn`] partitions the live and target grant sets
//! into what must be revoked, what already matches, and what must be
//! granted. Per-recipient planning is independent, so the per-role and
//! per-user tasks fan out through the pool and merge by map union;
//! recipients are disjoint across tasks, so merge order is irrelevant.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sc_snowflake_client::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ControlConfig, RoleConfig};
use crate::error::Error;
use crate::grant::Grant;
use crate::grants;
use crate::object::{GrantOn, ObjectType};
use crate::pool::{self, Mode};
use crate::profile;
use crate::scan::Inventory;

/// Splits two sets into their Venn partition:
/// `(current − target, current ∩ target, target − current)`.
pub fn venn<T: Ord + Clone>(
    current: &BTreeSet<T>,
    target: &BTreeSet<T>,
) -> (BTreeSet<T>, BTreeSet<T>, BTreeSet<T>) {
    (
        current.difference(target).cloned().collect(),
        current.intersection(target).cloned().collect(),
        target.difference(current).cloned().collect(),
    )
}

/// The three-way delta for one recipient, in display order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub to_revoke: Vec<Grant>,
    pub ok: Vec<Grant>,
    pub to_grant: Vec<Grant>,
}

impl Delta {
    fn from_sets(
        to_revoke: BTreeSet<Grant>,
        ok: BTreeSet<Grant>,
        to_grant: BTreeSet<Grant>,
    ) -> Delta {
        // BTreeSet iteration is already in grant display order.
        Delta {
            to_revoke: to_revoke.into_iter().collect(),
            ok: ok.into_iter().collect(),
            to_grant: to_grant.into_iter().collect(),
        }
    }

    /// Reports whether applying this delta would change anything.
    pub fn is_noop(&self) -> bool {
        self.to_revoke.is_empty() && self.to_grant.is_empty()
    }
}

/// A persisted reconciliation plan. Never mutated after creation;
/// re-planning produces a new plan with a new id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: i64,
    #[serde(rename = "ROLES")]
    pub roles: BTreeMap<String, Delta>,
    #[serde(rename = "USERS")]
    pub users: BTreeMap<String, Delta>,
}

/// Options for a planning run.
#[derive(Clone, Debug)]
pub struct PlanOptions {
    /// Restrict planning to these roles. `None` plans every configured role.
    pub roles: Option<Vec<String>>,
    /// Also plan user role memberships.
    pub include_users: bool,
    pub mode: Mode,
    pub workers: usize,
}

/// Plans every requested role (and optionally every user) against the
/// filtered inventory.
pub async fn build_plan(
    client: &Client,
    config: &ControlConfig,
    inventory: &Inventory,
    options: &PlanOptions,
) -> Result<Plan, Error> {
    let plan_id = Utc::now().timestamp();
    let shared_databases: BTreeSet<String> = inventory
        .get(&ObjectType::SharedDatabase)
        .into_iter()
        .flat_map(|objects| objects.keys().cloned())
        .collect();

    let role_configs = config.roles_to_plan(options.roles.as_deref())?;
    let tasks: Vec<_> = role_configs
        .iter()
        .map(|(role, role_config)| {
            plan_single_role(client, config, inventory, &shared_databases, role, role_config)
        })
        .collect();
    let mut roles = BTreeMap::new();
    for result in pool::run_all(options.mode, options.workers, tasks).await {
        if let Some((role, delta)) = result? {
            roles.insert(role, delta);
        }
    }

    let mut users = BTreeMap::new();
    if options.include_users {
        let tasks: Vec<_> = config
            .users
            .iter()
            .map(|(user, target_roles)| plan_single_user(client, user, target_roles))
            .collect();
        for result in pool::run_all(options.mode, options.workers, tasks).await {
            if let Some((user, delta)) = result? {
                users.insert(user, delta);
            }
        }
    }

    info!(
        plan_id,
        roles = roles.len(),
        users = users.len(),
        "plan computed"
    );
    Ok(Plan {
        plan_id,
        roles,
        users,
    })
}

async fn plan_single_role(
    client: &Client,
    config: &ControlConfig,
    inventory: &Inventory,
    shared_databases: &BTreeSet<String>,
    role: &str,
    role_config: &RoleConfig,
) -> Result<Option<(String, Delta)>, Error> {
    let target = profile::role_target_state(config, inventory, role_config)?;
    let mut current = grants::current_grants_to_role(client, role).await?;
    current.extend(grants::future_grants_to_role(client, role).await?);
    debug!(role, current = current.len(), target = target.len(), "diffing role");
    Ok(diff_role_grants(config, shared_databases, current, target)
        .map(|delta| (role.to_string(), delta)))
}

/// Diffs one role's live grants against its target grants.
///
/// A role with no live grants at all — because the fetch failed or because
/// it genuinely holds nothing — yields no plan entry. The two cases are
/// indistinguishable at the platform boundary, and planning an all-grant
/// delta against a role that may no longer exist would only move the
/// failure to apply time. Bootstrapping a new role therefore starts with
/// granting it one privilege by hand.
pub fn diff_role_grants(
    config: &ControlConfig,
    shared_databases: &BTreeSet<String>,
    current: BTreeSet<Grant>,
    target: BTreeSet<Grant>,
) -> Option<Delta> {
    if current.is_empty() {
        return None;
    }
    // Grants the tool cannot manage must not be proposed for revocation:
    // anything in a shared database, anything the administrator ignores,
    // and combinations the platform rejects.
    let current: BTreeSet<Grant> = current
        .into_iter()
        .filter(|grant| {
            !shared_databases.contains(grant.database())
                && !config.is_ignored(&grant.name)
                && !config.is_unsupported(grant)
        })
        .collect();
    let (to_revoke, ok, to_grant) = venn(&current, &target);
    Some(Delta::from_sets(to_revoke, ok, to_grant))
}

async fn plan_single_user(
    client: &Client,
    user: &str,
    target_roles: &BTreeSet<String>,
) -> Result<Option<(String, Delta)>, Error> {
    let current = grants::current_user_roles(client, user).await?;
    Ok(diff_user_roles(&current, target_roles).map(|delta| (user.to_string(), delta)))
}

/// Diffs a user's live role memberships against the configured set. The
/// same empty-current asymmetry as for roles applies.
pub fn diff_user_roles(
    current: &BTreeSet<String>,
    target: &BTreeSet<String>,
) -> Option<Delta> {
    if current.is_empty() {
        return None;
    }
    let as_grants = |roles: &BTreeSet<String>| {
        roles
            .iter()
            .map(|role| Grant::new("USAGE", GrantOn::Role, role))
            .collect::<BTreeSet<_>>()
    };
    let (to_revoke, ok, to_grant) = venn(&as_grants(current), &as_grants(target));
    Some(Delta::from_sets(to_revoke, ok, to_grant))
}
