// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Implementation of the `control` subcommands.

use tracing::info;

use crate::context::Context;
use crate::error::Error;
use crate::plan::{self, Delta, Plan, PlanOptions};
use crate::scan::Inventory;
use crate::store::CachedInventory;
use crate::{apply, filter, scan, sql};

/// `control sync`: scan the catalog, filter it, and cache the result.
pub async fn sync(cx: &Context) -> Result<(), Error> {
    let inventory = refresh_inventory(cx).await?;
    let objects: usize = inventory.values().map(|set| set.len()).sum();
    println!("cached {objects} objects across {} types", inventory.len());
    Ok(())
}

/// Arguments to `control plan`.
pub struct PlanArgs {
    /// Restrict planning to these roles; empty plans every configured role.
    pub roles: Vec<String>,
    pub include_users: bool,
    /// Rescan the catalog instead of planning from the cached inventory.
    pub rescan: bool,
}

/// `control plan`: diff live grants against the configured target state and
/// cache the resulting plan.
pub async fn plan(cx: &Context, args: &PlanArgs) -> Result<(), Error> {
    let inventory = if args.rescan {
        refresh_inventory(cx).await?
    } else {
        let CachedInventory {
            local_cached_time,
            objects,
        } = cx.store.read_inventory()?;
        info!(%local_cached_time, "planning from cached inventory");
        objects
    };
    let options = PlanOptions {
        roles: if args.roles.is_empty() {
            None
        } else {
            Some(args.roles.clone())
        },
        include_users: args.include_users,
        mode: cx.mode,
        workers: cx.workers,
    };
    let plan = plan::build_plan(&cx.client, &cx.config, &inventory, &options).await?;
    cx.store.write_plan(&plan)?;
    print_summary(&plan);
    Ok(())
}

/// `control show`: print the cached plan.
pub fn show(cx: &Context) -> Result<(), Error> {
    let plan = cx.store.read_plan()?;
    println!("plan {}", plan.plan_id);
    for (role, delta) in &plan.roles {
        print_delta("role", role, delta);
    }
    for (user, delta) in &plan.users {
        print_delta("user", user, delta);
    }
    Ok(())
}

/// `control sql`: render the cached plan as statements and cache those too.
pub fn sql(cx: &Context) -> Result<(), Error> {
    let plan = cx.store.read_plan()?;
    let statements = sql::render_plan(&plan)?;
    cx.store.write_sql(&statements)?;
    for statement in &statements {
        println!("{statement};");
    }
    Ok(())
}

/// `control apply`: render the cached plan and execute it.
pub async fn apply(cx: &Context) -> Result<(), Error> {
    let plan = cx.store.read_plan()?;
    let statements = sql::render_plan(&plan)?;
    cx.store.write_sql(&statements)?;
    let report = apply::apply_statements(&cx.client, cx.mode, cx.workers, &statements).await?;
    let failed: Vec<_> = report.iter().filter(|(_, o)| !o.success()).collect();
    println!(
        "applied plan {}: {} statements, {} failed",
        plan.plan_id,
        report.len(),
        failed.len()
    );
    for (id, outcome) in failed {
        println!(
            "  {id}: [{code}] {statement}",
            code = outcome.code,
            statement = outcome.statement
        );
    }
    Ok(())
}

/// `control clear`: truncate the cached inventory, plan, and statements.
pub fn clear(cx: &Context) -> Result<(), Error> {
    cx.store.clear()
}

async fn refresh_inventory(cx: &Context) -> Result<Inventory, Error> {
    let inventory = scan::scan_objects(&cx.client, cx.mode, cx.workers).await?;
    let inventory = filter::filter_objects(inventory, &cx.config);
    cx.store.write_inventory(&inventory)?;
    Ok(inventory)
}

fn print_summary(plan: &Plan) {
    println!("plan {}", plan.plan_id);
    for (role, delta) in &plan.roles {
        println!(
            "  role {role}: {} to revoke, {} ok, {} to grant",
            delta.to_revoke.len(),
            delta.ok.len(),
            delta.to_grant.len()
        );
    }
    for (user, delta) in &plan.users {
        println!(
            "  user {user}: {} to revoke, {} ok, {} to grant",
            delta.to_revoke.len(),
            delta.ok.len(),
            delta.to_grant.len()
        );
    }
}

fn print_delta(kind: &str, recipient: &str, delta: &Delta) {
    println!("{kind} {recipient}:");
    for grant in &delta.to_revoke {
        println!("  - {grant}");
    }
    for grant in &delta.ok {
        println!("  = {grant}");
    }
    for grant in &delta.to_grant {
        println!("  + {grant}");
    }
}
