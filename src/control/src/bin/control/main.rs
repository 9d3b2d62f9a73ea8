// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `control` command-line interface.

use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sc_control::command::{self, PlanArgs};
use sc_control::context::{ConnectionArgs, Context};
use sc_control::pool::{Mode, DEFAULT_WORKERS};

/// Reconciles declared Snowflake access control against live grants.
#[derive(Debug, Parser)]
#[clap(name = "control")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Directory holding atomic groups, profiles, and per-account state.
    #[clap(long, env = "CONTROL_CONFIG_DIR", default_value = "permissions")]
    config_dir: PathBuf,

    /// Snowflake account identifier.
    #[clap(long, env = "SNOWFLAKE_ACCOUNT")]
    account: String,

    /// User to authenticate as.
    #[clap(long, env = "SNOWFLAKE_USER")]
    user: String,

    /// Password for the user.
    #[clap(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Session role. Applying a plan requires ACCOUNTADMIN.
    #[clap(long, env = "SNOWFLAKE_ROLE")]
    role: Option<String>,

    /// Override the API endpoint derived from the account identifier.
    #[clap(long, env = "SNOWFLAKE_URL", hide = true)]
    url: Option<String>,

    /// Execution mode for catalog and grant queries.
    #[clap(long, default_value = "conc")]
    mode: Mode,

    /// Concurrency limit in concurrent mode.
    #[clap(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the object catalog and cache the filtered inventory.
    Sync,
    /// Compute a plan against the cached inventory.
    Plan {
        /// Roles to plan. Plans every configured role when omitted.
        roles: Vec<String>,
        /// Also plan user role memberships.
        #[clap(long)]
        users: bool,
        /// Rescan the catalog instead of using the cached inventory.
        #[clap(long)]
        rescan: bool,
    },
    /// Print the cached plan.
    Show,
    /// Render the cached plan as SQL statements.
    Sql,
    /// Execute the cached plan. Requires ACCOUNTADMIN.
    Apply,
    /// Truncate the cached inventory, plan, and statements.
    Clear,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("control: error: {e:#}");
        exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let connection = ConnectionArgs {
        account: cli.account,
        user: cli.user,
        password: cli.password,
        role: cli.role,
        url: cli.url,
    };
    let cx = Context::load(&cli.config_dir, &connection, cli.mode, cli.workers)?;
    match cli.command {
        Command::Sync => command::sync(&cx).await?,
        Command::Plan {
            roles,
            users,
            rescan,
        } => {
            command::plan(
                &cx,
                &PlanArgs {
                    roles,
                    include_users: users,
                    rescan,
                },
            )
            .await?
        }
        Command::Show => command::show(&cx)?,
        Command::Sql => command::sql(&cx)?,
        Command::Apply => command::apply(&cx).await?,
        Command::Clear => command::clear(&cx)?,
    }
    Ok(())
}
