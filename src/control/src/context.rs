// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The shared context commands run against.

use std::path::Path;

use sc_snowflake_client::{Client, ClientConfig};
use url::Url;

use crate::config::ControlConfig;
use crate::error::Error;
use crate::pool::Mode;
use crate::store::Store;

/// Everything a command needs: the platform client, the loaded
/// configuration, the file store, and the execution mode.
///
/// Built once at startup and borrowed by every command; nothing in it is
/// mutated after construction.
pub struct Context {
    pub client: Client,
    pub config: ControlConfig,
    pub store: Store,
    pub mode: Mode,
    pub workers: usize,
}

/// Connection settings for the platform, as collected by the CLI.
pub struct ConnectionArgs {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: Option<String>,
    pub url: Option<String>,
}

impl Context {
    /// Loads configuration for the account and opens a client and store.
    pub fn load(
        config_dir: &Path,
        connection: &ConnectionArgs,
        mode: Mode,
        workers: usize,
    ) -> Result<Context, Error> {
        let config = ControlConfig::load(config_dir, &connection.account)?;
        let store = Store::new(config_dir, &connection.account);
        let mut builder = ClientConfig::new(
            &connection.account,
            &connection.user,
            &connection.password,
        );
        if let Some(role) = &connection.role {
            builder = builder.role(role);
        }
        if let Some(url) = &connection.url {
            let url = Url::parse(url).map_err(sc_snowflake_client::Error::from)?;
            builder = builder.url(url);
        }
        let client = builder.build().map_err(Error::Client)?;
        Ok(Context {
            client,
            config,
            store,
            mode,
            workers,
        })
    }
}
