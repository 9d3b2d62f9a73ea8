// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use url::Url;

use crate::client::Client;
use crate::error::Error;

/// The default timeout enforced on statement submissions.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration for a [`Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    account: String,
    user: String,
    password: String,
    role: Option<String>,
    url: Option<Url>,
    statement_timeout: Duration,
}

impl ClientConfig {
    /// Constructs a new `ClientConfig` for the named account, authenticating
    /// with the given user and password.
    pub fn new(account: &str, user: &str, password: &str) -> ClientConfig {
        ClientConfig {
            account: account.into(),
            user: user.into(),
            password: password.into(),
            role: None,
            url: None,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Sets the session role assumed for every submitted statement.
    pub fn role(mut self, role: &str) -> ClientConfig {
        self.role = Some(role.into());
        self
    }

    /// Overrides the endpoint URL derived from the account name.
    ///
    /// Useful for pointing the client at a mock server in tests.
    pub fn url(mut self, url: Url) -> ClientConfig {
        self.url = Some(url);
        self
    }

    /// Sets the per-statement timeout requested from the platform.
    pub fn statement_timeout(mut self, timeout: Duration) -> ClientConfig {
        self.statement_timeout = timeout;
        self
    }

    /// Builds the [`Client`].
    pub fn build(self) -> Result<Client, Error> {
        let url = match self.url {
            Some(url) => url,
            None => Url::parse(&format!(
                "https://{}.snowflakecomputing.com",
                self.account
            ))?,
        };
        let inner = reqwest::Client::builder().build()?;
        Ok(Client::new(
            inner,
            url,
            self.user,
            self.password,
            self.role,
            self.statement_timeout,
        ))
    }
}
