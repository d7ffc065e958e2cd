// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::*;
use crate::{connection_string, Credential, SasBuilder};
use sasign_core::utils::Redact;
use sasign_core::{Context, Error, Result};
use std::fmt::{Debug, Formatter};

/// Config carries the account settings the engine is constructed with.
///
/// The engine never reads configuration itself, the host loads a config
/// and hands the resulting [`Credential`] and [`SasBuilder`] over.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_NAME`]
    /// - connection string: `AccountName`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_KEY`]
    /// - connection string: `AccountKey`
    pub account_key: Option<String>,
    /// `version` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_SAS_VERSION`]
    ///
    /// Falls back to [`DEFAULT_SAS_VERSION`].
    pub version: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("version", &self.version)
            .finish()
    }
}

impl Config {
    /// Load config from the env of `ctx`, keeping fields that are already set.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if self.account_name.is_none() {
            self.account_name = ctx.env_var(AZBLOB_ACCOUNT_NAME);
        }
        if self.account_key.is_none() {
            self.account_key = ctx.env_var(AZBLOB_ACCOUNT_KEY);
        }
        if self.version.is_none() {
            self.version = ctx.env_var(AZBLOB_SAS_VERSION);
        }
        self
    }

    /// Parse an Azure storage connection string.
    ///
    /// `UseDevelopmentStorage=true` selects the Azurite account and key.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_SAS_VERSION)
    }

    /// Build the signing credential.
    pub fn credential(&self) -> Result<Credential> {
        let account_name = match self.account_name.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Err(Error::config_invalid("account name is not configured")),
        };
        let account_key = match self.account_key.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Err(Error::config_invalid("account key is not configured")),
        };
        Ok(Credential::new(account_name, account_key))
    }

    /// Builder signing with the configured version.
    pub fn builder(&self) -> SasBuilder {
        SasBuilder::new().with_version(self.version())
    }
}
