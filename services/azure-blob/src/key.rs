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

use sasign_core::hash::base64_decode;
use sasign_core::utils::Redact;
use sasign_core::{Error, Result};
use std::fmt::{Debug, Formatter};

/// Credential that holds the storage account name and its shared key.
#[derive(Clone)]
pub struct Credential {
    account_name: String,
    account_key: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .finish()
    }
}

impl Credential {
    /// Create a credential from an account name and its base64 encoded key.
    ///
    /// The key is only decoded when signing, so a bad key surfaces as
    /// `SigningKeyInvalid` from the builder or verifier.
    pub fn new(account_name: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            account_key: account_key.into(),
        }
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Decode the shared key into HMAC key bytes.
    pub(crate) fn signing_key(&self) -> Result<Vec<u8>> {
        if self.account_key.is_empty() {
            return Err(Error::signing_key_invalid("account key is empty"));
        }

        base64_decode(&self.account_key).map_err(|e| {
            Error::signing_key_invalid(format!(
                "account key of {} is not valid base64",
                self.account_name
            ))
            .with_source(e)
        })
    }
}
