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
use crate::policy::validate_identifier;
use crate::{
    AccessConstraint, Credential, IpRange, PermissionSet, Protocol, ResourceScope, SignedResource,
};
use http::uri::PathAndQuery;
use http::Uri;
use log::debug;
use sasign_core::hash::{base64_encode, hmac_sha256};
use sasign_core::time::{format_iso8601, DateTime};
use sasign_core::utils::Redact;
use sasign_core::{Error, Result};
use std::fmt::{Debug, Display, Formatter, Write};
use std::str::FromStr;

/// Signed versions from this one on carry an encryption scope field.
const ENCRYPTION_SCOPE_VERSION: &str = "2020-12-06";

/// Where a token takes its constraint from.
///
/// Exactly one source is authoritative, a token never merges an inline
/// constraint with a stored policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource {
    /// Ad-hoc token, every bound is signed into the token itself.
    Inline(AccessConstraint),
    /// Token deferring to a stored policy of the container.
    StoredPolicy(String),
}

impl ConstraintSource {
    /// Pick the source from optional parts.
    ///
    /// Fails with `InvalidConstraint` if both or neither are given.
    pub fn from_parts(
        inline: Option<AccessConstraint>,
        identifier: Option<String>,
    ) -> Result<Self> {
        match (inline, identifier) {
            (Some(c), None) => Ok(ConstraintSource::Inline(c)),
            (None, Some(id)) => Ok(ConstraintSource::StoredPolicy(id)),
            (Some(_), Some(id)) => Err(Error::invalid_constraint(format!(
                "constraint must be specified inline or by stored policy {id}, not both"
            ))),
            (None, None) => Err(Error::invalid_constraint(
                "constraint must be specified inline or by a stored policy",
            )),
        }
    }
}

/// Response headers a token asks the service to override.
///
/// - [Specifying query parameters to override response headers](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#specify-query-parameters-to-override-response-headers-blob-storage-and-azure-files-only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseOverrides {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
}

impl ResponseOverrides {
    fn fields(&self) -> [(&'static str, &Option<String>); 5] {
        [
            (RESPONSE_CACHE_CONTROL, &self.cache_control),
            (RESPONSE_CONTENT_DISPOSITION, &self.content_disposition),
            (RESPONSE_CONTENT_ENCODING, &self.content_encoding),
            (RESPONSE_CONTENT_LANGUAGE, &self.content_language),
            (RESPONSE_CONTENT_TYPE, &self.content_type),
        ]
    }

    pub(crate) fn set(&mut self, key: &str, value: String) -> bool {
        let field = match key {
            RESPONSE_CACHE_CONTROL => &mut self.cache_control,
            RESPONSE_CONTENT_DISPOSITION => &mut self.content_disposition,
            RESPONSE_CONTENT_ENCODING => &mut self.content_encoding,
            RESPONSE_CONTENT_LANGUAGE => &mut self.content_language,
            RESPONSE_CONTENT_TYPE => &mut self.content_type,
            _ => return false,
        };
        *field = Some(value);
        true
    }
}

/// Every field of a token that is covered by its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SasParameters {
    pub version: String,
    pub resource: SignedResource,
    pub start: Option<DateTime>,
    pub expiry: Option<DateTime>,
    pub permissions: Option<PermissionSet>,
    pub identifier: Option<String>,
    pub ip_range: Option<IpRange>,
    pub protocol: Option<Protocol>,
    pub overrides: ResponseOverrides,
}

impl SasParameters {
    fn new(
        version: &str,
        resource: SignedResource,
        source: &ConstraintSource,
        overrides: &ResponseOverrides,
    ) -> Self {
        let mut params = SasParameters {
            version: version.to_string(),
            resource,
            start: None,
            expiry: None,
            permissions: None,
            identifier: None,
            ip_range: None,
            protocol: None,
            overrides: overrides.clone(),
        };

        match source {
            ConstraintSource::Inline(c) => {
                params.start = c.start();
                params.expiry = c.expiry();
                params.permissions = Some(c.permissions());
                params.ip_range = c.ip_range();
                params.protocol = c.protocol();
            }
            ConstraintSource::StoredPolicy(id) => params.identifier = Some(id.clone()),
        }

        params
    }

    /// Construct string to sign
    ///
    /// ## Format
    ///
    /// ```text
    /// signedPermissions + "\n" +
    /// signedStart + "\n" +
    /// signedExpiry + "\n" +
    /// canonicalizedResource + "\n" +
    /// signedIdentifier + "\n" +
    /// signedIP + "\n" +
    /// signedProtocol + "\n" +
    /// signedVersion + "\n" +
    /// signedResource + "\n" +
    /// signedSnapshotTime + "\n" +
    /// [signedEncryptionScope + "\n" +]
    /// rscc + "\n" +
    /// rscd + "\n" +
    /// rsce + "\n" +
    /// rscl + "\n" +
    /// rsct
    /// ```
    ///
    /// Absent fields stay as empty lines, positions never shift.
    ///
    /// ## Reference
    ///
    /// - [Construct the signature string](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#version-2018-11-09-and-later)
    pub(crate) fn string_to_sign(
        &self,
        account_name: &str,
        scope: &ResourceScope,
    ) -> Result<String> {
        let mut s = String::with_capacity(256);

        writeln!(
            &mut s,
            "{}",
            self.permissions.map(|v| v.encode()).unwrap_or_default()
        )?;
        writeln!(
            &mut s,
            "{}",
            self.start.map(format_iso8601).unwrap_or_default()
        )?;
        writeln!(
            &mut s,
            "{}",
            self.expiry.map(format_iso8601).unwrap_or_default()
        )?;
        writeln!(&mut s, "{}", scope.canonicalized(account_name))?;
        writeln!(&mut s, "{}", self.identifier.as_deref().unwrap_or_default())?;
        writeln!(
            &mut s,
            "{}",
            self.ip_range.map(|v| v.to_string()).unwrap_or_default()
        )?;
        writeln!(
            &mut s,
            "{}",
            self.protocol.map(|v| v.to_string()).unwrap_or_default()
        )?;
        writeln!(&mut s, "{}", self.version)?;
        writeln!(&mut s, "{}", self.resource)?;
        // Snapshot time, snapshots are not signable here.
        writeln!(&mut s)?;
        if self.version.as_str() >= ENCRYPTION_SCOPE_VERSION {
            writeln!(&mut s)?;
        }
        let overrides = self.overrides.fields();
        for (i, (_, v)) in overrides.iter().enumerate() {
            if i > 0 {
                s.push('\n');
            }
            s.push_str(v.as_deref().unwrap_or_default());
        }

        debug!("string to sign: {:?}", &s);

        Ok(s)
    }

    /// Compute the HMAC-SHA256 signature of the string to sign.
    pub(crate) fn sign(&self, cred: &Credential, scope: &ResourceScope) -> Result<Vec<u8>> {
        let key = cred.signing_key()?;
        let string_to_sign = self.string_to_sign(cred.account_name(), scope)?;
        Ok(hmac_sha256(&key, string_to_sign.as_bytes()))
    }

    /// Query pairs without the signature, in emission order.
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (SIGNED_VERSION, self.version.clone()),
            (SIGNED_RESOURCE, self.resource.to_string()),
        ];

        if let Some(v) = self.start {
            pairs.push((SIGNED_START, format_iso8601(v)));
        }
        if let Some(v) = self.expiry {
            pairs.push((SIGNED_EXPIRY, format_iso8601(v)));
        }
        if let Some(v) = self.permissions {
            pairs.push((SIGNED_PERMISSIONS, v.encode()));
        }
        if let Some(v) = &self.identifier {
            pairs.push((SIGNED_IDENTIFIER, v.clone()));
        }
        if let Some(v) = self.ip_range {
            pairs.push((SIGNED_IP, v.to_string()));
        }
        if let Some(v) = self.protocol {
            pairs.push((SIGNED_PROTOCOL, v.to_string()));
        }
        for (k, v) in self.overrides.fields() {
            if let Some(v) = v {
                pairs.push((k, v.clone()));
            }
        }

        pairs
    }
}

/// A signed service SAS.
///
/// Tokens are bearer credentials. They cannot be revoked one by one, only
/// by removing the stored policy they reference.
#[derive(Clone)]
pub struct SasToken {
    scope: ResourceScope,
    source: ConstraintSource,
    signature: Vec<u8>,
    query: String,
}

impl Debug for SasToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasToken")
            .field("scope", &self.scope)
            .field("source", &self.source)
            .field("query", &Redact::from(&self.query))
            .finish()
    }
}

impl SasToken {
    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    pub fn source(&self) -> &ConstraintSource {
        &self.source
    }

    /// Raw HMAC-SHA256 digest.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Percent-encoded query string, without leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Append the token to the query of a request.
    pub fn apply(&self, parts: &mut http::request::Parts) -> Result<()> {
        let mut uri_parts = parts.uri.clone().into_parts();
        let paq = match &uri_parts.path_and_query {
            Some(paq) => match paq.query() {
                Some(q) if !q.is_empty() => format!("{}?{}&{}", paq.path(), q, self.query),
                _ => format!("{}?{}", paq.path(), self.query),
            },
            None => format!("/?{}", self.query),
        };
        uri_parts.path_and_query = Some(PathAndQuery::from_str(&paq).map_err(|e| {
            Error::unexpected("failed to append token to request uri").with_source(e)
        })?);
        parts.uri = Uri::from_parts(uri_parts)?;
        Ok(())
    }
}

impl Display for SasToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.query)
    }
}

/// Builder that issues service SAS tokens for containers and blobs.
///
/// - [Create a service SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas)
#[derive(Debug, Clone)]
pub struct SasBuilder {
    version: String,
    overrides: ResponseOverrides,
}

impl Default for SasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SasBuilder {
    /// Create a new builder signing with the default version.
    pub fn new() -> Self {
        Self {
            version: DEFAULT_SAS_VERSION.to_string(),
            overrides: ResponseOverrides::default(),
        }
    }

    /// Specify the signed version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Specify response header overrides to carry in every token.
    pub fn with_response_overrides(mut self, overrides: ResponseOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sign a token for `scope`.
    ///
    /// Fails with `SigningKeyInvalid` if the account key cannot be decoded,
    /// `ResourceMismatch` if the scope names an invalid container or blob,
    /// or `InvalidConstraint` if the stored policy identifier is malformed.
    pub fn build(
        &self,
        scope: &ResourceScope,
        source: ConstraintSource,
        cred: &Credential,
    ) -> Result<SasToken> {
        scope.validate()?;
        if let ConstraintSource::StoredPolicy(id) = &source {
            validate_identifier(id)?;
        }

        let params = SasParameters::new(
            &self.version,
            scope.signed_resource(),
            &source,
            &self.overrides,
        );
        let signature = params.sign(cred, scope)?;

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in params.query_pairs() {
            serializer.append_pair(k, &v);
        }
        serializer.append_pair(SIGNATURE, &base64_encode(&signature));
        let query = serializer.finish();

        debug!("issued sas for {scope}: {:?}", Redact::from(&query));

        Ok(SasToken {
            scope: scope.clone(),
            source,
            signature,
            query,
        })
    }
}
