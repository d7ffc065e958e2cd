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

use crate::build::{ResponseOverrides, SasParameters};
use crate::constants::*;
use crate::{
    AccessConstraint, Credential, IpRange, Permission, PermissionSet, Protocol, ResourceScope,
    SignedResource, StoredPolicyRegistry,
};
use http::uri::Scheme;
use log::debug;
use percent_encoding::percent_decode_str;
use sasign_core::hash::{base64_decode, constant_time_eq};
use sasign_core::time::{format_iso8601, now, parse_iso8601, DateTime};
use sasign_core::utils::Redact;
use sasign_core::{Error, ErrorKind, Result};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// SAS fields parsed out of a request query.
#[derive(Clone)]
pub struct SasQuery {
    params: SasParameters,
    signature: String,
}

impl Debug for SasQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasQuery")
            .field("params", &self.params)
            .field("signature", &Redact::from(&self.signature))
            .finish()
    }
}

impl SasQuery {
    /// Parse a raw query string, with or without the leading `?`.
    ///
    /// Parameters that are not part of a SAS are ignored. A stored policy
    /// token must not also carry inline constraint fields.
    pub fn parse(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut seen = HashSet::new();
        let mut version = None;
        let mut resource = None;
        let mut signature = None;
        let mut start = None;
        let mut expiry = None;
        let mut permissions = None;
        let mut identifier = None;
        let mut ip_range = None;
        let mut protocol = None;
        let mut overrides = ResponseOverrides::default();

        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            let key: &str = &k;
            if !is_sas_field(key) {
                continue;
            }
            if !seen.insert(key.to_string()) {
                return Err(Error::token_malformed(format!(
                    "query carries {key} more than once"
                )));
            }
            let v = v.into_owned();
            match key {
                SIGNED_VERSION => version = Some(v),
                SIGNED_RESOURCE => resource = Some(v.parse::<SignedResource>()?),
                SIGNATURE => signature = Some(v),
                SIGNED_START => start = Some(parse_iso8601(&v)?),
                SIGNED_EXPIRY => expiry = Some(parse_iso8601(&v)?),
                SIGNED_PERMISSIONS => permissions = Some(PermissionSet::decode(&v)?),
                SIGNED_IDENTIFIER => identifier = Some(v),
                SIGNED_IP => ip_range = Some(v.parse::<IpRange>()?),
                SIGNED_PROTOCOL => protocol = Some(v.parse::<Protocol>()?),
                _ => {
                    overrides.set(key, v);
                }
            }
        }

        let missing = |name: &str| Error::token_malformed(format!("query is missing {name}"));
        let version = version.ok_or_else(|| missing(SIGNED_VERSION))?;
        let resource = resource.ok_or_else(|| missing(SIGNED_RESOURCE))?;
        let signature = signature.ok_or_else(|| missing(SIGNATURE))?;

        let has_inline = start.is_some()
            || expiry.is_some()
            || permissions.is_some()
            || ip_range.is_some()
            || protocol.is_some();
        if identifier.is_some() && has_inline {
            return Err(Error::token_malformed(
                "stored policy token must not carry inline constraint fields",
            ));
        }
        if identifier.is_none() && permissions.is_none() {
            return Err(Error::token_malformed(format!(
                "query carries neither {SIGNED_PERMISSIONS} nor {SIGNED_IDENTIFIER}"
            )));
        }

        Ok(Self {
            params: SasParameters {
                version,
                resource,
                start,
                expiry,
                permissions,
                identifier,
                ip_range,
                protocol,
                overrides,
            },
            signature,
        })
    }

    pub fn version(&self) -> &str {
        &self.params.version
    }

    pub fn signed_resource(&self) -> SignedResource {
        self.params.resource
    }

    /// Identifier of the stored policy this token defers to.
    pub fn identifier(&self) -> Option<&str> {
        self.params.identifier.as_deref()
    }

    fn inline_constraint(&self) -> Result<AccessConstraint> {
        let p = &self.params;
        let mut constraint =
            AccessConstraint::new(p.start, p.expiry, p.permissions.unwrap_or_default())?;
        if let Some(ip_range) = p.ip_range {
            constraint = constraint.with_ip_range(ip_range);
        }
        if let Some(protocol) = p.protocol {
            constraint = constraint.with_protocol(protocol);
        }
        Ok(constraint)
    }
}

fn is_sas_field(key: &str) -> bool {
    matches!(
        key,
        SIGNED_VERSION
            | SIGNED_RESOURCE
            | SIGNATURE
            | SIGNED_START
            | SIGNED_EXPIRY
            | SIGNED_PERMISSIONS
            | SIGNED_IDENTIFIER
            | SIGNED_IP
            | SIGNED_PROTOCOL
            | RESPONSE_CACHE_CONTROL
            | RESPONSE_CONTENT_DISPOSITION
            | RESPONSE_CONTENT_ENCODING
            | RESPONSE_CONTENT_LANGUAGE
            | RESPONSE_CONTENT_TYPE
    )
}

/// What the request presenting a token is trying to do.
#[derive(Debug, Clone)]
pub struct RequestContext {
    operation: Permission,
    source_ip: Option<Ipv4Addr>,
    used_https: bool,
    time: Option<DateTime>,
}

impl RequestContext {
    /// Create a context for an https request performing `operation` now.
    pub fn new(operation: Permission) -> Self {
        Self {
            operation,
            source_ip: None,
            used_https: true,
            time: None,
        }
    }

    pub fn with_source_ip(mut self, ip: Ipv4Addr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    pub fn with_https(mut self, used_https: bool) -> Self {
        self.used_https = used_https;
        self
    }

    /// Evaluate the token at `time` instead of the current clock.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn operation(&self) -> Permission {
        self.operation
    }
}

/// Access granted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedGrant {
    /// Scope the token was signed for.
    pub scope: ResourceScope,
    pub permissions: PermissionSet,
    /// Stored policy the grant came from.
    pub policy: Option<String>,
    pub expiry: Option<DateTime>,
}

/// Verifies tokens presented to the service.
///
/// Checks run in a fixed order and the first failing one decides the error:
///
/// 1. the token scope covers the requested resource
/// 2. the signature matches
/// 3. the stored policy, if referenced, still exists
/// 4. the time window contains the request time
/// 5. the source address is inside the allowed range
/// 6. the protocol is allowed
/// 7. the operation is permitted
#[derive(Debug)]
pub struct TokenVerifier {
    credential: Credential,
    registry: Arc<StoredPolicyRegistry>,
}

impl TokenVerifier {
    pub fn new(credential: Credential, registry: Arc<StoredPolicyRegistry>) -> Self {
        Self {
            credential,
            registry,
        }
    }

    pub fn registry(&self) -> &StoredPolicyRegistry {
        &self.registry
    }

    /// Verify `query` for a request on `scope`.
    pub fn verify(
        &self,
        scope: &ResourceScope,
        query: &SasQuery,
        ctx: &RequestContext,
    ) -> Result<VerifiedGrant> {
        let result = self.check(scope, query, ctx);
        if let Err(err) = &result {
            debug!("rejected sas for {scope}: {err}");
        }
        result
    }

    fn check(
        &self,
        scope: &ResourceScope,
        query: &SasQuery,
        ctx: &RequestContext,
    ) -> Result<VerifiedGrant> {
        scope.validate()?;
        let signed_scope = scope.signed_scope(query.params.resource)?;

        let expected = query.params.sign(&self.credential, &signed_scope)?;
        let provided = base64_decode(&query.signature).map_err(|e| {
            Error::signature_mismatch("signature is not valid base64").with_source(e)
        })?;
        if !constant_time_eq(&expected, &provided) {
            return Err(Error::signature_mismatch(format!(
                "signature does not match for {signed_scope}"
            )));
        }

        let constraint = match &query.params.identifier {
            Some(id) => self
                .registry
                .resolve(signed_scope.container_name(), id)
                .map_err(|e| match e.kind() {
                    ErrorKind::PolicyNotFound => Error::revoked_or_unknown_policy(format!(
                        "stored policy {id} is revoked or unknown"
                    ))
                    .with_source(e),
                    _ => e,
                })?,
            None => query.inline_constraint()?,
        };

        let time = ctx.time.unwrap_or_else(now);
        if constraint.is_not_yet_valid(time) {
            return Err(Error::not_yet_valid(format!(
                "token is not valid before {}",
                constraint.start().map(format_iso8601).unwrap_or_default()
            )));
        }
        if constraint.is_expired(time) {
            return Err(Error::expired(format!(
                "token expired at {}",
                constraint.expiry().map(format_iso8601).unwrap_or_default()
            )));
        }

        if let Some(range) = constraint.ip_range() {
            match ctx.source_ip {
                Some(ip) if range.contains(ip) => {}
                Some(ip) => {
                    return Err(Error::ip_not_allowed(format!(
                        "source address {ip} is outside {range}"
                    )))
                }
                None => {
                    return Err(Error::ip_not_allowed(format!(
                        "token is restricted to {range} but request has no source address"
                    )))
                }
            }
        }

        if !constraint.is_protocol_allowed(ctx.used_https) {
            return Err(Error::insecure_protocol("token requires https"));
        }

        if !constraint.permissions().contains(ctx.operation) {
            return Err(Error::permission_denied(format!(
                "token grants {} which does not include {}",
                constraint.permissions(),
                ctx.operation
            )));
        }

        Ok(VerifiedGrant {
            scope: signed_scope,
            permissions: constraint.permissions(),
            policy: query.params.identifier.clone(),
            expiry: constraint.expiry(),
        })
    }

    /// Verify the token carried in the query of an incoming request.
    ///
    /// The scope is taken from the path. If the uri carries a scheme it
    /// overrides the protocol of `ctx`.
    pub fn verify_request(
        &self,
        parts: &http::request::Parts,
        ctx: &RequestContext,
    ) -> Result<VerifiedGrant> {
        let path = percent_decode_str(parts.uri.path())
            .decode_utf8()
            .map_err(|e| Error::token_malformed("request path is not valid utf-8").with_source(e))?;
        let scope = ResourceScope::from_path(&path)?;
        let query = SasQuery::parse(parts.uri.query().unwrap_or_default())?;

        let mut ctx = ctx.clone();
        if let Some(scheme) = parts.uri.scheme() {
            ctx.used_https = scheme == &Scheme::HTTPS;
        }

        self.verify(&scope, &query, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintSource, SasBuilder};
    use pretty_assertions::assert_eq;
    use sasign_core::hash::base64_encode;
    use test_case::test_case;

    fn t(s: &str) -> DateTime {
        parse_iso8601(s).unwrap()
    }

    fn cred() -> Credential {
        Credential::new("account", base64_encode(b"verify-key"))
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(cred(), Arc::new(StoredPolicyRegistry::new()))
    }

    fn sign(scope: &ResourceScope, source: ConstraintSource) -> SasQuery {
        let token = SasBuilder::new().build(scope, source, &cred()).unwrap();
        SasQuery::parse(token.query()).unwrap()
    }

    fn window() -> AccessConstraint {
        AccessConstraint::new(
            Some(t("2024-01-01T00:00:00Z")),
            Some(t("2024-01-01T01:00:00Z")),
            Permission::Read | Permission::List,
        )
        .unwrap()
    }

    #[test_case("sr=c&sp=r&sig=abc" ; "missing version")]
    #[test_case("sv=2019-12-12&sp=r&sig=abc" ; "missing resource")]
    #[test_case("sv=2019-12-12&sr=c&sp=r" ; "missing signature")]
    #[test_case("sv=2019-12-12&sr=c&sig=abc" ; "neither permissions nor identifier")]
    #[test_case("sv=2019-12-12&sr=c&si=p&sp=r&sig=abc" ; "identifier with permissions")]
    #[test_case("sv=2019-12-12&sr=c&si=p&se=2024-01-01T00%3A00%3A00Z&sig=abc" ; "identifier with expiry")]
    #[test_case("sv=2019-12-12&sr=c&sp=r&sp=w&sig=abc" ; "duplicated field")]
    #[test_case("sv=2019-12-12&sr=s&sp=r&sig=abc" ; "unknown resource")]
    #[test_case("sv=2019-12-12&sr=c&sp=r&se=tomorrow&sig=abc" ; "bad expiry")]
    fn test_parse_malformed(query: &str) {
        assert_eq!(
            SasQuery::parse(query).unwrap_err().kind(),
            ErrorKind::TokenMalformed
        );
    }

    #[test]
    fn test_parse_bad_permissions() {
        assert_eq!(
            SasQuery::parse("sv=2019-12-12&sr=c&sp=rx&sig=abc")
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedPermissionString
        );
    }

    #[test]
    fn test_parse_ignores_other_params() {
        let raw = "?restype=container&comp=list&sv=2019-12-12&sr=c&si=p&sig=abc";
        let q = SasQuery::parse(raw).unwrap();
        assert_eq!(q.version(), "2019-12-12");
        assert_eq!(q.signed_resource(), SignedResource::Container);
        assert_eq!(q.identifier(), Some("p"));
    }

    #[test]
    fn test_verify_inline() {
        let scope = ResourceScope::container("logs");
        let query = sign(&scope, ConstraintSource::Inline(window()));

        let grant = verifier()
            .verify(
                &ResourceScope::object("logs", "app.log"),
                &query,
                &RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:30:00Z")),
            )
            .unwrap();
        assert_eq!(
            grant,
            VerifiedGrant {
                scope,
                permissions: Permission::Read | Permission::List,
                policy: None,
                expiry: Some(t("2024-01-01T01:00:00Z")),
            }
        );
    }

    #[test_case("2023-12-31T23:59:59Z", Some(ErrorKind::NotYetValid) ; "before start")]
    #[test_case("2024-01-01T00:00:00Z", None ; "at start")]
    #[test_case("2024-01-01T01:00:00Z", None ; "at expiry")]
    #[test_case("2024-01-01T01:00:01Z", Some(ErrorKind::Expired) ; "after expiry")]
    fn test_verify_window(at: &str, expected: Option<ErrorKind>) {
        let scope = ResourceScope::container("logs");
        let query = sign(&scope, ConstraintSource::Inline(window()));
        let result = verifier().verify(
            &scope,
            &query,
            &RequestContext::new(Permission::List).with_time(t(at)),
        );
        assert_eq!(result.err().map(|e| e.kind()), expected);
    }

    #[test]
    fn test_verify_ip_and_protocol() {
        let scope = ResourceScope::object("logs", "app.log");
        let constraint = window()
            .with_ip_range(
                IpRange::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 255)).unwrap(),
            )
            .with_protocol(Protocol::HttpsOnly);
        let query = sign(&scope, ConstraintSource::Inline(constraint));
        let ctx = RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:10:00Z"));
        let v = verifier();

        assert!(v
            .verify(&scope, &query, &ctx.clone().with_source_ip(Ipv4Addr::new(10, 0, 0, 7)))
            .is_ok());

        for (ctx, kind) in [
            (
                ctx.clone().with_source_ip(Ipv4Addr::new(10, 0, 1, 7)),
                ErrorKind::IpNotAllowed,
            ),
            (ctx.clone(), ErrorKind::IpNotAllowed),
            (
                ctx.clone()
                    .with_source_ip(Ipv4Addr::new(10, 0, 0, 7))
                    .with_https(false),
                ErrorKind::InsecureProtocol,
            ),
        ] {
            assert_eq!(v.verify(&scope, &query, &ctx).unwrap_err().kind(), kind);
        }
    }

    #[test]
    fn test_verify_permission_denied() {
        let scope = ResourceScope::container("logs");
        let query = sign(&scope, ConstraintSource::Inline(window()));
        let err = verifier()
            .verify(
                &scope,
                &query,
                &RequestContext::new(Permission::Write).with_time(t("2024-01-01T00:10:00Z")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_verify_signature_mismatch() {
        let scope = ResourceScope::container("logs");
        let token = SasBuilder::new()
            .build(&scope, ConstraintSource::Inline(window()), &cred())
            .unwrap();
        let ctx = RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:10:00Z"));

        // Widened permissions.
        let tampered = token.query().replace("sp=rl", "sp=rwl");
        let query = SasQuery::parse(&tampered).unwrap();
        assert_eq!(
            verifier().verify(&scope, &query, &ctx).unwrap_err().kind(),
            ErrorKind::SignatureMismatch
        );

        // Other container.
        let query = SasQuery::parse(token.query()).unwrap();
        assert_eq!(
            verifier()
                .verify(&ResourceScope::container("other"), &query, &ctx)
                .unwrap_err()
                .kind(),
            ErrorKind::SignatureMismatch
        );

        // Other account key.
        let other = TokenVerifier::new(
            Credential::new("account", base64_encode(b"other-key")),
            Arc::new(StoredPolicyRegistry::new()),
        );
        assert_eq!(
            other.verify(&scope, &query, &ctx).unwrap_err().kind(),
            ErrorKind::SignatureMismatch
        );

        // Garbage signature.
        let garbage = format!("{}&sig=%25%25", token.query().split("&sig=").next().unwrap());
        let query = SasQuery::parse(&garbage).unwrap();
        assert_eq!(
            verifier().verify(&scope, &query, &ctx).unwrap_err().kind(),
            ErrorKind::SignatureMismatch
        );
    }

    #[test]
    fn test_verify_blob_token_on_container() {
        let query = sign(
            &ResourceScope::object("logs", "app.log"),
            ConstraintSource::Inline(window()),
        );
        let err = verifier()
            .verify(
                &ResourceScope::container("logs"),
                &query,
                &RequestContext::new(Permission::List).with_time(t("2024-01-01T00:10:00Z")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceMismatch);
    }

    #[test]
    fn test_verify_rejects_invalid_scope() {
        let ctx = RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:10:00Z"));
        let token_scope = ResourceScope::object("logs", "2024/app.log");
        let query = sign(&token_scope, ConstraintSource::Inline(window()));
        assert!(verifier().verify(&token_scope, &query, &ctx).is_ok());

        // Same canonicalized resource, but the container name holds a slash.
        let nested = ResourceScope::object("logs/2024", "app.log");
        assert_eq!(
            nested.canonicalized("account"),
            token_scope.canonicalized("account")
        );
        for scope in [
            nested,
            ResourceScope::object("logs", ""),
            ResourceScope::container("Logs"),
        ] {
            assert_eq!(
                verifier().verify(&scope, &query, &ctx).unwrap_err().kind(),
                ErrorKind::ResourceMismatch,
                "{scope:?}"
            );
        }
    }

    #[test]
    fn test_verify_stored_policy_revocation() {
        let scope = ResourceScope::object("logs", "app.log");
        let v = verifier();
        v.registry().upsert("logs", "readers", window()).unwrap();

        let query = sign(&scope, ConstraintSource::StoredPolicy("readers".to_string()));
        let ctx = RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:10:00Z"));

        let grant = v.verify(&scope, &query, &ctx).unwrap();
        assert_eq!(grant.policy.as_deref(), Some("readers"));

        assert!(v.registry().remove("logs", "readers").unwrap());
        assert_eq!(
            v.verify(&scope, &query, &ctx).unwrap_err().kind(),
            ErrorKind::RevokedOrUnknownPolicy
        );
    }

    #[test]
    fn test_verify_request() {
        let scope = ResourceScope::object("logs", "2024/app log.txt");
        let token = SasBuilder::new()
            .build(&scope, ConstraintSource::Inline(window()), &cred())
            .unwrap();
        let ctx = RequestContext::new(Permission::Read).with_time(t("2024-01-01T00:10:00Z"));

        let url = "https://account.blob.core.windows.net/logs/2024/app%20log.txt";
        let mut parts = http::Request::get(url)
            .body(())
            .unwrap()
            .into_parts()
            .0;
        token.apply(&mut parts).unwrap();
        assert!(verifier().verify_request(&parts, &ctx).is_ok());

        let mut parts = http::Request::get(url.replace("https://", "http://"))
            .body(())
            .unwrap()
            .into_parts()
            .0;
        token.apply(&mut parts).unwrap();
        assert!(verifier().verify_request(&parts, &ctx).is_ok());
    }
}
