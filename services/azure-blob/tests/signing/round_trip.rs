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

use anyhow::Result;
use pretty_assertions::assert_eq;
use sasign_azure_blob::{
    ConstraintSource, Permission, PermissionSet, RequestContext, ResourceScope,
    ResponseOverrides, SasBuilder, SasQuery,
};
use sasign_core::ErrorKind;
use test_case::test_case;

use super::hour;
use crate::{init_verifier, t};

#[test]
fn test_grant_carries_signed_permissions() -> Result<()> {
    let (cred, verifier) = init_verifier();
    let scope = ResourceScope::container("reports");
    let permissions = Permission::Read | Permission::Add | Permission::List;

    let token =
        SasBuilder::new().build(&scope, ConstraintSource::Inline(hour(permissions)), &cred)?;
    let grant = verifier.verify(
        &scope,
        &SasQuery::parse(token.query())?,
        &RequestContext::new(Permission::Add).with_time(t("2030-01-01T00:30:00Z")),
    )?;

    assert_eq!(grant.permissions, permissions);
    assert_eq!(grant.scope, scope);
    assert_eq!(grant.policy, None);
    assert_eq!(grant.expiry, Some(t("2030-01-01T01:00:00Z")));
    Ok(())
}

#[test_case(Permission::Write, None ; "write allowed")]
#[test_case(Permission::List, None ; "list allowed")]
#[test_case(Permission::Read, Some(ErrorKind::PermissionDenied) ; "read denied")]
#[test_case(Permission::Delete, Some(ErrorKind::PermissionDenied) ; "delete denied")]
fn test_container_write_list_token(op: Permission, expected: Option<ErrorKind>) {
    let (cred, verifier) = init_verifier();
    let scope = ResourceScope::container("uploads");
    let token = SasBuilder::new()
        .build(
            &scope,
            ConstraintSource::Inline(hour(Permission::Write | Permission::List)),
            &cred,
        )
        .unwrap();
    let query = SasQuery::parse(token.query()).unwrap();

    // Writes target blobs inside the container.
    let target = match op {
        Permission::List => scope.clone(),
        _ => ResourceScope::object("uploads", "data.bin"),
    };
    let result = verifier.verify(
        &target,
        &query,
        &RequestContext::new(op).with_time(t("2030-01-01T00:05:00Z")),
    );
    assert_eq!(result.err().map(|e| e.kind()), expected);
}

#[test]
fn test_permission_order_is_canonical() {
    let a: PermissionSet = [Permission::Delete, Permission::Read].into_iter().collect();
    let b = Permission::Read | Permission::Delete;
    assert_eq!(a.encode(), "rd");
    assert_eq!(b.encode(), "rd");

    let (cred, _) = init_verifier();
    let scope = ResourceScope::object("tmp", "blob.txt");
    let sig_a = SasBuilder::new()
        .build(&scope, ConstraintSource::Inline(hour(a)), &cred)
        .unwrap();
    let sig_b = SasBuilder::new()
        .build(&scope, ConstraintSource::Inline(hour(b)), &cred)
        .unwrap();
    assert_eq!(sig_a.signature(), sig_b.signature());
    assert!(sig_a.query().contains("sp=rd"));
}

#[test_case("2030-01-01T01:00:00Z", None ; "at expiry")]
#[test_case("2030-01-01T01:00:01Z", Some(ErrorKind::Expired) ; "one second after")]
#[test_case("2030-01-01T00:00:00Z", None ; "at start")]
#[test_case("2029-12-31T23:59:59Z", Some(ErrorKind::NotYetValid) ; "one second before")]
fn test_window_boundaries(at: &str, expected: Option<ErrorKind>) {
    let (cred, verifier) = init_verifier();
    let scope = ResourceScope::object("tmp", "blob.txt");
    let token = SasBuilder::new()
        .build(&scope, ConstraintSource::Inline(hour(Permission::Read)), &cred)
        .unwrap();
    let result = verifier.verify(
        &scope,
        &SasQuery::parse(token.query()).unwrap(),
        &RequestContext::new(Permission::Read).with_time(t(at)),
    );
    assert_eq!(result.err().map(|e| e.kind()), expected);
}

#[test]
fn test_response_overrides_are_signed() -> Result<()> {
    let (cred, verifier) = init_verifier();
    let scope = ResourceScope::object("docs", "report.pdf");
    let token = SasBuilder::new()
        .with_response_overrides(ResponseOverrides {
            content_disposition: Some("attachment; filename=report.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            ..Default::default()
        })
        .build(&scope, ConstraintSource::Inline(hour(Permission::Read)), &cred)?;

    assert!(token.query().contains("rsct=application%2Fpdf"));

    let ctx = RequestContext::new(Permission::Read).with_time(t("2030-01-01T00:10:00Z"));
    verifier.verify(&scope, &SasQuery::parse(token.query())?, &ctx)?;

    let tampered = token.query().replace("rsct=application%2Fpdf", "rsct=text%2Fhtml");
    let err = verifier
        .verify(&scope, &SasQuery::parse(&tampered)?, &ctx)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
    Ok(())
}

#[test]
fn test_configured_version_is_signed() -> Result<()> {
    let (cred, verifier) = init_verifier();
    let scope = ResourceScope::container("versions");
    let token = SasBuilder::new()
        .with_version("2020-12-06")
        .build(&scope, ConstraintSource::Inline(hour(Permission::List)), &cred)?;

    let query = SasQuery::parse(token.query())?;
    assert_eq!(query.version(), "2020-12-06");
    verifier.verify(
        &scope,
        &query,
        &RequestContext::new(Permission::List).with_time(t("2030-01-01T00:10:00Z")),
    )?;
    Ok(())
}
