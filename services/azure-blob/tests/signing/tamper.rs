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

use std::net::Ipv4Addr;

use sasign_azure_blob::{
    ConstraintSource, IpRange, Permission, Protocol, RequestContext, ResourceScope, SasBuilder,
    SasQuery, SasToken,
};
use sasign_core::ErrorKind;
use test_case::test_case;

use super::hour;
use crate::{init_verifier, t};

fn restricted_token() -> SasToken {
    let (cred, _) = init_verifier();
    let constraint = hour(Permission::Read)
        .with_ip_range(
            IpRange::new(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 50)).unwrap(),
        )
        .with_protocol(Protocol::HttpsOnly);
    SasBuilder::new()
        .build(
            &ResourceScope::object("vault", "secret.txt"),
            ConstraintSource::Inline(constraint),
            &cred,
        )
        .unwrap()
}

fn ctx() -> RequestContext {
    RequestContext::new(Permission::Read)
        .with_source_ip(Ipv4Addr::new(192, 168, 1, 10))
        .with_time(t("2030-01-01T00:10:00Z"))
}

#[test]
fn test_untouched_token_verifies() {
    let (_, verifier) = init_verifier();
    let token = restricted_token();
    verifier
        .verify(
            token.scope(),
            &SasQuery::parse(token.query()).unwrap(),
            &ctx(),
        )
        .unwrap();
}

#[test_case("se=2030-01-01T01%3A00%3A00Z", "se=2031-01-01T01%3A00%3A00Z" ; "extended expiry")]
#[test_case("st=2030-01-01T00%3A00%3A00Z", "st=2029-01-01T00%3A00%3A00Z" ; "earlier start")]
#[test_case("sp=r", "sp=rwdl" ; "widened permissions")]
#[test_case("sip=192.168.1.1-192.168.1.50", "sip=0.0.0.0-255.255.255.255" ; "widened ip range")]
#[test_case("spr=https", "spr=https%2Chttp" ; "downgraded protocol")]
#[test_case("sr=b", "sr=c" ; "widened resource")]
fn test_mutated_field_is_rejected(from: &str, to: &str) {
    let (_, verifier) = init_verifier();
    let token = restricted_token();
    assert!(token.query().contains(from), "{} lacks {from}", token.query());

    let tampered = token.query().replace(from, to);
    let err = verifier
        .verify(token.scope(), &SasQuery::parse(&tampered).unwrap(), &ctx())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[test]
fn test_other_path_is_rejected() {
    let (_, verifier) = init_verifier();
    let token = restricted_token();
    let query = SasQuery::parse(token.query()).unwrap();

    for scope in [
        ResourceScope::object("vault", "other.txt"),
        ResourceScope::object("other", "secret.txt"),
    ] {
        let err = verifier.verify(&scope, &query, &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureMismatch, "scope: {scope}");
    }
}

#[test]
fn test_restrictions_apply_after_signature() {
    let (_, verifier) = init_verifier();
    let token = restricted_token();
    let query = SasQuery::parse(token.query()).unwrap();

    let err = verifier
        .verify(
            token.scope(),
            &query,
            &ctx().with_source_ip(Ipv4Addr::new(192, 168, 2, 10)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IpNotAllowed);

    let err = verifier
        .verify(token.scope(), &query, &ctx().with_https(false))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsecureProtocol);
}
