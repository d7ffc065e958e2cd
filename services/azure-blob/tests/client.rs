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

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use chrono::{Duration, Utc};
use http::StatusCode;
use pretty_assertions::assert_eq;
use sasign_azure_blob::{
    AccessConstraint, AccessError, ConstraintSource, IpRange, Permission, PermissionSet,
    ResourceScope, SasBuilder, SasClient, SasQuery, TokenVerifier,
};
use sasign_core::{BackingStore, Context, ErrorKind};
use sasign_store_memory::MemoryStore;

use crate::init_verifier;

/// Window around the real clock, the client verifies at the current time.
fn live(permissions: impl Into<PermissionSet>) -> AccessConstraint {
    AccessConstraint::new(
        Some(Utc::now() - Duration::minutes(5)),
        Some(Utc::now() + Duration::minutes(30)),
        permissions.into(),
    )
    .unwrap()
}

async fn setup() -> Result<(Context, MemoryStore, Arc<TokenVerifier>, SasBuilder)> {
    let store = MemoryStore::new();
    let ctx = Context::new().with_store(store.clone());
    ctx.store().create_container_if_absent("inbox").await?;
    ctx.store()
        .upload("inbox", "existing.txt", Bytes::from_static(b"hello"))
        .await?;
    ctx.store().create_container_if_absent("inbox/drafts").await?;
    ctx.store()
        .upload("inbox/drafts", "plan.txt", Bytes::from_static(b"private"))
        .await?;

    let (_, verifier) = init_verifier();
    Ok((ctx, store, Arc::new(verifier), SasBuilder::new()))
}

fn sas_client(
    ctx: &Context,
    verifier: &Arc<TokenVerifier>,
    builder: &SasBuilder,
    scope: ResourceScope,
    source: ConstraintSource,
) -> SasClient {
    let (cred, _) = init_verifier();
    let token = builder.build(&scope, source, &cred).unwrap();
    SasClient::new(
        ctx.clone(),
        verifier.clone(),
        SasQuery::parse(token.query()).unwrap(),
    )
}

#[tokio::test]
async fn test_container_token_flow() -> Result<()> {
    let (ctx, store, verifier, builder) = setup().await?;
    let client = sas_client(
        &ctx,
        &verifier,
        &builder,
        ResourceScope::container("inbox"),
        ConstraintSource::Inline(live(Permission::Write | Permission::List)),
    );

    client
        .upload("inbox", "new.txt", Bytes::from_static(b"data"))
        .await?;
    client
        .set_metadata(
            "inbox",
            "new.txt",
            HashMap::from([("owner".to_string(), "ops".to_string())]),
        )
        .await?;
    assert_eq!(client.list("inbox").await?, vec!["existing.txt", "new.txt"]);
    assert_eq!(store.metadata("inbox", "new.txt").await?["owner"], "ops");

    let err = client.download("inbox", "new.txt").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::PermissionDenied));
    let err = client.delete("inbox", "new.txt").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::PermissionDenied));

    // Refused calls never reach the store.
    assert_eq!(store.download("inbox", "new.txt").await?, Bytes::from_static(b"data"));
    Ok(())
}

#[tokio::test]
async fn test_object_token_flow() -> Result<()> {
    let (ctx, _, verifier, builder) = setup().await?;
    verifier.registry().upsert(
        "inbox",
        "owners",
        live(Permission::Read | Permission::Write | Permission::Create | Permission::Delete),
    )?;
    let client = sas_client(
        &ctx,
        &verifier,
        &builder,
        ResourceScope::object("inbox", "existing.txt"),
        ConstraintSource::StoredPolicy("owners".to_string()),
    );

    assert_eq!(
        client.download("inbox", "existing.txt").await?,
        Bytes::from_static(b"hello")
    );

    // Object tokens cover only their own blob.
    let err = client.download("inbox", "new.txt").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::SignatureMismatch));
    let err = client.list("inbox").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::ResourceMismatch));

    client.delete("inbox", "existing.txt").await?;

    // Authorized but failed in the store.
    let err = client.download("inbox", "existing.txt").await.unwrap_err();
    match err {
        AccessError::Store(e) => assert_eq!(e.status, StatusCode::NOT_FOUND),
        AccessError::Engine(e) => panic!("expected store error, got {e}"),
    }

    verifier.registry().remove("inbox", "owners")?;
    let err = client
        .upload("inbox", "existing.txt", Bytes::from_static(b"again"))
        .await
        .unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::RevokedOrUnknownPolicy));
    assert!(err.is_authorization_failure());
    Ok(())
}

#[tokio::test]
async fn test_token_cannot_cross_into_nested_container_name() -> Result<()> {
    let (ctx, store, verifier, builder) = setup().await?;
    let client = sas_client(
        &ctx,
        &verifier,
        &builder,
        ResourceScope::object("inbox", "drafts/plan.txt"),
        ConstraintSource::Inline(live(Permission::Read | Permission::Write)),
    );

    // The token is for a blob inside "inbox" and the store has no such blob.
    let err = client.download("inbox", "drafts/plan.txt").await.unwrap_err();
    assert!(matches!(err, AccessError::Store(_)), "{err}");

    // Splitting the same path differently must not reach another container.
    let err = client.download("inbox/drafts", "plan.txt").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::ResourceMismatch));
    let err = client
        .upload("inbox/drafts", "plan.txt", Bytes::from_static(b"overwritten"))
        .await
        .unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::ResourceMismatch));

    assert_eq!(
        store.download("inbox/drafts", "plan.txt").await?,
        Bytes::from_static(b"private")
    );
    Ok(())
}

#[tokio::test]
async fn test_client_network_restrictions() -> Result<()> {
    let (ctx, _, verifier, builder) = setup().await?;
    let constraint = live(Permission::Read)
        .with_ip_range(IpRange::single(Ipv4Addr::new(203, 0, 113, 7)));
    let client = sas_client(
        &ctx,
        &verifier,
        &builder,
        ResourceScope::container("inbox"),
        ConstraintSource::Inline(constraint),
    );

    let err = client.download("inbox", "existing.txt").await.unwrap_err();
    assert_eq!(err.engine_kind(), Some(ErrorKind::IpNotAllowed));

    let client = client.with_source_ip(Ipv4Addr::new(203, 0, 113, 7));
    client.download("inbox", "existing.txt").await?;
    Ok(())
}
