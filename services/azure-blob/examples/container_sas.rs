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

//! Walks through container and blob SAS against an in-memory store.
//!
//! Reads `AZBLOB_ACCOUNT_NAME` and `AZBLOB_ACCOUNT_KEY` if set, otherwise
//! signs with the development storage account.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use chrono::{Duration, Utc};
use sasign_azure_blob::{
    AccessConstraint, AccessError, Config, ConstraintSource, Permission, ResourceScope,
    SasClient, SasQuery, StoredPolicyRegistry, TokenVerifier,
};
use sasign_core::{BackingStore, Context, OsEnv};
use sasign_store_memory::MemoryStore;

const CONTAINER: &str = "demo-container";
const POLICY: &str = "demo-policy";

fn report<T>(what: &str, result: std::result::Result<T, AccessError>) {
    match result {
        Ok(_) => println!("  {what}: allowed"),
        Err(AccessError::Engine(e)) => println!("  {what}: refused ({e})"),
        Err(AccessError::Store(e)) => println!("  {what}: store failed ({e})"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_store(MemoryStore::new());
    let mut config = Config::default().from_env(&ctx);
    if config.account_key.is_none() {
        config = Config::from_connection_string("UseDevelopmentStorage=true")?;
    }
    let cred = config.credential()?;
    let builder = config.builder();

    let registry = Arc::new(StoredPolicyRegistry::new());
    let verifier = Arc::new(TokenVerifier::new(cred.clone(), registry.clone()));

    ctx.store().create_container_if_absent(CONTAINER).await?;
    ctx.store()
        .upload(CONTAINER, "readme.txt", Bytes::from_static(b"hello sas"))
        .await?;

    println!("container token with write and list:");
    let constraint = AccessConstraint::new(
        Some(Utc::now() - Duration::minutes(5)),
        Some(Utc::now() + Duration::hours(1)),
        Permission::Write | Permission::List,
    )?;
    let token = builder.build(
        &ResourceScope::container(CONTAINER),
        ConstraintSource::Inline(constraint),
        &cred,
    )?;
    println!("  ?{token}");
    let client = SasClient::new(ctx.clone(), verifier.clone(), SasQuery::parse(token.query())?);
    report(
        "upload upload.txt",
        client
            .upload(CONTAINER, "upload.txt", Bytes::from_static(b"uploaded"))
            .await,
    );
    report(
        "set metadata",
        client
            .set_metadata(
                CONTAINER,
                "upload.txt",
                HashMap::from([("source".to_string(), "demo".to_string())]),
            )
            .await,
    );
    match client.list(CONTAINER).await {
        Ok(names) => println!("  list: {names:?}"),
        Err(e) => println!("  list: refused ({e})"),
    }
    report("download readme.txt", client.download(CONTAINER, "readme.txt").await);
    report("delete readme.txt", client.delete(CONTAINER, "readme.txt").await);

    println!("blob token through stored policy {POLICY}:");
    registry.upsert(
        CONTAINER,
        POLICY,
        AccessConstraint::new(
            None,
            Some(Utc::now() + Duration::hours(1)),
            Permission::Read | Permission::Write | Permission::Create | Permission::Delete,
        )?,
    )?;
    registry.push(&ctx, CONTAINER).await?;

    let token = builder.build(
        &ResourceScope::object(CONTAINER, "readme.txt"),
        ConstraintSource::StoredPolicy(POLICY.to_string()),
        &cred,
    )?;
    println!("  ?{token}");
    let client = SasClient::new(ctx.clone(), verifier.clone(), SasQuery::parse(token.query())?);
    match client.download(CONTAINER, "readme.txt").await {
        Ok(content) => println!("  download readme.txt: {}", String::from_utf8_lossy(&content)),
        Err(e) => println!("  download readme.txt: refused ({e})"),
    }
    report("list", client.list(CONTAINER).await);
    report("download upload.txt", client.download(CONTAINER, "upload.txt").await);

    println!("after revoking {POLICY}:");
    registry.remove(CONTAINER, POLICY)?;
    registry.push(&ctx, CONTAINER).await?;
    report("download readme.txt", client.download(CONTAINER, "readme.txt").await);

    ctx.store().delete_container_if_exists(CONTAINER).await?;
    Ok(())
}
