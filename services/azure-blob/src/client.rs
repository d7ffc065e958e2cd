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

use crate::{
    AccessError, Permission, RequestContext, ResourceScope, SasQuery, TokenVerifier,
    VerifiedGrant,
};
use bytes::Bytes;
use log::debug;
use sasign_core::Context;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

type Result<T> = std::result::Result<T, AccessError>;

/// Store client that presents one SAS for every operation.
///
/// Each call is verified before it reaches the backing store of the
/// context. A refused token never touches the store.
#[derive(Debug, Clone)]
pub struct SasClient {
    ctx: Context,
    verifier: Arc<TokenVerifier>,
    query: SasQuery,
    source_ip: Option<Ipv4Addr>,
    used_https: bool,
}

impl SasClient {
    pub fn new(ctx: Context, verifier: Arc<TokenVerifier>, query: SasQuery) -> Self {
        Self {
            ctx,
            verifier,
            query,
            source_ip: None,
            used_https: true,
        }
    }

    /// Present requests as coming from `ip`.
    pub fn with_source_ip(mut self, ip: Ipv4Addr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    pub fn with_https(mut self, used_https: bool) -> Self {
        self.used_https = used_https;
        self
    }

    fn authorize(&self, scope: &ResourceScope, operation: Permission) -> Result<VerifiedGrant> {
        let mut ctx = RequestContext::new(operation).with_https(self.used_https);
        if let Some(ip) = self.source_ip {
            ctx = ctx.with_source_ip(ip);
        }
        let grant = self.verifier.verify(scope, &self.query, &ctx)?;
        debug!("authorized {operation} on {scope}");
        Ok(grant)
    }

    /// Upload `content` as `container/blob`, requires write.
    pub async fn upload(&self, container: &str, blob: &str, content: Bytes) -> Result<()> {
        self.authorize(&ResourceScope::object(container, blob), Permission::Write)?;
        self.ctx.store().upload(container, blob, content).await?;
        Ok(())
    }

    /// Download `container/blob`, requires read.
    pub async fn download(&self, container: &str, blob: &str) -> Result<Bytes> {
        self.authorize(&ResourceScope::object(container, blob), Permission::Read)?;
        Ok(self.ctx.store().download(container, blob).await?)
    }

    /// List blob names of `container`, requires list.
    pub async fn list(&self, container: &str) -> Result<Vec<String>> {
        self.authorize(&ResourceScope::container(container), Permission::List)?;
        Ok(self.ctx.store().list(container).await?)
    }

    /// Delete `container/blob`, requires delete.
    pub async fn delete(&self, container: &str, blob: &str) -> Result<()> {
        self.authorize(&ResourceScope::object(container, blob), Permission::Delete)?;
        self.ctx.store().delete(container, blob).await?;
        Ok(())
    }

    /// Replace the metadata of `container/blob`, requires write.
    pub async fn set_metadata(
        &self,
        container: &str,
        blob: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        self.authorize(&ResourceScope::object(container, blob), Permission::Write)?;
        self.ctx
            .store()
            .set_metadata(container, blob, metadata)
            .await?;
        Ok(())
    }
}
