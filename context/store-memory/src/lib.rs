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

//! In-memory backing store for sasign.
//!
//! This crate provides `MemoryStore`, a `BackingStore` that keeps containers,
//! blobs and stored access policies in process memory behind a Tokio lock.
//! It is meant for tests and demos.
//!
//! ## Example
//!
//! ```no_run
//! use sasign_core::Context;
//! use sasign_store_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new().with_store(MemoryStore::default());
//!
//!     ctx.store().create_container_if_absent("photos").await.unwrap();
//!     ctx.store()
//!         .upload("photos", "cat.jpg", "meow".into())
//!         .await
//!         .unwrap();
//!     assert_eq!(ctx.store().list("photos").await.unwrap(), vec!["cat.jpg"]);
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use sasign_core::{BackingStore, SignedIdentifier, StoreError, StoreResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of the `BackingStore` trait.
///
/// Cloning is cheap, clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    containers: Arc<RwLock<HashMap<String, Container>>>,
}

#[derive(Debug, Default)]
struct Container {
    policies: Vec<SignedIdentifier>,
    blobs: BTreeMap<String, Blob>,
}

#[derive(Debug, Default)]
struct Blob {
    content: Bytes,
    metadata: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn container_not_found(container: &str) -> StoreError {
    StoreError::not_found(format!("container {container} does not exist"))
}

fn blob_not_found(container: &str, blob: &str) -> StoreError {
    StoreError::not_found(format!("blob {container}/{blob} does not exist"))
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn create_container_if_absent(&self, container: &str) -> StoreResult<bool> {
        let mut containers = self.containers.write().await;
        if containers.contains_key(container) {
            return Ok(false);
        }
        debug!("memory store: create container {container}");
        containers.insert(container.to_string(), Container::default());
        Ok(true)
    }

    async fn delete_container_if_exists(&self, container: &str) -> StoreResult<bool> {
        let removed = self.containers.write().await.remove(container).is_some();
        if removed {
            debug!("memory store: delete container {container}");
        }
        Ok(removed)
    }

    async fn get_container_policies(&self, container: &str) -> StoreResult<Vec<SignedIdentifier>> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        Ok(c.policies.clone())
    }

    async fn set_container_policies(
        &self,
        container: &str,
        policies: Vec<SignedIdentifier>,
    ) -> StoreResult<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        debug!(
            "memory store: set {} policies on container {container}",
            policies.len()
        );
        c.policies = policies;
        Ok(())
    }

    async fn upload(&self, container: &str, blob: &str, content: Bytes) -> StoreResult<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        let entry = c.blobs.entry(blob.to_string()).or_default();
        entry.content = content;
        Ok(())
    }

    async fn download(&self, container: &str, blob: &str) -> StoreResult<Bytes> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        c.blobs
            .get(blob)
            .map(|b| b.content.clone())
            .ok_or_else(|| blob_not_found(container, blob))
    }

    async fn list(&self, container: &str) -> StoreResult<Vec<String>> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        Ok(c.blobs.keys().cloned().collect())
    }

    async fn delete(&self, container: &str, blob: &str) -> StoreResult<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        c.blobs
            .remove(blob)
            .map(|_| ())
            .ok_or_else(|| blob_not_found(container, blob))
    }

    async fn set_metadata(
        &self,
        container: &str,
        blob: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        let b = c
            .blobs
            .get_mut(blob)
            .ok_or_else(|| blob_not_found(container, blob))?;
        b.metadata = metadata;
        Ok(())
    }
}

impl MemoryStore {
    /// Read back the metadata of a blob.
    pub async fn metadata(
        &self,
        container: &str,
        blob: &str,
    ) -> StoreResult<HashMap<String, String>> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?
            .blobs
            .get(blob)
            .map(|b| b.metadata.clone())
            .ok_or_else(|| blob_not_found(container, blob))
    }
}
