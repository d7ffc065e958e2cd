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

use crate::store::{BackingStore, SignedIdentifier, StoreError, StoreResult};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Context carries the collaborators the token engine talks to.
///
/// ## Important
///
/// sasign provides NO default implementations. Users MAY configure components they need.
/// Any unconfigured component will use a no-op implementation that returns errors or empty values when called.
///
/// ## Example
///
/// ```
/// use sasign_core::{Context, OsEnv};
///
/// let ctx = Context::new().with_env(OsEnv);
/// ```
#[derive(Clone)]
pub struct Context {
    env: Arc<dyn Env>,
    store: Arc<dyn BackingStore>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("env", &self.env)
            .field("store", &self.store)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new Context with no-op implementations.
    pub fn new() -> Self {
        Self {
            env: Arc::new(NoopEnv),
            store: Arc::new(NoopBackingStore),
        }
    }

    /// Replace the environment implementation.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Replace the backing store implementation.
    pub fn with_store(mut self, store: impl BackingStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Get the environment variable.
    ///
    /// - Returns `Some(v)` if the environment variable is found and is valid utf-8.
    /// - Returns `None` if the environment variable is not found or value is invalid.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Returns an hashmap of (variable, value) pairs of strings, for all the
    /// environment variables of the current process.
    #[inline]
    pub fn env_vars(&self) -> HashMap<String, String> {
        self.env.vars()
    }

    /// Get the configured backing store.
    #[inline]
    pub fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }
}

/// Permits parameterizing environment lookups.
pub trait Env: Debug + Send + Sync + 'static {
    /// Get an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns an hashmap of (variable, value) pairs of strings.
    fn vars(&self) -> HashMap<String, String>;
}

/// Implements Env for the OS process environment.
#[derive(Debug, Copy, Clone)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

/// StaticEnv provides a static env environment.
///
/// This is useful for testing or for providing a fixed environment.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// The environment variables to use.
    pub envs: HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.envs.clone()
    }
}

/// NoopEnv is a no-op implementation that always returns None/empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnv;

impl Env for NoopEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }

    fn vars(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// NoopBackingStore is a no-op implementation that always returns an error.
///
/// This is used when no backing store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackingStore;

fn unsupported<T>() -> StoreResult<T> {
    Err(StoreError::not_implemented(
        "storage not supported: no backing store configured",
    ))
}

#[async_trait::async_trait]
impl BackingStore for NoopBackingStore {
    async fn create_container_if_absent(&self, _container: &str) -> StoreResult<bool> {
        unsupported()
    }

    async fn delete_container_if_exists(&self, _container: &str) -> StoreResult<bool> {
        unsupported()
    }

    async fn get_container_policies(&self, _container: &str) -> StoreResult<Vec<SignedIdentifier>> {
        unsupported()
    }

    async fn set_container_policies(
        &self,
        _container: &str,
        _policies: Vec<SignedIdentifier>,
    ) -> StoreResult<()> {
        unsupported()
    }

    async fn upload(&self, _container: &str, _blob: &str, _content: Bytes) -> StoreResult<()> {
        unsupported()
    }

    async fn download(&self, _container: &str, _blob: &str) -> StoreResult<Bytes> {
        unsupported()
    }

    async fn list(&self, _container: &str) -> StoreResult<Vec<String>> {
        unsupported()
    }

    async fn delete(&self, _container: &str, _blob: &str) -> StoreResult<()> {
        unsupported()
    }

    async fn set_metadata(
        &self,
        _container: &str,
        _blob: &str,
        _metadata: HashMap<String, String>,
    ) -> StoreResult<()> {
        unsupported()
    }
}
