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

//! The backing store consumed by the token engine.

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use thiserror::Error;

/// Failure reported by a backing store.
///
/// This type is deliberately separate from [`crate::Error`]: a request
/// rejected by the store must never be mistaken for one rejected by
/// authorization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("backing store returned {status}: {message}")]
pub struct StoreError {
    /// Status code reported by the store.
    pub status: StatusCode,
    /// Message reported by the store.
    pub message: String,
}

impl StoreError {
    /// Create a new store error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Create a not implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, message)
    }
}

/// Result type of backing store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Wire form of a stored access policy as kept in container metadata.
///
/// Every field is kept in its signed string form; conversion to typed
/// constraints happens in the service crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "SignedIdentifier")]
pub struct SignedIdentifier {
    /// Policy identifier, unique within its container.
    #[serde(rename = "Id")]
    pub id: String,
    /// Constraint carried by the policy.
    #[serde(rename = "AccessPolicy", default)]
    pub access_policy: AccessPolicy,
}

/// Wire form of the constraint inside a [`SignedIdentifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessPolicy {
    /// Start time, ISO 8601 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Expiry time, ISO 8601 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Permission letters in canonical order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    /// IP range, `low-high` or a single address.
    #[serde(default, rename = "IPRange", skip_serializing_if = "Option::is_none")]
    pub ip_range: Option<String>,
    /// Protocol restriction, `https` or `https,http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// BackingStore is the blob storage the token engine authorizes access to.
///
/// Implementations may block on network or disk and fail independently of
/// the engine. The engine never retries them.
#[async_trait::async_trait]
pub trait BackingStore: Debug + Send + Sync + 'static {
    /// Create the container, returns `false` if it already existed.
    async fn create_container_if_absent(&self, container: &str) -> StoreResult<bool>;

    /// Delete the container and all its blobs, returns `false` if it did not exist.
    async fn delete_container_if_exists(&self, container: &str) -> StoreResult<bool>;

    /// Fetch a snapshot of the stored access policies of a container.
    async fn get_container_policies(&self, container: &str) -> StoreResult<Vec<SignedIdentifier>>;

    /// Replace the stored access policies of a container.
    async fn set_container_policies(
        &self,
        container: &str,
        policies: Vec<SignedIdentifier>,
    ) -> StoreResult<()>;

    /// Write a blob, replacing any previous content.
    async fn upload(&self, container: &str, blob: &str, content: Bytes) -> StoreResult<()>;

    /// Read a blob entirely.
    async fn download(&self, container: &str, blob: &str) -> StoreResult<Bytes>;

    /// List blob names of a container in lexicographic order.
    async fn list(&self, container: &str) -> StoreResult<Vec<String>>;

    /// Delete a blob.
    async fn delete(&self, container: &str, blob: &str) -> StoreResult<()>;

    /// Replace the user metadata of a blob.
    async fn set_metadata(
        &self,
        container: &str,
        blob: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()>;
}
