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

use crate::constants::{
    CANONICAL_SERVICE, MAX_BLOB_NAME_LEN, MAX_CONTAINER_NAME_LEN, MIN_CONTAINER_NAME_LEN,
};
use sasign_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The resource a SAS is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    Container(String),
    Object { container: String, blob: String },
}

impl ResourceScope {
    pub fn container(name: impl Into<String>) -> Self {
        ResourceScope::Container(name.into())
    }

    pub fn object(container: impl Into<String>, blob: impl Into<String>) -> Self {
        ResourceScope::Object {
            container: container.into(),
            blob: blob.into(),
        }
    }

    /// Parse a decoded request path like `/container` or `/container/dir/blob`.
    pub fn from_path(path: &str) -> Result<Self> {
        let path = path.trim_start_matches('/');
        let scope = match path.split_once('/') {
            Some((container, blob)) if !container.is_empty() && !blob.is_empty() => {
                Ok(ResourceScope::object(container, blob))
            }
            Some((container, "")) if !container.is_empty() => {
                Ok(ResourceScope::container(container))
            }
            None if !path.is_empty() => Ok(ResourceScope::container(path)),
            _ => Err(Error::resource_mismatch(format!(
                "path /{path} does not name a container or blob"
            ))),
        }?;
        scope.validate()?;
        Ok(scope)
    }

    /// Check container and blob names against the service naming rules.
    ///
    /// Container names are 3 to 63 characters of lowercase letters, digits
    /// and single hyphens, starting and ending with a letter or digit. They
    /// never contain `/`, so the canonicalized resource of a valid scope
    /// names exactly one container.
    ///
    /// - [Naming and referencing containers, blobs, and metadata](https://learn.microsoft.com/en-us/rest/api/storageservices/naming-and-referencing-containers--blobs--and-metadata)
    pub fn validate(&self) -> Result<()> {
        validate_container_name(self.container_name())?;
        if let Some(blob) = self.blob_name() {
            validate_blob_name(blob)?;
        }
        Ok(())
    }

    pub fn container_name(&self) -> &str {
        match self {
            ResourceScope::Container(name) => name,
            ResourceScope::Object { container, .. } => container,
        }
    }

    pub fn blob_name(&self) -> Option<&str> {
        match self {
            ResourceScope::Container(_) => None,
            ResourceScope::Object { blob, .. } => Some(blob),
        }
    }

    pub fn signed_resource(&self) -> SignedResource {
        match self {
            ResourceScope::Container(_) => SignedResource::Container,
            ResourceScope::Object { .. } => SignedResource::Blob,
        }
    }

    /// The scope a token signed as `resource` must have been issued for
    /// to be usable on `self`.
    ///
    /// A container token covers the container and every blob inside it,
    /// a blob token covers only its blob.
    pub(crate) fn signed_scope(&self, resource: SignedResource) -> Result<ResourceScope> {
        match (resource, self) {
            (SignedResource::Container, _) => {
                Ok(ResourceScope::container(self.container_name()))
            }
            (SignedResource::Blob, ResourceScope::Object { .. }) => Ok(self.clone()),
            (SignedResource::Blob, ResourceScope::Container(name)) => Err(
                Error::resource_mismatch(format!("blob token used on container {name}")),
            ),
        }
    }

    /// Canonicalized resource: `/blob/{account}/{container}[/{blob}]`.
    ///
    /// - [Specifying the signed resource](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#specify-the-signed-resource-blob-storage-only)
    pub fn canonicalized(&self, account_name: &str) -> String {
        match self {
            ResourceScope::Container(name) => {
                format!("/{CANONICAL_SERVICE}/{account_name}/{name}")
            }
            ResourceScope::Object { container, blob } => {
                format!("/{CANONICAL_SERVICE}/{account_name}/{container}/{blob}")
            }
        }
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceScope::Container(name) => write!(f, "{name}"),
            ResourceScope::Object { container, blob } => write!(f, "{container}/{blob}"),
        }
    }
}

fn validate_container_name(name: &str) -> Result<()> {
    let valid = (MIN_CONTAINER_NAME_LEN..=MAX_CONTAINER_NAME_LEN).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if valid {
        Ok(())
    } else {
        Err(Error::resource_mismatch(format!(
            "invalid container name: {name:?}"
        )))
    }
}

fn validate_blob_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_BLOB_NAME_LEN {
        return Err(Error::resource_mismatch(format!(
            "blob name must be 1 to {MAX_BLOB_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Value of the `sr` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignedResource {
    Container,
    Blob,
}

impl SignedResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignedResource::Container => "c",
            SignedResource::Blob => "b",
        }
    }
}

impl fmt::Display for SignedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignedResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "c" => Ok(SignedResource::Container),
            "b" => Ok(SignedResource::Blob),
            v => Err(Error::token_malformed(format!(
                "unsupported signed resource: {v}"
            ))),
        }
    }
}
