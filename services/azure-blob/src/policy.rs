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

//! Stored access policies.
//!
//! - [Define a stored access policy](https://learn.microsoft.com/en-us/rest/api/storageservices/define-stored-access-policy)

use crate::constants::{MAX_POLICY_ID_LEN, MAX_STORED_POLICIES};
use crate::{AccessConstraint, AccessError, IpRange, PermissionSet, Protocol};
use log::{debug, info};
use sasign_core::time::{format_iso8601, parse_iso8601};
use sasign_core::{AccessPolicy, Context, Error, Result, SignedIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// A named constraint kept server-side on a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPolicy {
    pub identifier: String,
    pub constraint: AccessConstraint,
}

impl StoredPolicy {
    /// Create a policy, fails with `InvalidConstraint` if the identifier is
    /// empty or longer than 64 characters.
    pub fn new(identifier: impl Into<String>, constraint: AccessConstraint) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Self {
            identifier,
            constraint,
        })
    }

    /// Convert into the wire form kept in container metadata.
    pub fn to_signed_identifier(&self) -> SignedIdentifier {
        let c = &self.constraint;
        SignedIdentifier {
            id: self.identifier.clone(),
            access_policy: AccessPolicy {
                start: c.start().map(format_iso8601),
                expiry: c.expiry().map(format_iso8601),
                permission: Some(c.permissions().encode()),
                ip_range: c.ip_range().map(|v| v.to_string()),
                protocol: c.protocol().map(|v| v.to_string()),
            },
        }
    }
}

impl TryFrom<&SignedIdentifier> for StoredPolicy {
    type Error = Error;

    fn try_from(value: &SignedIdentifier) -> Result<Self> {
        let p = &value.access_policy;
        let invalid = |field: &str, e: Error| {
            Error::invalid_constraint(format!("stored policy {} has an invalid {field}", value.id))
                .with_source(e)
        };

        let mut constraint = AccessConstraint::new(
            p.start
                .as_deref()
                .map(parse_iso8601)
                .transpose()
                .map_err(|e| invalid("start", e))?,
            p.expiry
                .as_deref()
                .map(parse_iso8601)
                .transpose()
                .map_err(|e| invalid("expiry", e))?,
            p.permission
                .as_deref()
                .map(PermissionSet::decode)
                .transpose()?
                .unwrap_or_default(),
        )?;
        if let Some(ip) = &p.ip_range {
            let ip = ip.parse::<IpRange>().map_err(|e| invalid("ip range", e))?;
            constraint = constraint.with_ip_range(ip);
        }
        if let Some(protocol) = &p.protocol {
            let protocol = protocol
                .parse::<Protocol>()
                .map_err(|e| invalid("protocol", e))?;
            constraint = constraint.with_protocol(protocol);
        }

        StoredPolicy::new(value.id.clone(), constraint)
    }
}

pub(crate) fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.chars().count() > MAX_POLICY_ID_LEN {
        return Err(Error::invalid_constraint(format!(
            "policy identifier must be 1 to {MAX_POLICY_ID_LEN} characters, got {identifier:?}"
        )));
    }
    Ok(())
}

type PolicyMap = BTreeMap<String, AccessConstraint>;

/// Per-container registry of stored access policies.
///
/// Containers are kept in an arena keyed by name, each behind its own lock,
/// so writers on one container never block readers of another. A removal is
/// seen by every later `resolve`, which is what revokes the tokens that
/// reference the removed policy.
///
/// A container whose last policy is removed leaves the arena, so it only
/// holds containers that currently have policies. Writers keep the arena
/// read lock while they hold a container lock, and pruning takes the arena
/// write lock, so a write never lands in a slot that was already dropped.
#[derive(Debug, Default)]
pub struct StoredPolicyRegistry {
    containers: RwLock<HashMap<String, Arc<RwLock<PolicyMap>>>>,
}

fn poisoned() -> Error {
    Error::unexpected("policy registry lock poisoned")
}

impl StoredPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, container: &str) -> Result<Option<Arc<RwLock<PolicyMap>>>> {
        let containers = self.containers.read().map_err(|_| poisoned())?;
        Ok(containers.get(container).cloned())
    }

    /// Run `f` on the policies of `container` with its write lock held,
    /// creating the container if needed and pruning it if `f` leaves it
    /// empty.
    fn with_slot_mut<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut PolicyMap) -> Result<T>,
    ) -> Result<T> {
        {
            let containers = self.containers.read().map_err(|_| poisoned())?;
            if let Some(slot) = containers.get(container) {
                let mut policies = slot.write().map_err(|_| poisoned())?;
                let result = f(&mut *policies);
                if !policies.is_empty() {
                    return result;
                }
                drop(policies);
                drop(containers);
                self.prune(container)?;
                return result;
            }
        }

        // Another writer may have created the container meanwhile.
        let mut containers = self.containers.write().map_err(|_| poisoned())?;
        let slot = containers.entry(container.to_string()).or_default().clone();
        let mut policies = slot.write().map_err(|_| poisoned())?;
        let result = f(&mut *policies);
        if policies.is_empty() {
            drop(policies);
            containers.remove(container);
        }
        result
    }

    /// Drop `container` from the arena if it holds no policies.
    fn prune(&self, container: &str) -> Result<()> {
        let mut containers = self.containers.write().map_err(|_| poisoned())?;
        let empty = match containers.get(container) {
            Some(slot) => slot.read().map_err(|_| poisoned())?.is_empty(),
            None => false,
        };
        if empty {
            containers.remove(container);
            debug!("container {container} has no stored policies left");
        }
        Ok(())
    }

    /// Insert or overwrite a policy.
    ///
    /// Fails with `PolicyLimitExceeded` if a new identifier would push the
    /// container past five policies.
    pub fn upsert(
        &self,
        container: &str,
        identifier: &str,
        constraint: AccessConstraint,
    ) -> Result<()> {
        validate_identifier(identifier)?;

        self.with_slot_mut(container, |policies| {
            if !policies.contains_key(identifier) && policies.len() >= MAX_STORED_POLICIES {
                return Err(Error::policy_limit_exceeded(format!(
                    "container {container} already holds {MAX_STORED_POLICIES} stored policies"
                )));
            }

            info!("stored policy {identifier} set on container {container}");
            policies.insert(identifier.to_string(), constraint);
            Ok(())
        })
    }

    /// Remove a policy, returns whether it existed.
    pub fn remove(&self, container: &str, identifier: &str) -> Result<bool> {
        if self.slot(container)?.is_none() {
            return Ok(false);
        }

        self.with_slot_mut(container, |policies| {
            let removed = policies.remove(identifier).is_some();
            if removed {
                info!("stored policy {identifier} removed from container {container}");
            }
            Ok(removed)
        })
    }

    /// Look up a policy, fails with `PolicyNotFound` if it is absent.
    pub fn resolve(&self, container: &str, identifier: &str) -> Result<AccessConstraint> {
        let not_found = || {
            Error::policy_not_found(format!(
                "stored policy {identifier} not found on container {container}"
            ))
        };

        let slot = self.slot(container)?.ok_or_else(not_found)?;
        let policies = slot.read().map_err(|_| poisoned())?;
        policies.get(identifier).cloned().ok_or_else(not_found)
    }

    /// Snapshot the policies of a container, ordered by identifier.
    pub fn policies(&self, container: &str) -> Result<Vec<StoredPolicy>> {
        let Some(slot) = self.slot(container)? else {
            return Ok(Vec::new());
        };
        let policies = slot.read().map_err(|_| poisoned())?;
        Ok(policies
            .iter()
            .map(|(identifier, constraint)| StoredPolicy {
                identifier: identifier.clone(),
                constraint: constraint.clone(),
            })
            .collect())
    }

    /// Replace all policies of a container at once.
    ///
    /// Later entries win on duplicate identifiers. The limit applies to the
    /// deduplicated set and nothing is replaced if it is exceeded.
    pub fn replace(&self, container: &str, policies: Vec<StoredPolicy>) -> Result<()> {
        let next: PolicyMap = policies
            .into_iter()
            .map(|p| (p.identifier, p.constraint))
            .collect();
        if next.len() > MAX_STORED_POLICIES {
            return Err(Error::policy_limit_exceeded(format!(
                "container {container} cannot hold {} stored policies, limit is {}",
                next.len(),
                MAX_STORED_POLICIES
            )));
        }

        self.with_slot_mut(container, |policies| {
            *policies = next;
            Ok(())
        })
    }

    /// Load the policies of a container from the backing store.
    pub async fn pull(
        &self,
        ctx: &Context,
        container: &str,
    ) -> std::result::Result<(), AccessError> {
        let identifiers = ctx.store().get_container_policies(container).await?;
        debug!(
            "pulled {} stored policies of container {container}",
            identifiers.len()
        );
        let policies = identifiers
            .iter()
            .map(StoredPolicy::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.replace(container, policies)?;
        Ok(())
    }

    /// Write the policies of a container back to the backing store.
    pub async fn push(
        &self,
        ctx: &Context,
        container: &str,
    ) -> std::result::Result<(), AccessError> {
        let identifiers = self
            .policies(container)?
            .iter()
            .map(StoredPolicy::to_signed_identifier)
            .collect::<Vec<_>>();
        debug!(
            "pushing {} stored policies of container {container}",
            identifiers.len()
        );
        ctx.store()
            .set_container_policies(container, identifiers)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "SignedIdentifiers")]
struct SignedIdentifiers {
    #[serde(rename = "SignedIdentifier", default)]
    items: Vec<SignedIdentifier>,
}

/// Encode policies as the `<SignedIdentifiers>` body of a container ACL request.
///
/// - [Set Container ACL](https://learn.microsoft.com/en-us/rest/api/storageservices/set-container-acl)
pub fn to_xml(policies: &[SignedIdentifier]) -> Result<String> {
    let body = SignedIdentifiers {
        items: policies.to_vec(),
    };
    quick_xml::se::to_string(&body)
        .map_err(|e| Error::unexpected("failed to encode signed identifiers").with_source(e))
}

/// Decode a `<SignedIdentifiers>` body.
pub fn from_xml(s: &str) -> Result<Vec<SignedIdentifier>> {
    let body: SignedIdentifiers = quick_xml::de::from_str(s)
        .map_err(|e| Error::unexpected("failed to decode signed identifiers").with_source(e))?;
    Ok(body.items)
}
