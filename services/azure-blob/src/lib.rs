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

//! Service SAS tokens for Azure Blob Storage style containers and blobs.
//!
//! This crate issues and verifies container (`sr=c`) and blob (`sr=b`)
//! shared access signatures, and keeps the stored access policies that
//! let issued tokens be revoked after the fact.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sasign_azure_blob::{
//!     AccessConstraint, Config, ConstraintSource, Permission, RequestContext, ResourceScope,
//!     SasQuery, StoredPolicyRegistry, TokenVerifier,
//! };
//! use sasign_core::{Context, OsEnv, Result};
//!
//! fn main() -> Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::default().from_env(&ctx);
//!     let cred = config.credential()?;
//!
//!     let scope = ResourceScope::container("photos");
//!     let constraint = AccessConstraint::new(
//!         None,
//!         Some(chrono::Utc::now() + chrono::Duration::hours(1)),
//!         Permission::Read | Permission::List,
//!     )?;
//!     let token = config
//!         .builder()
//!         .build(&scope, ConstraintSource::Inline(constraint), &cred)?;
//!
//!     let verifier = TokenVerifier::new(cred, Arc::new(StoredPolicyRegistry::new()));
//!     let grant = verifier.verify(
//!         &scope,
//!         &SasQuery::parse(token.query())?,
//!         &RequestContext::new(Permission::List),
//!     )?;
//!     println!("granted {}", grant.permissions);
//!     Ok(())
//! }
//! ```

mod constants;
pub use constants::DEFAULT_SAS_VERSION;
pub use constants::MAX_POLICY_ID_LEN;
pub use constants::MAX_STORED_POLICIES;

mod error;
pub use error::AccessError;

mod permission;
pub use permission::{Permission, PermissionSet};

mod constraint;
pub use constraint::{AccessConstraint, IpRange, Protocol};

mod resource;
pub use resource::{ResourceScope, SignedResource};

mod key;
pub use key::Credential;

mod policy;
pub use policy::{from_xml, to_xml, StoredPolicy, StoredPolicyRegistry};

mod build;
pub use build::{ConstraintSource, ResponseOverrides, SasBuilder, SasToken};

mod verify;
pub use verify::{RequestContext, SasQuery, TokenVerifier, VerifiedGrant};

mod client;
pub use client::SasClient;

mod config;
pub use config::Config;

mod connection_string;
