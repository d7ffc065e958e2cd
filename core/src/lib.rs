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

//! Core components for issuing and verifying shared access signatures.
//!
//! This crate provides the foundational types shared by the sasign crates.
//!
//! ## Overview
//!
//! - **Context**: A container that holds the environment and the backing store
//! - **BackingStore**: The blob storage collaborator that tokens authorize access to
//! - **Error**: One error kind per rejection reason, so callers can assert exact causes
//!
//! ## Utilities
//!
//! - [`hash`]: HMAC, base64 and constant-time comparison
//! - [`time`]: Signed time formatting and parsing
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, NoopBackingStore, NoopEnv, OsEnv, StaticEnv};
mod error;
pub use error::{Error, ErrorKind, Result};
mod store;
pub use store::{AccessPolicy, BackingStore, SignedIdentifier, StoreError, StoreResult};
