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

use sasign_core::{Error, ErrorKind, StoreError};
use thiserror::Error;

/// Failure of an operation that involves both the token engine and the
/// backing store.
///
/// The two sources stay apart: a write refused by a token is `Engine`,
/// a write refused by the store is `Store`.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Refused by the token engine.
    #[error(transparent)]
    Engine(#[from] Error),
    /// Failed in the backing store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessError {
    /// Kind of the engine error, `None` for store failures.
    pub fn engine_kind(&self) -> Option<ErrorKind> {
        match self {
            AccessError::Engine(e) => Some(e.kind()),
            AccessError::Store(_) => None,
        }
    }

    /// Check if the token engine refused the request.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, AccessError::Engine(e) if e.is_verification_failure())
    }
}
