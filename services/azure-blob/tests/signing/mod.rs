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

mod round_trip;
mod tamper;

use sasign_azure_blob::{AccessConstraint, PermissionSet};

use crate::t;

/// Constraint valid through the first hour of 2030.
pub fn hour(permissions: impl Into<PermissionSet>) -> AccessConstraint {
    AccessConstraint::new(
        Some(t("2030-01-01T00:00:00Z")),
        Some(t("2030-01-01T01:00:00Z")),
        permissions.into(),
    )
    .expect("constraint must be valid")
}
