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

use sasign_core::{Error, Result};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// An operation a SAS may grant.
///
/// - [Permissions for a container or blob](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#permissions-for-a-directory-container-or-blob)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Add,
    Create,
    Write,
    Delete,
    List,
}

impl Permission {
    /// All permissions in canonical order.
    pub const ALL: [Permission; 6] = [
        Permission::Read,
        Permission::Add,
        Permission::Create,
        Permission::Write,
        Permission::Delete,
        Permission::List,
    ];

    /// Letter used in the `sp` field.
    pub fn as_char(self) -> char {
        match self {
            Permission::Read => 'r',
            Permission::Add => 'a',
            Permission::Create => 'c',
            Permission::Write => 'w',
            Permission::Delete => 'd',
            Permission::List => 'l',
        }
    }

    /// Parse a single `sp` letter.
    pub fn from_char(c: char) -> Option<Self> {
        Permission::ALL.into_iter().find(|p| p.as_char() == c)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Read => "read",
            Permission::Add => "add",
            Permission::Create => "create",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::List => "list",
        };
        f.write_str(name)
    }
}

/// Set of [`Permission`]s.
///
/// The encoded form always follows the canonical order `racwdl`, whatever
/// order permissions were added in. Signer and verifier both rely on it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(u8);

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(0)
    }

    /// Create a set with every permission.
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Return the set with `p` added.
    pub fn with(mut self, p: Permission) -> Self {
        self.insert(p);
        self
    }

    pub fn insert(&mut self, p: Permission) {
        self.0 |= p.bit();
    }

    pub fn remove(&mut self, p: Permission) {
        self.0 &= !p.bit();
    }

    pub fn contains(&self, p: Permission) -> bool {
        self.0 & p.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate permissions in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Encode into `sp` letters in canonical order.
    pub fn encode(&self) -> String {
        self.iter().map(Permission::as_char).collect()
    }

    /// Decode `sp` letters, in any order.
    ///
    /// Fails with `MalformedPermissionString` on any unknown letter.
    pub fn decode(s: &str) -> Result<Self> {
        s.chars()
            .map(|c| {
                Permission::from_char(c).ok_or_else(|| {
                    Error::malformed_permission_string(format!(
                        "unknown permission {c:?} in {s:?}"
                    ))
                })
            })
            .collect()
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionSet({:?})", self.encode())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PermissionSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Self::new();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl From<Permission> for PermissionSet {
    fn from(p: Permission) -> Self {
        Self::new().with(p)
    }
}

impl BitOr<Permission> for PermissionSet {
    type Output = PermissionSet;

    fn bitor(self, rhs: Permission) -> Self::Output {
        self.with(rhs)
    }
}

impl BitOr for Permission {
    type Output = PermissionSet;

    fn bitor(self, rhs: Permission) -> Self::Output {
        PermissionSet::from(self).with(rhs)
    }
}
