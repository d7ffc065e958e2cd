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

use crate::PermissionSet;
use sasign_core::time::{format_iso8601, trunc_seconds, DateTime};
use sasign_core::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Specifies the protocol permitted for a request made with the SAS.
///
/// - [Specifying the HTTP protocol](https://docs.microsoft.com/rest/api/storageservices/create-service-sas#specifying-the-http-protocol)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    HttpsOnly,
    HttpsOrHttp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Protocol::HttpsOnly => write!(f, "https"),
            Protocol::HttpsOrHttp => write!(f, "https,http"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "https" => Ok(Protocol::HttpsOnly),
            "https,http" | "http,https" => Ok(Protocol::HttpsOrHttp),
            v => Err(Error::token_malformed(format!("invalid signed protocol: {v}"))),
        }
    }
}

/// Inclusive range of IPv4 addresses a SAS may be used from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IpRange {
    low: Ipv4Addr,
    high: Ipv4Addr,
}

impl IpRange {
    /// Create a range, fails with `InvalidConstraint` if `low > high`.
    pub fn new(low: Ipv4Addr, high: Ipv4Addr) -> Result<Self> {
        if low > high {
            return Err(Error::invalid_constraint(format!(
                "ip range start {low} is after its end {high}"
            )));
        }
        Ok(Self { low, high })
    }

    /// Create a range holding exactly one address.
    pub fn single(ip: Ipv4Addr) -> Self {
        Self { low: ip, high: ip }
    }

    pub fn low(&self) -> Ipv4Addr {
        self.low
    }

    pub fn high(&self) -> Ipv4Addr {
        self.high
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.low <= ip && ip <= self.high
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

impl FromStr for IpRange {
    type Err = Error;

    /// Parse `low-high` or a single address.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            v.trim().parse::<Ipv4Addr>().map_err(|e| {
                Error::token_malformed(format!("invalid signed ip: {s}")).with_source(e)
            })
        };

        match s.split_once('-') {
            Some((low, high)) => IpRange::new(parse(low)?, parse(high)?),
            None => Ok(IpRange::single(parse(s)?)),
        }
    }
}

/// Bounds on when, where from and for what a SAS may be used.
///
/// Times are kept at second precision, the precision they are signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConstraint {
    start: Option<DateTime>,
    expiry: Option<DateTime>,
    permissions: PermissionSet,
    ip_range: Option<IpRange>,
    protocol: Option<Protocol>,
}

impl AccessConstraint {
    /// Create a constraint.
    ///
    /// Fails with `InvalidConstraint` if both times are given and expiry is before start.
    pub fn new(
        start: Option<DateTime>,
        expiry: Option<DateTime>,
        permissions: PermissionSet,
    ) -> Result<Self> {
        let start = start.map(trunc_seconds);
        let expiry = expiry.map(trunc_seconds);

        if let (Some(start), Some(expiry)) = (start, expiry) {
            if expiry < start {
                return Err(Error::invalid_constraint(format!(
                    "expiry {} is before start {}",
                    format_iso8601(expiry),
                    format_iso8601(start)
                )));
            }
        }

        Ok(Self {
            start,
            expiry,
            permissions,
            ip_range: None,
            protocol: None,
        })
    }

    /// Restrict the source addresses.
    pub fn with_ip_range(mut self, ip_range: IpRange) -> Self {
        self.ip_range = Some(ip_range);
        self
    }

    /// Restrict the protocol.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn start(&self) -> Option<DateTime> {
        self.start
    }

    pub fn expiry(&self) -> Option<DateTime> {
        self.expiry
    }

    pub fn permissions(&self) -> PermissionSet {
        self.permissions
    }

    pub fn ip_range(&self) -> Option<IpRange> {
        self.ip_range
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Check the time window, both bounds inclusive.
    pub fn is_currently_valid(&self, now: DateTime) -> bool {
        !self.is_not_yet_valid(now) && !self.is_expired(now)
    }

    pub(crate) fn is_not_yet_valid(&self, now: DateTime) -> bool {
        self.start.is_some_and(|start| now < start)
    }

    pub(crate) fn is_expired(&self, now: DateTime) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }

    pub fn is_ip_allowed(&self, ip: Ipv4Addr) -> bool {
        self.ip_range.map_or(true, |range| range.contains(ip))
    }

    /// A missing protocol restriction allows both.
    pub fn is_protocol_allowed(&self, used_https: bool) -> bool {
        used_https || self.protocol != Some(Protocol::HttpsOnly)
    }
}
