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

//! Time related utils.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, SubsecRound, Utc};

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Signed time format: "2022-03-13T07:20:04Z"
const ISO8601_SECONDS: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Truncate a datetime to whole seconds, the precision of signed times.
pub fn trunc_seconds(time: DateTime) -> DateTime {
    time.trunc_subsecs(0)
}

/// Format time into ISO 8601 with second precision: "2022-03-13T07:20:04Z"
pub fn format_iso8601(t: DateTime) -> String {
    t.format(ISO8601_SECONDS).to_string()
}

/// Parse a signed time.
///
/// Accepts RFC 3339, "2022-03-13T07:20:04Z" and bare dates ("2022-03-13",
/// midnight UTC).
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    if let Ok(t) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, ISO8601_SECONDS) {
        return Ok(t.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| Error::token_malformed(format!("invalid signed time: {s}")))
}
