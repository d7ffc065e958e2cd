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

use std::fmt;
use thiserror::Error;

/// The error type for sasign operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
///
/// Every kind is local and non-retryable: it describes a malformed request
/// or a credential that is expired, revoked or too narrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Permission string contains a character outside the known alphabet
    MalformedPermissionString,

    /// Access constraint is inconsistent (expiry before start, both or neither source, ...)
    InvalidConstraint,

    /// Signing key is empty or not valid base64
    SigningKeyInvalid,

    /// Adding the policy would exceed the per-container limit
    PolicyLimitExceeded,

    /// Stored policy identifier is unknown to the container
    PolicyNotFound,

    /// Signature does not match the recomputed string to sign
    SignatureMismatch,

    /// Token references a stored policy that no longer exists
    RevokedOrUnknownPolicy,

    /// Token is past its expiry time
    Expired,

    /// Token is before its start time
    NotYetValid,

    /// Source address is outside the signed IP range
    IpNotAllowed,

    /// Request used http while the token requires https
    InsecureProtocol,

    /// Signed permissions do not include the requested operation
    PermissionDenied,

    /// Query string cannot be parsed into SAS parameters
    TokenMalformed,

    /// Signed resource does not cover the requested resource
    ResourceMismatch,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors (poisoned locks, serialization, ...)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the kind prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this error rejects a presented token, as opposed to
    /// a failure while issuing one or managing policies.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::SignatureMismatch
                | ErrorKind::RevokedOrUnknownPolicy
                | ErrorKind::Expired
                | ErrorKind::NotYetValid
                | ErrorKind::IpNotAllowed
                | ErrorKind::InsecureProtocol
                | ErrorKind::PermissionDenied
                | ErrorKind::TokenMalformed
                | ErrorKind::ResourceMismatch
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a malformed permission string error
    pub fn malformed_permission_string(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPermissionString, message)
    }

    /// Create an invalid constraint error
    pub fn invalid_constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConstraint, message)
    }

    /// Create a signing key invalid error
    pub fn signing_key_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningKeyInvalid, message)
    }

    /// Create a policy limit exceeded error
    pub fn policy_limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyLimitExceeded, message)
    }

    /// Create a policy not found error
    pub fn policy_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyNotFound, message)
    }

    /// Create a signature mismatch error
    pub fn signature_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureMismatch, message)
    }

    /// Create a revoked or unknown policy error
    pub fn revoked_or_unknown_policy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RevokedOrUnknownPolicy, message)
    }

    /// Create an expired error
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create a not yet valid error
    pub fn not_yet_valid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotYetValid, message)
    }

    /// Create an ip not allowed error
    pub fn ip_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IpNotAllowed, message)
    }

    /// Create an insecure protocol error
    pub fn insecure_protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsecureProtocol, message)
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create a token malformed error
    pub fn token_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenMalformed, message)
    }

    /// Create a resource mismatch error
    pub fn resource_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceMismatch, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedPermissionString => write!(f, "malformed permission string"),
            ErrorKind::InvalidConstraint => write!(f, "invalid constraint"),
            ErrorKind::SigningKeyInvalid => write!(f, "invalid signing key"),
            ErrorKind::PolicyLimitExceeded => write!(f, "policy limit exceeded"),
            ErrorKind::PolicyNotFound => write!(f, "policy not found"),
            ErrorKind::SignatureMismatch => write!(f, "signature mismatch"),
            ErrorKind::RevokedOrUnknownPolicy => write!(f, "revoked or unknown policy"),
            ErrorKind::Expired => write!(f, "expired"),
            ErrorKind::NotYetValid => write!(f, "not yet valid"),
            ErrorKind::IpNotAllowed => write!(f, "ip not allowed"),
            ErrorKind::InsecureProtocol => write!(f, "insecure protocol"),
            ErrorKind::PermissionDenied => write!(f, "permission denied"),
            ErrorKind::TokenMalformed => write!(f, "malformed token"),
            ErrorKind::ResourceMismatch => write!(f, "resource mismatch"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::token_malformed(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = Error::permission_denied("list is not granted");
        assert_eq!(err.to_string(), "permission denied: list is not granted");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.message(), "list is not granted");
    }

    #[test]
    fn test_verification_failure_classification() {
        assert!(Error::expired("x").is_verification_failure());
        assert!(Error::revoked_or_unknown_policy("x").is_verification_failure());
        assert!(!Error::policy_limit_exceeded("x").is_verification_failure());
        assert!(!Error::signing_key_invalid("x").is_verification_failure());
    }
}
