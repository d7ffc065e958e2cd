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

// Query parameters of a service SAS.
pub const SIGNED_VERSION: &str = "sv";
pub const SIGNED_RESOURCE: &str = "sr";
pub const SIGNED_START: &str = "st";
pub const SIGNED_EXPIRY: &str = "se";
pub const SIGNED_PERMISSIONS: &str = "sp";
pub const SIGNED_IDENTIFIER: &str = "si";
pub const SIGNED_IP: &str = "sip";
pub const SIGNED_PROTOCOL: &str = "spr";
pub const SIGNATURE: &str = "sig";
pub const RESPONSE_CACHE_CONTROL: &str = "rscc";
pub const RESPONSE_CONTENT_DISPOSITION: &str = "rscd";
pub const RESPONSE_CONTENT_ENCODING: &str = "rsce";
pub const RESPONSE_CONTENT_LANGUAGE: &str = "rscl";
pub const RESPONSE_CONTENT_TYPE: &str = "rsct";

/// Signed version used when none is configured.
pub const DEFAULT_SAS_VERSION: &str = "2019-12-12";

/// Service prefix of the canonicalized resource.
pub const CANONICAL_SERVICE: &str = "blob";

/// Maximum stored access policies per container.
pub const MAX_STORED_POLICIES: usize = 5;

/// Maximum length of a stored access policy identifier.
pub const MAX_POLICY_ID_LEN: usize = 64;

// Naming limits of containers and blobs.
pub const MIN_CONTAINER_NAME_LEN: usize = 3;
pub const MAX_CONTAINER_NAME_LEN: usize = 63;
pub const MAX_BLOB_NAME_LEN: usize = 1024;

// Env values used to load config.
pub const AZBLOB_ACCOUNT_NAME: &str = "AZBLOB_ACCOUNT_NAME";
pub const AZBLOB_ACCOUNT_KEY: &str = "AZBLOB_ACCOUNT_KEY";
pub const AZBLOB_SAS_VERSION: &str = "AZBLOB_SAS_VERSION";
