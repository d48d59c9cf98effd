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

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use azstore_core::hash::base64_decode;
use azstore_core::utils::Redact;
use azstore_core::{Error, Result, SigningCredential};

use crate::constants::{DEVSTORE_ACCOUNT, DEVSTORE_SECRET_KEY};

/// Shared Key credential: an account name and the raw account key.
///
/// The key is decoded from its base64 text once, at construction, and never
/// changes afterwards. Clones share the same key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    account_name: String,
    account_key: Arc<[u8]>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key[..]))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.account_name.is_empty() && !self.account_key.is_empty()
    }
}

impl Credential {
    /// Create a new credential from the account name and the base64 encoded
    /// account key.
    pub fn new(account_name: &str, account_key: &str) -> Result<Self> {
        if account_name.is_empty() {
            return Err(Error::credential_invalid("account name is empty"));
        }
        let key = base64_decode(account_key).map_err(|e| {
            Error::credential_invalid(format!(
                "account key of {account_name} is not valid base64"
            ))
            .with_source(e)
        })?;
        if key.is_empty() {
            return Err(Error::credential_invalid("account key is empty"));
        }

        Ok(Self {
            account_name: account_name.to_string(),
            account_key: key.into(),
        })
    }

    /// Credential of the local storage emulator.
    pub fn development() -> Self {
        Self::new(DEVSTORE_ACCOUNT, DEVSTORE_SECRET_KEY)
            .expect("development key must be valid base64")
    }

    /// Account name.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Raw account key bytes.
    pub fn account_key(&self) -> &[u8] {
        &self.account_key
    }
}
