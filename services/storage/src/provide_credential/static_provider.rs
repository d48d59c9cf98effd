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

use async_trait::async_trait;
use azstore_core::{Context, ProvideCredential, Result};

use crate::credential::Credential;

/// StaticCredentialProvider always returns the credential it was built with.
#[derive(Clone, Debug)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider from an account name and its base64 encoded key.
    pub fn new(account_name: &str, account_key: &str) -> Result<Self> {
        Ok(Self {
            credential: Credential::new(account_name, account_key)?,
        })
    }

    /// Create a provider for the local storage emulator account.
    pub fn development() -> Self {
        Self {
            credential: Credential::development(),
        }
    }
}

impl From<Credential> for StaticCredentialProvider {
    fn from(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _ctx: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azstore_core::ErrorKind;

    #[tokio::test]
    async fn test_static_credential_provider() {
        let provider = StaticCredentialProvider::new("myaccount", "bXlrZXk=").unwrap();
        let cred = provider
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cred.account_name(), "myaccount");
        assert_eq!(cred.account_key(), b"mykey");
    }

    #[test]
    fn test_static_credential_provider_invalid_key() {
        let err = StaticCredentialProvider::new("myaccount", "not base64!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    }
}
