use async_trait::async_trait;
use azstore_core::{Context, ProvideCredential, Result};
use log::debug;

use crate::constants::*;
use crate::credential::Credential;

/// EnvCredentialProvider loads the account name and key from env.
///
/// - `AZURE_STORAGE_ACCOUNT_NAME` or `AZBLOB_ACCOUNT_NAME`
/// - `AZURE_STORAGE_ACCOUNT_KEY` or `AZBLOB_ACCOUNT_KEY`
#[derive(Clone, Debug, Default)]
pub struct EnvCredentialProvider {}

impl EnvCredentialProvider {
    /// Create a new env provider.
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        let account_name = envs
            .get(AZURE_STORAGE_ACCOUNT_NAME)
            .or_else(|| envs.get(AZBLOB_ACCOUNT_NAME));
        let account_key = envs
            .get(AZURE_STORAGE_ACCOUNT_KEY)
            .or_else(|| envs.get(AZBLOB_ACCOUNT_KEY));

        match (account_name, account_key) {
            (Some(name), Some(key)) => Ok(Some(Credential::new(name, key)?)),
            _ => {
                debug!("account name or key not found in env");
                Ok(None)
            }
        }
    }
}
