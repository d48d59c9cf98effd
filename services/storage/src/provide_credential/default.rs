use async_trait::async_trait;
use azstore_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

use crate::provide_credential::{ConfigCredentialProvider, EnvCredentialProvider};
use crate::{Config, Credential};

/// Default loader that tries multiple credential sources in order.
///
/// 1. Configuration (account name and key)
/// 2. Environment (`AZURE_STORAGE_ACCOUNT_*`, `AZBLOB_ACCOUNT_*`)
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl DefaultCredentialProvider {
    /// Create a new default loader over the given config.
    pub fn new(config: Config) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(ConfigCredentialProvider::new(config))
            .push(EnvCredentialProvider::new());

        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
