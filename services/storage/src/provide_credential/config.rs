use async_trait::async_trait;
use azstore_core::{Context, ProvideCredential, Result};

use crate::{Config, Credential};

/// ConfigCredentialProvider builds the credential from a [`Config`].
///
/// Returns `None` when the config lacks either the account name or the key.
#[derive(Clone, Debug, Default)]
pub struct ConfigCredentialProvider {
    config: Config,
}

impl ConfigCredentialProvider {
    /// Create a provider over the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        self.config.credential()
    }
}
