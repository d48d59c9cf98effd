//! Blob, queue and table storage with convenience constructors.

pub use azstore_storage::*;

#[cfg(feature = "default-context")]
use crate::{default_context, Result};

/// Load the config of `service` from env, falling back to the local emulator
/// when no account is configured.
///
/// # Example
///
/// ```no_run
/// use azstore::storage::{default_config, Service};
///
/// let config = default_config(Service::Blob)?;
/// println!("{}", config.base_url()?);
/// # Ok::<(), azstore::Error>(())
/// ```
#[cfg(feature = "default-context")]
pub fn default_config(service: Service) -> Result<Config> {
    let config = Config::default().from_env(&default_context(), service)?;
    if config.account_name.is_some() {
        Ok(config)
    } else {
        Ok(Config::development(service))
    }
}

/// Create a blob client over [`default_context`] and [`default_config`].
#[cfg(feature = "default-context")]
pub fn default_blob_client() -> Result<BlobClient> {
    BlobClient::new(default_context(), default_config(Service::Blob)?)
}

/// Create a queue client over [`default_context`] and [`default_config`].
#[cfg(feature = "default-context")]
pub fn default_queue_client() -> Result<QueueClient> {
    QueueClient::new(default_context(), default_config(Service::Queue)?)
}

/// Create a table client over [`default_context`] and [`default_config`].
#[cfg(feature = "default-context")]
pub fn default_table_client() -> Result<TableClient> {
    TableClient::new(default_context(), default_config(Service::Table)?)
}
