//! Blob, queue and table storage with Shared Key authorization.
//!
//! This crate provides:
//! - Shared Key signing of blob, queue and table requests
//! - Connection string and environment based configuration
//! - The Atom entity codec used by the table service
//! - Clients for the common blob, queue and table operations with paged
//!   listing
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use azstore_core::{Context, OsEnv, Result};
//! use azstore_http_send_reqwest::ReqwestHttpSend;
//! use azstore_storage::{BlobClient, Config, Service};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     // Talk to the local emulator unless the environment says otherwise.
//!     let config = Config::development(Service::Blob).from_env(&ctx, Service::Blob)?;
//!     let client = BlobClient::new(ctx, config)?;
//!
//!     client.create_container("photos", false).await?;
//!     client
//!         .put_blob("photos", "cat.txt", "meow", "text/plain", &BTreeMap::new())
//!         .await?;
//!
//!     let mut blobs = client.list_blobs("photos", None);
//!     while let Some(blob) = blobs.next().await? {
//!         println!("{} {}", blob.name, blob.etag);
//!     }
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::{Config, Service};

mod connection_string;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::{is_path_style_host, RequestSigner};

mod provide_credential;
pub use provide_credential::*;

pub mod entity;
pub use entity::{Entity, PropertyValue, WriteMode};

mod listing;
pub use listing::{parse_blobs, parse_containers, BlobItem, ContainerItem, FetchPage, Lister, Page};

mod client;

mod blob;
pub use blob::{BlobClient, BlobContent, BlobPages, ContainerPages};

mod queue;
pub use queue::{QueueClient, QueueMessage};

mod table;
pub use table::{EntityQuery, Table, TableClient};
