use std::collections::BTreeMap;

use async_trait::async_trait;
use azstore_core::{Context, Error, Result};
use bytes::Bytes;
use http::{header, Method, Request, StatusCode};
use log::debug;

use crate::client::{encode_path, encode_query, ClientCore};
use crate::constants::*;
use crate::listing::{parse_blobs, parse_containers, BlobItem, ContainerItem, FetchPage, Lister, Page};
use crate::{Config, Service};

/// Blob content together with its user metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    /// `x-ms-meta-*` headers of the blob, keyed without the prefix.
    pub metadata: BTreeMap<String, String>,
    /// Blob bytes.
    pub data: Bytes,
}

/// Client of the blob service.
///
/// Calls that change state return the response status as is, calls that
/// return data fail with an [`azstore_core::ErrorKind::HttpStatus`] error on
/// any non-success status.
#[derive(Clone, Debug)]
pub struct BlobClient {
    core: ClientCore,
}

impl BlobClient {
    /// Create a client from its config.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            core: ClientCore::new(ctx, Service::Blob, config)?,
        })
    }

    /// Create a container, optionally open to anonymous reads.
    pub async fn create_container(&self, name: &str, public: bool) -> Result<StatusCode> {
        let mut req = Request::put(self.container_url(name))
            .header(header::CONTENT_LENGTH, "0");
        if public {
            req = req.header(format!("{PREFIX_PROPERTIES}publicaccess"), "true");
        }
        self.core.send_for_status(req.body(Bytes::new())?).await
    }

    /// Delete a container.
    pub async fn delete_container(&self, name: &str) -> Result<StatusCode> {
        let req = Request::delete(self.container_url(name)).body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// List all containers of the account.
    pub fn list_containers(&self) -> Lister<ContainerPages> {
        Lister::new(ContainerPages {
            client: self.clone(),
        })
    }

    /// Upload a block blob in one call.
    pub async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<StatusCode> {
        let data = data.into();
        let mut req = Request::put(self.blob_url(container, blob))
            .header(header::CONTENT_LENGTH, data.len())
            .header(X_MS_BLOB_TYPE, "BlockBlob");
        if !content_type.is_empty() {
            req = req.header(header::CONTENT_TYPE, content_type);
        }
        for (k, v) in metadata {
            req = req.header(format!("{PREFIX_METADATA}{k}"), v.as_str());
        }
        self.core.send_for_status(req.body(data)?).await
    }

    /// Delete a blob.
    pub async fn delete_blob(&self, container: &str, blob: &str) -> Result<StatusCode> {
        let req = Request::delete(self.blob_url(container, blob)).body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// Download a blob.
    pub async fn get_blob(&self, container: &str, blob: &str) -> Result<Bytes> {
        let req = Request::get(self.blob_url(container, blob)).body(Bytes::new())?;
        Ok(self.core.send_for_body(req).await?.into_body())
    }

    /// Download a blob along with its user metadata.
    pub async fn get_blob_with_metadata(&self, container: &str, blob: &str) -> Result<BlobContent> {
        let req = Request::get(self.blob_url(container, blob)).body(Bytes::new())?;
        let (parts, data) = self.core.send_for_body(req).await?.into_parts();

        let mut metadata = BTreeMap::new();
        for (name, value) in &parts.headers {
            if let Some(key) = name.as_str().strip_prefix(PREFIX_METADATA) {
                metadata.insert(key.to_string(), value.to_str()?.to_string());
            }
        }
        Ok(BlobContent { metadata, data })
    }

    /// Check whether a blob exists.
    ///
    /// Any failure, including a failure to reach the service, counts as
    /// absent.
    pub async fn blob_exists(&self, container: &str, blob: &str) -> bool {
        let req = match Request::head(self.blob_url(container, blob)).body(Bytes::new()) {
            Ok(req) => req,
            Err(_) => return false,
        };
        match self.core.send(req).await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                debug!("blob {container}/{blob} treated as absent: {err}");
                false
            }
        }
    }

    /// List the blobs of a container, optionally only those starting with
    /// `prefix`.
    pub fn list_blobs(&self, container: &str, prefix: Option<&str>) -> Lister<BlobPages> {
        Lister::new(BlobPages {
            client: self.clone(),
            container: container.to_string(),
            prefix: prefix.map(str::to_string),
        })
    }

    /// Upload one uncommitted block of a blob.
    pub async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: impl Into<Bytes>,
    ) -> Result<StatusCode> {
        let data = data.into();
        let url = format!(
            "{}?comp=block&blockid={}",
            self.blob_url(container, blob),
            encode_query(block_id)
        );
        let req = Request::put(url)
            .header(header::CONTENT_LENGTH, data.len())
            .body(data)?;
        self.core.send_for_status(req).await
    }

    fn container_url(&self, container: &str) -> String {
        format!("{}?restype=container", self.core.url(&encode_path(container)))
    }

    fn blob_url(&self, container: &str, blob: &str) -> String {
        self.core.url(&encode_path(&format!("{container}/{blob}")))
    }

    async fn fetch_listing(&self, mut url: String, marker: Option<&str>) -> Result<Bytes> {
        if let Some(marker) = marker {
            url.push_str("&marker=");
            url.push_str(&encode_query(marker));
        }
        let req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Bytes::new())?;
        Ok(self.core.send_for_body(req).await?.into_body())
    }
}

/// Pages of `List Containers`.
#[derive(Debug)]
pub struct ContainerPages {
    client: BlobClient,
}

#[async_trait]
impl FetchPage for ContainerPages {
    type Item = ContainerItem;

    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<ContainerItem>> {
        let url = self.client.core.url("?comp=list");
        let body = self.client.fetch_listing(url, marker).await?;
        parse_containers(&body)
    }
}

/// Pages of `List Blobs`.
#[derive(Debug)]
pub struct BlobPages {
    client: BlobClient,
    container: String,
    prefix: Option<String>,
}

#[async_trait]
impl FetchPage for BlobPages {
    type Item = BlobItem;

    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<BlobItem>> {
        if self.container.is_empty() {
            return Err(Error::request_invalid("container name is required to list blobs"));
        }

        let mut url = format!(
            "{}?restype=container&comp=list",
            self.client.core.url(&encode_path(&self.container))
        );
        if let Some(prefix) = &self.prefix {
            url.push_str("&prefix=");
            url.push_str(&encode_query(prefix));
        }
        let body = self.client.fetch_listing(url, marker).await?;
        parse_blobs(&body)
    }
}
