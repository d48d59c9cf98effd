//! Reqwest-based transport for azstore.
//!
//! This crate provides `ReqwestHttpSend`, the `HttpSend` implementation the
//! storage clients use to reach the service.
//!
//! ## Example
//!
//! ```no_run
//! use azstore_core::{Context, OsEnv};
//! use azstore_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new()
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//! ```

use async_trait::async_trait;
use azstore_core::{Error, HttpSend, Result};
use bytes::Bytes;
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
///
/// Any response that arrives is returned as is, whatever its status. Only
/// failures to build the request or reach the service are errors.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected("failed to send request").with_source(e))?;

        let mut builder = http::Response::builder()
            .status(resp.status())
            .version(resp.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(resp.headers().clone());
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;

        Ok(builder.body(body)?)
    }
}
