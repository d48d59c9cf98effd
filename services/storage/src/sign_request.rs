use std::fmt::Write;
use std::net::IpAddr;

use async_trait::async_trait;
use azstore_core::hash::base64_hmac_sha256;
use azstore_core::time::{format_http_date, now, DateTime};
use azstore_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::request::Parts;
use http::{header, HeaderName, HeaderValue};
use log::debug;

use crate::constants::*;
use crate::{Credential, Service};

/// RequestSigner that implements Shared Key authorization.
///
/// Blob and queue requests use the full string-to-sign with canonicalized
/// `x-ms-*` headers. Table requests use the shortened form and mirror the
/// date into the standard `Date` header.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
#[derive(Debug)]
pub struct RequestSigner {
    service: Service,
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given service.
    pub fn new(service: Service) -> Self {
        Self {
            service,
            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    fn is_table(&self) -> bool {
        self.service == Service::Table
    }

    fn sign(&self, ctx: &mut SigningRequest, cred: &Credential) -> Result<()> {
        let now_time = self.time.unwrap_or_else(now);
        let date = format_http_date(now_time);

        ctx.headers
            .insert(X_MS_VERSION, HeaderValue::from_static(STORAGE_VERSION));
        ctx.headers.insert(X_MS_DATE, date.parse()?);
        if self.is_table() {
            ctx.headers.insert(header::DATE, date.parse()?);
            ctx.headers.insert(
                DATA_SERVICE_VERSION,
                HeaderValue::from_static(DATA_SERVICE_VERSION_VALUE),
            );
            ctx.headers.insert(
                MAX_DATA_SERVICE_VERSION,
                HeaderValue::from_static(DATA_SERVICE_VERSION_VALUE),
            );
        }

        let string_to_sign = self.string_to_sign(ctx, cred.account_name())?;
        let signature = base64_hmac_sha256(cred.account_key(), string_to_sign.as_bytes());

        let mut value: HeaderValue =
            format!("SharedKey {}:{signature}", cred.account_name()).parse()?;
        value.set_sensitive(true);
        ctx.headers.insert(header::AUTHORIZATION, value);

        Ok(())
    }

    /// Construct string to sign
    ///
    /// ## Format
    ///
    /// Blob and queue:
    ///
    /// ```text
    /// VERB + "\n" +
    /// Content-Encoding + "\n" +
    /// Content-Language + "\n" +
    /// Content-Length + "\n" +
    /// Content-MD5 + "\n" +
    /// Content-Type + "\n" +
    /// Date + "\n" +
    /// If-Modified-Since + "\n" +
    /// If-Match + "\n" +
    /// If-None-Match + "\n" +
    /// If-Unmodified-Since + "\n" +
    /// Range + "\n" +
    /// CanonicalizedHeaders + "\n" +
    /// CanonicalizedResource;
    /// ```
    ///
    /// Table:
    ///
    /// ```text
    /// VERB + "\n" +
    /// Content-MD5 + "\n" +
    /// Content-Type + "\n" +
    /// Date + "\n" +
    /// CanonicalizedResource;
    /// ```
    ///
    /// Absent headers still contribute their (empty) line.
    pub(crate) fn string_to_sign(&self, ctx: &SigningRequest, account_name: &str) -> Result<String> {
        let mut s = String::with_capacity(256);
        let content_md5 = HeaderName::from_static(CONTENT_MD5);

        writeln!(&mut s, "{}", ctx.method.as_str().to_ascii_uppercase())?;
        if !self.is_table() {
            writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_ENCODING)?)?;
            writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?)?;
            writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LENGTH)?)?;
        }
        writeln!(&mut s, "{}", ctx.header_get_or_default(&content_md5)?)?;
        writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_TYPE)?)?;
        writeln!(&mut s, "{}", ctx.header_get_or_default(&header::DATE)?)?;
        if !self.is_table() {
            for name in [
                header::IF_MODIFIED_SINCE,
                header::IF_MATCH,
                header::IF_NONE_MATCH,
                header::IF_UNMODIFIED_SINCE,
                header::RANGE,
            ] {
                writeln!(&mut s, "{}", ctx.header_get_or_default(&name)?)?;
            }
            writeln!(&mut s, "{}", canonicalize_header(ctx)?)?;
        }
        write!(&mut s, "{}", self.canonicalize_resource(ctx, account_name))?;

        debug!("string to sign: {:?}", &s);

        Ok(s)
    }

    /// ## Reference
    ///
    /// - [Constructing the canonicalized resource string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
    ///
    /// The host never takes part, so the addressing style doesn't change the
    /// signature. Path-style uris already carry the account as their first
    /// segment and keep it: the emulator expects the account named twice.
    fn canonicalize_resource(&self, ctx: &SigningRequest, account_name: &str) -> String {
        let mut s = format!("/{}{}", account_name, ctx.path);
        if self.is_table() {
            return s;
        }

        for (k, v) in ctx.query_grouped() {
            s.push('\n');
            s.push_str(&k.to_lowercase());
            s.push(':');
            s.push_str(&v);
        }
        s
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_invalid("credential is required"));
        };

        let mut ctx = SigningRequest::build(req)?;
        let signed = self.sign(&mut ctx, cred);
        // Hand the headers back even when signing failed.
        ctx.apply(req)?;
        signed
    }
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(ctx: &SigningRequest) -> Result<String> {
    Ok(SigningRequest::header_to_string(
        ctx.header_to_vec_with_prefix(PREFIX_STORAGE_HEADER)?,
        ":",
        "\n",
    ))
}

/// Check whether the host (with optional port) is a literal ip address.
///
/// Such hosts are emulator endpoints, which address the account with a path
/// segment instead of a subdomain.
pub fn is_path_style_host(host: &str) -> bool {
    let host = host.trim();
    if let Some(v) = host.strip_prefix('[') {
        // [::1]:10000
        return v
            .split_once(']')
            .is_some_and(|(ip, _)| ip.parse::<IpAddr>().is_ok());
    }
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    match host.rsplit_once(':') {
        Some((ip, port)) => port.parse::<u16>().is_ok() && ip.parse::<IpAddr>().is_ok(),
        None => false,
    }
}
