use std::collections::BTreeMap;
use std::mem;

use http::header::HeaderName;
use http::uri::Authority;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;

use crate::{Error, Result};

/// Signing context for request.
///
/// Built from `http::request::Parts` by taking its headers out; the uri is
/// only read. [`SigningRequest::apply`] hands the (possibly extended) headers
/// back, so signing never touches anything but the header map.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, still percent encoded as it appears in the uri.
    pub path: String,
    /// HTTP query parameters, percent decoded, in uri order.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = &parts.uri;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| Error::request_invalid("request without authority is invalid for signing"))?;

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme().cloned().unwrap_or(Scheme::HTTP),
            authority,
            path: match uri.path() {
                "" => "/".to_string(),
                v => v.to_string(),
            },
            query: uri
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        mem::swap(&mut parts.headers, &mut self.headers);
        Ok(())
    }

    /// Get the host of the authority without port.
    pub fn host(&self) -> &str {
        self.authority.host()
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Get headers whose name starts with prefix, names lowercased and
    /// values trimmed of surrounding whitespace.
    pub fn header_to_vec_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut headers = Vec::new();
        for (k, v) in self.headers.iter() {
            let name = k.as_str().to_ascii_lowercase();
            if !name.starts_with(&prefix) {
                continue;
            }
            headers.push((name, v.to_str()?.trim().to_string()));
        }
        Ok(headers)
    }

    /// Convert sorted headers to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn header_to_string(mut headers: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        // Sort via header name.
        headers.sort();

        for (idx, (k, v)) in headers.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }

    /// Group query values by name, names sorted ascending and each name's
    /// values sorted and comma joined.
    ///
    /// ```shell
    /// [(comp, list), (a, 2), (a, 1)] => [("a", "1,2"), ("comp", "list")]
    /// ```
    pub fn query_grouped(&self) -> Vec<(String, String)> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (k, v) in &self.query {
            grouped.entry(k.as_str()).or_default().push(v.as_str());
        }

        grouped
            .into_iter()
            .map(|(k, mut vs)| {
                vs.sort_unstable();
                (k.to_string(), vs.join(","))
            })
            .collect()
    }
}
