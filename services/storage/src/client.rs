use azstore_core::{Context, Error, Result, Signer};
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use log::debug;
use percent_encoding::utf8_percent_encode;

use crate::constants::{PATH_ENCODE_SET, QUERY_ENCODE_SET};
use crate::provide_credential::DefaultCredentialProvider;
use crate::{Config, Credential, RequestSigner, Service};

/// Percent encode a resource path.
pub(crate) fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, &PATH_ENCODE_SET).to_string()
}

/// Percent encode a query value.
pub(crate) fn encode_query(value: &str) -> String {
    utf8_percent_encode(value, &QUERY_ENCODE_SET).to_string()
}

/// Everything a storage client needs to send a signed request.
#[derive(Clone, Debug)]
pub(crate) struct ClientCore {
    base_url: String,
    signer: Signer<Credential>,
}

impl ClientCore {
    pub fn new(ctx: Context, service: Service, config: Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let builder = RequestSigner::new(service);
        let loader = DefaultCredentialProvider::new(config);

        Ok(Self {
            base_url,
            signer: Signer::new(ctx, loader, builder),
        })
    }

    /// Build the full url of `path`, which starts without `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sign and send a request, whatever status comes back.
    pub async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        self.signer.sign(&mut parts).await?;
        let req = Request::from_parts(parts, body);

        debug!("sending {} {}", req.method(), req.uri());
        let resp = self.signer.context().http_send(req).await?;
        debug!("got response status {}", resp.status());
        Ok(resp)
    }

    /// Send a mutating call and hand its status back untranslated.
    pub async fn send_for_status(&self, req: Request<Bytes>) -> Result<StatusCode> {
        Ok(self.send(req).await?.status())
    }

    /// Send a data call, failing on any non-success status.
    pub async fn send_for_body(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let what = format!("{} {}", req.method(), req.uri().path());
        let resp = self.send(req).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::http_status(
                status,
                format!("{what} failed with status {status}: {}", String::from_utf8_lossy(resp.body())),
            ));
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("container/blob.txt", "container/blob.txt")]
    #[test_case("c/dir/a b.txt", "c/dir/a%20b.txt")]
    #[test_case("c/ü", "c/%C3%BC")]
    #[test_case("c/a?b#c", "c/a%3Fb%23c")]
    fn test_encode_path(input: &str, expected: &str) {
        assert_eq!(encode_path(input), expected);
    }

    #[test_case("PartitionKey eq 'a'", "PartitionKey%20eq%20%27a%27")]
    #[test_case("a/b+c=", "a%2Fb%2Bc%3D")]
    fn test_encode_query(input: &str, expected: &str) {
        assert_eq!(encode_query(input), expected);
    }
}
