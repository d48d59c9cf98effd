use std::fmt::{Debug, Formatter};

use azstore_core::utils::Redact;
use azstore_core::{Context, Error, Result};
use log::debug;

use crate::constants::*;
use crate::sign_request::is_path_style_host;
use crate::{connection_string, Credential};

/// The storage service a client talks to.
///
/// Table requests are signed with the shortened string-to-sign, blob and
/// queue requests with the full one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Blob service.
    Blob,
    /// Queue service.
    Queue,
    /// Table service.
    Table,
}

impl Service {
    /// Name of the service as it appears in cloud host names.
    pub fn endpoint_name(&self) -> &'static str {
        match self {
            Service::Blob => "blob",
            Service::Queue => "queue",
            Service::Table => "table",
        }
    }

    /// Host of the local storage emulator for this service.
    pub fn development_host(&self) -> &'static str {
        match self {
            Service::Blob => DEVSTORE_BLOB_HOST,
            Service::Queue => DEVSTORE_QUEUE_HOST,
            Service::Table => DEVSTORE_TABLE_HOST,
        }
    }

    /// Host of the public cloud for this service.
    pub fn cloud_host(&self) -> String {
        format!("{}.{CLOUD_ENDPOINT_SUFFIX}", self.endpoint_name())
    }

    fn host_env(&self) -> String {
        format!(
            "AZURE_STORAGE_{}_HOST",
            self.endpoint_name().to_ascii_uppercase()
        )
    }
}

/// Config carries all the configuration of one storage client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ACCOUNT_NAME`] or [`AZBLOB_ACCOUNT_NAME`]
    /// - connection string: `AccountName`
    pub account_name: Option<String>,
    /// Base64 encoded account key, loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ACCOUNT_KEY`] or [`AZBLOB_ACCOUNT_KEY`]
    /// - connection string: `AccountKey`
    pub account_key: Option<String>,
    /// Service host with optional port, like `blob.core.windows.net` or
    /// `127.0.0.1:10000`.
    ///
    /// - env value: `AZURE_STORAGE_BLOB_HOST`, `AZURE_STORAGE_QUEUE_HOST`
    ///   or `AZURE_STORAGE_TABLE_HOST`
    pub host: Option<String>,
    /// `http` or `https`, defaults to `http`.
    pub protocol: Option<String>,
    /// Full base url, used as is instead of building one from host and
    /// account.
    pub endpoint: Option<String>,
    /// Address the account with a path segment instead of a subdomain.
    ///
    /// Inferred from the host when unset: literal ip addresses use
    /// path-style.
    pub use_path_style: Option<bool>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("host", &self.host)
            .field("protocol", &self.protocol)
            .field("endpoint", &self.endpoint)
            .field("use_path_style", &self.use_path_style)
            .finish()
    }
}

impl Config {
    /// Config of the local storage emulator.
    pub fn development(service: Service) -> Self {
        Self {
            account_name: Some(DEVSTORE_ACCOUNT.to_string()),
            account_key: Some(DEVSTORE_SECRET_KEY.to_string()),
            host: Some(service.development_host().to_string()),
            ..Default::default()
        }
    }

    /// Config of an account in the public cloud.
    pub fn cloud(service: Service, account_name: &str, account_key: &str) -> Self {
        Self {
            account_name: Some(account_name.to_string()),
            account_key: Some(account_key.to_string()),
            host: Some(service.cloud_host()),
            ..Default::default()
        }
    }

    /// Parses an [Azure connection string][1] into a configuration object.
    ///
    /// The connection string doesn't have to specify all required parameters
    /// because the user is still allowed to set them later directly on the object.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// DefaultEndpointsProtocol=https;
    /// EndpointSuffix=core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn try_from_connection_string(conn_str: &str, service: Service) -> Result<Self> {
        connection_string::parse(conn_str, service)
    }

    /// Load config from env.
    ///
    /// A connection string in [`AZURE_STORAGE_CONNECTION_STRING`] is read
    /// first, the single value envs override what it sets. Fields already set
    /// on `self` win over both.
    pub fn from_env(self, ctx: &Context, service: Service) -> Result<Self> {
        let envs = ctx.env_vars();

        let mut loaded = match envs.get(AZURE_STORAGE_CONNECTION_STRING) {
            Some(v) => Self::try_from_connection_string(v, service)?,
            None => Self::default(),
        };

        if let Some(v) = envs
            .get(AZURE_STORAGE_ACCOUNT_NAME)
            .or_else(|| envs.get(AZBLOB_ACCOUNT_NAME))
        {
            loaded.account_name = Some(v.to_string());
        }
        if let Some(v) = envs
            .get(AZURE_STORAGE_ACCOUNT_KEY)
            .or_else(|| envs.get(AZBLOB_ACCOUNT_KEY))
        {
            loaded.account_key = Some(v.to_string());
        }
        if let Some(v) = envs.get(&service.host_env()) {
            loaded.host = Some(v.to_string());
        }

        Ok(self.merge(loaded))
    }

    /// Fill the unset fields of `self` from `other`.
    fn merge(self, other: Self) -> Self {
        Self {
            account_name: self.account_name.or(other.account_name),
            account_key: self.account_key.or(other.account_key),
            host: self.host.or(other.host),
            protocol: self.protocol.or(other.protocol),
            endpoint: self.endpoint.or(other.endpoint),
            use_path_style: self.use_path_style.or(other.use_path_style),
        }
    }

    /// Whether the account is addressed with a path segment.
    pub fn is_path_style(&self) -> bool {
        self.use_path_style.unwrap_or_else(|| {
            self.host
                .as_deref()
                .map(is_path_style_host)
                .unwrap_or_default()
        })
    }

    /// Build the credential described by this config, if any.
    pub fn credential(&self) -> Result<Option<Credential>> {
        match (&self.account_name, &self.account_key) {
            (Some(name), Some(key)) => Credential::new(name, key).map(Some),
            _ => Ok(None),
        }
    }

    /// Base url every resource path of the client is appended to.
    ///
    /// - path-style: `<protocol>://<host>/<account>`
    /// - subdomain-style: `<protocol>://<account>.<host>`
    pub fn base_url(&self) -> Result<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        let account = self
            .account_name
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_invalid("account name is required to build base url"))?;
        let host = self
            .host
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_invalid("host is required to build base url"))?;
        let protocol = self.protocol.as_deref().unwrap_or("http");
        if protocol != "http" && protocol != "https" {
            return Err(Error::config_invalid(format!(
                "protocol must be http or https, got {protocol}"
            )));
        }

        let url = if self.is_path_style() {
            format!("{protocol}://{host}/{account}")
        } else {
            format!("{protocol}://{account}.{host}")
        };
        debug!("storage base url resolved to {url}");
        Ok(url)
    }
}
