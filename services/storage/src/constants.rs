use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers used in the Shared Key scheme.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
pub const DATA_SERVICE_VERSION: &str = "dataserviceversion";
pub const MAX_DATA_SERVICE_VERSION: &str = "maxdataserviceversion";
pub const CONTENT_MD5: &str = "content-md5";

/// Only headers with this prefix take part in the canonicalized headers block.
pub const PREFIX_STORAGE_HEADER: &str = "x-ms-";
pub const PREFIX_METADATA: &str = "x-ms-meta-";
pub const PREFIX_PROPERTIES: &str = "x-ms-prop-";

pub const STORAGE_VERSION: &str = "2011-08-18";
pub const DATA_SERVICE_VERSION_VALUE: &str = "1.0;NetFx";

// Local emulator.
pub const DEVSTORE_ACCOUNT: &str = "devstoreaccount1";
pub const DEVSTORE_SECRET_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
pub const DEVSTORE_BLOB_HOST: &str = "127.0.0.1:10000";
pub const DEVSTORE_QUEUE_HOST: &str = "127.0.0.1:10001";
pub const DEVSTORE_TABLE_HOST: &str = "127.0.0.1:10002";

pub const CLOUD_ENDPOINT_SUFFIX: &str = "core.windows.net";

// Entity wire format.
pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
pub const NS_DATA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
pub const NS_METADATA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";
pub const XML_CONTENT_TYPE: &str = "application/xml";

// Env values used by the providers and config.
pub const AZURE_STORAGE_ACCOUNT_NAME: &str = "AZURE_STORAGE_ACCOUNT_NAME";
pub const AZURE_STORAGE_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT_KEY";
pub const AZBLOB_ACCOUNT_NAME: &str = "AZBLOB_ACCOUNT_NAME";
pub const AZBLOB_ACCOUNT_KEY: &str = "AZBLOB_ACCOUNT_KEY";
pub const AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// AsciiSet for resource paths. `/` is kept so blob names may carry virtual
/// directories.
pub static PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// AsciiSet for query values.
pub static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
