use std::collections::HashMap;

use azstore_core::{Error, Result};

use crate::{Config, Service};

/// Parses an [Azure connection string][1].
///
/// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
pub(crate) fn parse(conn_str: &str, service: Service) -> Result<Config> {
    let key_values = parse_into_key_values(conn_str)?;

    if key_values.get("UseDevelopmentStorage").map(String::as_str) == Some("true") {
        return Ok(collect_development_config(&key_values, service));
    }

    let mut config = Config {
        account_name: key_values.get("AccountName").cloned(),
        account_key: key_values.get("AccountKey").cloned(),
        ..Default::default()
    };

    if let Some(protocol) = key_values.get("DefaultEndpointsProtocol") {
        if protocol != "http" && protocol != "https" {
            return Err(Error::config_invalid(format!(
                "invalid DefaultEndpointsProtocol: {protocol}"
            )));
        }
        config.protocol = Some(protocol.clone());
    }

    if let Some(endpoint) = key_values.get(endpoint_key(service)) {
        // An explicit endpoint is used as is.
        config.endpoint = Some(endpoint.clone());
    } else if let Some(suffix) = key_values.get("EndpointSuffix") {
        config.host = Some(format!("{}.{suffix}", service.endpoint_name()));
        // Connection strings default to https, unlike bare configs.
        config.protocol.get_or_insert_with(|| "https".to_string());
    }

    Ok(config)
}

fn parse_into_key_values(conn_str: &str) -> Result<HashMap<String, String>> {
    conn_str
        .trim()
        .replace('\n', "")
        .split(';')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                Error::config_invalid(format!(
                    "invalid connection string, expected '=' in field: {field}"
                ))
            })?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Emulator defaults, with account, key and proxy uri overridable.
fn collect_development_config(key_values: &HashMap<String, String>, service: Service) -> Config {
    let mut config = Config::development(service);

    if let Some(v) = key_values.get("AccountName") {
        config.account_name = Some(v.clone());
    }
    if let Some(v) = key_values.get("AccountKey") {
        config.account_key = Some(v.clone());
    }
    if let Some(uri) = key_values.get("DevelopmentStorageProxyUri") {
        let account = config.account_name.as_deref().unwrap_or_default();
        config.endpoint = Some(format!("{}/{account}", uri.trim_end_matches('/')));
    }

    config
}

fn endpoint_key(service: Service) -> &'static str {
    match service {
        Service::Blob => "BlobEndpoint",
        Service::Queue => "QueueEndpoint",
        Service::Table => "TableEndpoint",
    }
}
