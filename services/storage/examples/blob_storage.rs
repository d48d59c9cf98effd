use std::collections::BTreeMap;

use anyhow::Result;
use azstore_core::{Context, OsEnv};
use azstore_http_send_reqwest::ReqwestHttpSend;
use azstore_storage::{BlobClient, Config, Service};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);

    // Without AZURE_STORAGE_CONNECTION_STRING or AZURE_STORAGE_ACCOUNT_* set,
    // talk to the local emulator.
    let config = Config::default().from_env(&ctx, Service::Blob)?;
    let config = if config.account_name.is_some() {
        config
    } else {
        println!("No storage account configured, using the local emulator");
        Config::development(Service::Blob)
    };
    println!("Using {config:?}");

    let client = BlobClient::new(ctx, config)?;

    println!("Example 1: Create a container");
    let status = client.create_container("azstore-demo", false).await?;
    println!("create container: {status}");

    println!("Example 2: Upload blobs");
    let metadata = BTreeMap::from([("source".to_string(), "example".to_string())]);
    for name in ["logs/2024-01-01.txt", "logs/2024-01-02.txt", "readme.txt"] {
        let status = client
            .put_blob("azstore-demo", name, format!("content of {name}"), "text/plain", &metadata)
            .await?;
        println!("put {name}: {status}");
    }

    println!("Example 3: List blobs under logs/");
    let mut blobs = client.list_blobs("azstore-demo", Some("logs/"));
    while let Some(blob) = blobs.next().await? {
        println!("  {} etag={} modified={}", blob.name, blob.etag, blob.last_modified);
    }

    println!("Example 4: Download a blob with its metadata");
    let content = client
        .get_blob_with_metadata("azstore-demo", "readme.txt")
        .await?;
    println!(
        "  {:?} with metadata {:?}",
        String::from_utf8_lossy(&content.data),
        content.metadata
    );

    println!("Example 5: Clean up");
    for name in ["logs/2024-01-01.txt", "logs/2024-01-02.txt", "readme.txt"] {
        client.delete_blob("azstore-demo", name).await?;
    }
    let status = client.delete_container("azstore-demo").await?;
    println!("delete container: {status}");

    Ok(())
}
