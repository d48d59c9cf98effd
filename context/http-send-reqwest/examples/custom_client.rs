use std::time::Duration;

use anyhow::Result;
use azstore_core::Context;
use azstore_http_send_reqwest::ReqwestHttpSend;
use bytes::Bytes;
use reqwest::Client;

#[tokio::main]
async fn main() -> Result<()> {
    // Timeouts belong to the transport; the storage clients never retry.
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("azstore-example/0.1")
        .build()?;

    let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));

    // The local emulator answers unauthenticated requests with 403.
    let req = http::Request::builder()
        .method("GET")
        .uri("http://127.0.0.1:10000/devstoreaccount1?comp=list")
        .body(Bytes::new())?;

    let resp = ctx.http_send(req).await?;
    println!("status: {}", resp.status());
    for (name, value) in resp.headers() {
        println!("  {name}: {value:?}");
    }
    println!("body: {} bytes", resp.body().len());

    Ok(())
}
