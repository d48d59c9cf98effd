use azstore_core::hash::{base64_decode, base64_hmac_sha256};
use azstore_core::time::parse_http_date;
use azstore_core::{Context, Signer};
use azstore_storage::{Credential, RequestSigner, Service, StaticCredentialProvider};
use pretty_assertions::assert_eq;

const ACCOUNT: &str = "myaccount";
const KEY: &str = "bXlrZXlteWtleW15a2V5bXlrZXk=";

fn signer(service: Service) -> Signer<Credential> {
    let _ = env_logger::builder().is_test(true).try_init();
    let loader = StaticCredentialProvider::new(ACCOUNT, KEY).unwrap();
    Signer::new(Context::new(), loader, RequestSigner::new(service))
}

/// Recompute the signature of the authorization header from the string
/// the service would rebuild.
fn assert_signature(parts: &http::request::Parts, string_to_sign: &str) {
    let auth = parts.headers["authorization"].to_str().unwrap();
    let key = base64_decode(KEY).unwrap();
    assert_eq!(
        auth,
        format!(
            "SharedKey {ACCOUNT}:{}",
            base64_hmac_sha256(&key, string_to_sign.as_bytes())
        )
    );
}

#[tokio::test]
async fn test_sign_blob_request() {
    let signer = signer(Service::Blob);

    let mut parts = http::Request::put("https://myaccount.blob.core.windows.net/c/b.txt?comp=block&blockid=QQ%3D%3D")
        .header("content-length", "5")
        .header("x-ms-meta-Owner", "ops")
        .body(())
        .unwrap()
        .into_parts()
        .0;
    signer.sign(&mut parts).await.unwrap();

    let date = parts.headers["x-ms-date"].to_str().unwrap().to_string();
    assert!(parse_http_date(&date).is_ok());
    assert_eq!(parts.headers["x-ms-version"], "2011-08-18");
    assert!(parts.headers["authorization"].is_sensitive());
    assert!(!parts.headers.contains_key("date"));

    assert_signature(
        &parts,
        &format!(
            "PUT\n\n\n5\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-meta-owner:ops\nx-ms-version:2011-08-18\n/myaccount/c/b.txt\nblockid:QQ==\ncomp:block"
        ),
    );
}

#[tokio::test]
async fn test_sign_table_request() {
    let signer = signer(Service::Table);

    let mut parts = http::Request::post("https://myaccount.table.core.windows.net/people")
        .header("content-type", "application/atom+xml")
        .body(())
        .unwrap()
        .into_parts()
        .0;
    signer.sign(&mut parts).await.unwrap();

    let date = parts.headers["date"].to_str().unwrap().to_string();
    assert_eq!(parts.headers["x-ms-date"], date.as_str());
    assert_eq!(parts.headers["dataserviceversion"], "1.0;NetFx");
    assert_eq!(parts.headers["maxdataserviceversion"], "1.0;NetFx");

    assert_signature(
        &parts,
        &format!("POST\n\napplication/atom+xml\n{date}\n/myaccount/people"),
    );
}

#[tokio::test]
async fn test_sign_path_style_request() {
    let signer = signer(Service::Queue);

    let mut parts = http::Request::get("http://127.0.0.1:10001/myaccount/jobs/messages")
        .body(())
        .unwrap()
        .into_parts()
        .0;
    signer.sign(&mut parts).await.unwrap();

    let date = parts.headers["x-ms-date"].to_str().unwrap().to_string();
    assert_signature(
        &parts,
        &format!(
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:2011-08-18\n/myaccount/myaccount/jobs/messages"
        ),
    );
}
