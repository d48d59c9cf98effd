use std::collections::BTreeMap;

use azstore_core::ErrorKind;
use azstore_storage::{BlobClient, Config, Service};
use bytes::Bytes;
use http::{Method, Response, StatusCode};
use pretty_assertions::assert_eq;

use crate::mock::MockHttpSend;

const BASE: &str = "http://127.0.0.1:10000/devstoreaccount1";

fn client(mock: &MockHttpSend) -> BlobClient {
    BlobClient::new(mock.context(), Config::development(Service::Blob)).unwrap()
}

fn blob_page(names: &[&str], next_marker: &str) -> String {
    let blobs: String = names
        .iter()
        .map(|name| {
            format!(
                "<Blob><Name>{name}</Name><Url>{BASE}/c/{name}</Url><Properties><Last-Modified>Mon, 02 Jan 2012 03:04:05 GMT</Last-Modified><Etag>0x8CE{}</Etag></Properties></Blob>",
                name.len()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ContainerName="{BASE}/c"><Blobs>{blobs}</Blobs><NextMarker>{next_marker}</NextMarker></EnumerationResults>"#
    )
}

#[tokio::test]
async fn test_create_container() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::CREATED, "")
        .reply(StatusCode::CONFLICT, "ContainerAlreadyExists");
    let client = client(&mock);

    assert_eq!(client.create_container("photos", true).await.unwrap(), StatusCode::CREATED);
    // A conflict is reported as status, not as error.
    assert_eq!(client.create_container("photos", false).await.unwrap(), StatusCode::CONFLICT);

    let req = mock.request(0);
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.uri.to_string(), format!("{BASE}/photos?restype=container"));
    assert_eq!(req.header("content-length"), "0");
    assert_eq!(req.header("x-ms-prop-publicaccess"), "true");
    assert_eq!(req.header("x-ms-version"), "2011-08-18");
    assert!(req.header("authorization").starts_with("SharedKey devstoreaccount1:"));

    assert!(mock.request(1).headers.get("x-ms-prop-publicaccess").is_none());
}

#[tokio::test]
async fn test_put_blob() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    let metadata = BTreeMap::from([("color".to_string(), "blue".to_string())]);
    let status = client
        .put_blob("c", "dir/a b.txt", "hello world", "text/plain", &metadata)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let req = mock.request(0);
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.uri.to_string(), format!("{BASE}/c/dir/a%20b.txt"));
    assert_eq!(req.header("content-length"), "11");
    assert_eq!(req.header("content-type"), "text/plain");
    assert_eq!(req.header("x-ms-blob-type"), "BlockBlob");
    assert_eq!(req.header("x-ms-meta-color"), "blue");
    assert_eq!(req.body, Bytes::from_static(b"hello world"));
}

#[tokio::test]
async fn test_put_blob_without_content_type() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    client
        .put_blob("c", "b", Bytes::new(), "", &BTreeMap::new())
        .await
        .unwrap();
    assert!(mock.request(0).headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_get_blob() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, "hello world")
        .reply(StatusCode::NOT_FOUND, "BlobNotFound");
    let client = client(&mock);

    assert_eq!(client.get_blob("c", "b.txt").await.unwrap(), "hello world");

    let err = client.get_blob("c", "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_get_blob_with_metadata() {
    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("x-ms-meta-color", "blue")
        .header("x-ms-meta-owner", "ops")
        .header("x-ms-request-id", "1")
        .body(Bytes::from_static(b"data"))
        .unwrap();
    let mock = MockHttpSend::default().reply_with(resp);
    let client = client(&mock);

    let content = client.get_blob_with_metadata("c", "b").await.unwrap();
    assert_eq!(content.data, "data");
    assert_eq!(
        content.metadata,
        BTreeMap::from([
            ("color".to_string(), "blue".to_string()),
            ("owner".to_string(), "ops".to_string()),
        ])
    );
}

#[tokio::test]
async fn test_delete_blob_reports_status() {
    let mock = MockHttpSend::default().reply(StatusCode::NOT_FOUND, "");
    let client = client(&mock);

    assert_eq!(client.delete_blob("c", "b").await.unwrap(), StatusCode::NOT_FOUND);
    assert_eq!(mock.request(0).method, Method::DELETE);
}

#[tokio::test]
async fn test_blob_exists() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, "")
        .reply(StatusCode::NOT_FOUND, "")
        .reply(StatusCode::FORBIDDEN, "");
    let client = client(&mock);

    assert!(client.blob_exists("c", "b").await);
    assert!(!client.blob_exists("c", "b").await);
    assert!(!client.blob_exists("c", "b").await);
    // No reply left, the transport fails.
    assert!(!client.blob_exists("c", "b").await);
    assert_eq!(mock.request(0).method, Method::HEAD);
}

#[tokio::test]
async fn test_put_block() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    client.put_block("c", "b", "YmxvY2stMQ==", "chunk").await.unwrap();

    let req = mock.request(0);
    assert_eq!(
        req.uri.to_string(),
        format!("{BASE}/c/b?comp=block&blockid=YmxvY2stMQ%3D%3D")
    );
    assert_eq!(req.header("content-length"), "5");
}

#[tokio::test]
async fn test_list_blobs_follows_markers() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, blob_page(&["a/1", "a/2"], "m1"))
        .reply(StatusCode::OK, blob_page(&[], "m2"))
        .reply(StatusCode::OK, blob_page(&["a/3"], ""));
    let client = client(&mock);

    let names: Vec<String> = client
        .list_blobs("c", Some("a/"))
        .collect()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["a/1", "a/2", "a/3"]);

    let uris: Vec<String> = mock.requests().iter().map(|r| r.uri.to_string()).collect();
    assert_eq!(
        uris,
        vec![
            format!("{BASE}/c?restype=container&comp=list&prefix=a%2F"),
            format!("{BASE}/c?restype=container&comp=list&prefix=a%2F&marker=m1"),
            format!("{BASE}/c?restype=container&comp=list&prefix=a%2F&marker=m2"),
        ]
    );
}

#[tokio::test]
async fn test_list_blobs_yields_records_one_by_one() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, blob_page(&["x"], "m1"))
        .reply(StatusCode::OK, blob_page(&["y"], ""));
    let client = client(&mock);

    let mut lister = client.list_blobs("c", None);
    let first = lister.next().await.unwrap().unwrap();
    assert_eq!(first.name, "x");
    assert_eq!(first.etag, "0x8CE1");
    assert_eq!(first.url.as_deref(), Some(&*format!("{BASE}/c/x")));
    // The second page is only fetched once the first is drained.
    assert_eq!(mock.requests().len(), 1);

    assert_eq!(lister.next().await.unwrap().unwrap().name, "y");
    assert!(lister.next().await.unwrap().is_none());
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_list_blobs_stops_after_error() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, blob_page(&["x"], "m1"))
        .reply(StatusCode::INTERNAL_SERVER_ERROR, "");
    let client = client(&mock);

    let mut lister = client.list_blobs("c", None);
    assert!(lister.next_page().await.unwrap().is_some());
    let err = lister.next_page().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(lister.next_page().await.unwrap().is_none());
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_list_blobs_requires_container() {
    let mock = MockHttpSend::default();
    let client = client(&mock);

    let err = client.list_blobs("", None).collect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_list_containers() {
    let page = |name: &str, marker: &str| {
        format!(
            "<EnumerationResults><Containers><Container><Name>{name}</Name><Url>{BASE}/{name}</Url><Properties><Last-Modified>Mon, 02 Jan 2012 03:04:05 GMT</Last-Modified><Etag>0x1</Etag></Properties></Container></Containers><NextMarker>{marker}</NextMarker></EnumerationResults>"
        )
    };
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, page("one", "two"))
        .reply(StatusCode::OK, page("two", ""));
    let client = client(&mock);

    let containers = client.list_containers().collect().await.unwrap();
    assert_eq!(
        containers.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["one", "two"]
    );
    assert_eq!(mock.request(0).uri.to_string(), format!("{BASE}/?comp=list"));
    assert_eq!(
        mock.request(1).uri.to_string(),
        format!("{BASE}/?comp=list&marker=two")
    );
}
