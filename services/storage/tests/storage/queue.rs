use azstore_core::ErrorKind;
use azstore_storage::{Config, QueueClient, Service};
use bytes::Bytes;
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;

use crate::mock::MockHttpSend;

const BASE: &str = "http://127.0.0.1:10001/devstoreaccount1";

fn client(mock: &MockHttpSend) -> QueueClient {
    QueueClient::new(mock.context(), Config::development(Service::Queue)).unwrap()
}

#[tokio::test]
async fn test_queue_lifecycle_requests() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::CREATED, "")
        .reply(StatusCode::NO_CONTENT, "");
    let client = client(&mock);

    assert_eq!(client.create_queue("jobs").await.unwrap(), StatusCode::CREATED);
    assert_eq!(client.delete_queue("jobs").await.unwrap(), StatusCode::NO_CONTENT);

    let create = mock.request(0);
    assert_eq!(create.method, Method::PUT);
    assert_eq!(create.uri.to_string(), format!("{BASE}/jobs"));
    assert_eq!(create.header("content-length"), "0");

    let delete = mock.request(1);
    assert_eq!(delete.method, Method::DELETE);
    assert_eq!(delete.uri.to_string(), format!("{BASE}/jobs"));
}

#[tokio::test]
async fn test_put_message_encodes_payload() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    client.put_message("jobs", "hello queue").await.unwrap();

    let req = mock.request(0);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.uri.to_string(), format!("{BASE}/jobs/messages"));
    assert_eq!(req.header("content-type"), "application/xml");
    assert_eq!(
        req.body,
        Bytes::from_static(
            b"<QueueMessage><MessageText>aGVsbG8gcXVldWU=</MessageText></QueueMessage>"
        )
    );
    assert_eq!(req.header("content-length"), req.body.len().to_string());
}

#[tokio::test]
async fn test_get_and_delete_message() {
    let body = "<QueueMessagesList><QueueMessage><MessageId>id-1</MessageId><PopReceipt>AgAAAA+/Rw==</PopReceipt><MessageText>aGVsbG8=</MessageText></QueueMessage></QueueMessagesList>";
    let mock = MockHttpSend::default()
        .reply(StatusCode::OK, body)
        .reply(StatusCode::NO_CONTENT, "");
    let client = client(&mock);

    let message = client.get_message("jobs").await.unwrap().unwrap();
    assert_eq!(message.id, "id-1");
    assert_eq!(message.text, "hello");

    let status = client.delete_message("jobs", &message).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        mock.request(1).uri.to_string(),
        format!("{BASE}/jobs/messages/id-1?popreceipt=AgAAAA%2B%2FRw%3D%3D")
    );
}

#[tokio::test]
async fn test_get_message_from_empty_queue() {
    let mock = MockHttpSend::default().reply(StatusCode::OK, "<QueueMessagesList />");
    let client = client(&mock);

    assert!(client.get_message("jobs").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_message_fails_on_status() {
    let mock = MockHttpSend::default().reply(StatusCode::NOT_FOUND, "QueueNotFound");
    let client = client(&mock);

    let err = client.get_message("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
}
