use azstore_core::ErrorKind;
use azstore_storage::{entity, Config, Entity, PropertyValue, Service, Table, TableClient, WriteMode};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;

use crate::mock::MockHttpSend;

const BASE: &str = "http://127.0.0.1:10002/devstoreaccount1";

const NAMESPACES: &str = r#"xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata" xmlns="http://www.w3.org/2005/Atom""#;

fn client(mock: &MockHttpSend) -> TableClient {
    TableClient::new(mock.context(), Config::development(Service::Table)).unwrap()
}

fn entry(pk: &str, rk: &str, age: i32) -> String {
    format!(
        r#"<entry><id>{BASE}/people(PartitionKey='{pk}',RowKey='{rk}')</id><content type="application/xml"><m:properties><d:PartitionKey>{pk}</d:PartitionKey><d:RowKey>{rk}</d:RowKey><d:Timestamp m:type="Edm.DateTime">2012-01-02T03:04:05.1234567Z</d:Timestamp><d:Age m:type="Edm.Int32">{age}</d:Age></m:properties></content></entry>"#
    )
}

fn feed(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?><feed {NAMESPACES}><title type="text">people</title>{}</feed>"#,
        entries.concat()
    )
}

#[tokio::test]
async fn test_create_table() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    assert_eq!(client.create_table("people").await.unwrap(), StatusCode::CREATED);

    let req = mock.request(0);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.uri.to_string(), format!("{BASE}/Tables"));
    assert_eq!(req.header("content-type"), "application/atom+xml");
    assert_eq!(req.header("dataserviceversion"), "1.0;NetFx");
    assert_eq!(req.header("maxdataserviceversion"), "1.0;NetFx");
    assert!(req.headers.contains_key("date"));
    let body = std::str::from_utf8(&req.body).unwrap();
    assert!(body.contains("<d:TableName>people</d:TableName>"));
    assert_eq!(req.header("content-length"), req.body.len().to_string());
}

#[tokio::test]
async fn test_delete_table() {
    let mock = MockHttpSend::default().reply(StatusCode::NO_CONTENT, "");
    let client = client(&mock);

    client.delete_table("people").await.unwrap();
    let req = mock.request(0);
    assert_eq!(req.method, Method::DELETE);
    assert_eq!(req.uri.to_string(), format!("{BASE}/Tables('people')"));
}

#[tokio::test]
async fn test_list_tables() {
    let body = format!(
        r#"<feed {NAMESPACES}><entry><id>{BASE}/Tables('people')</id><content type="application/xml"><m:properties><d:TableName>people</d:TableName></m:properties></content></entry><entry><id>{BASE}/Tables('pets')</id><content type="application/xml"><m:properties><d:TableName>pets</d:TableName></m:properties></content></entry></feed>"#
    );
    let mock = MockHttpSend::default().reply(StatusCode::OK, body);
    let client = client(&mock);

    let tables = client.list_tables().await.unwrap();
    assert_eq!(
        tables,
        vec![
            Table {
                url: format!("{BASE}/Tables('people')"),
                name: "people".to_string(),
            },
            Table {
                url: format!("{BASE}/Tables('pets')"),
                name: "pets".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_get_entity() {
    let body = format!(
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>{}"#,
        entry("p1", "r1", 30).replacen("<entry>", &format!("<entry {NAMESPACES}>"), 1)
    );
    let mock = MockHttpSend::default().reply(StatusCode::OK, body);
    let client = client(&mock);

    let entity = client.get_entity("people", "p1", "o'r 1").await.unwrap();
    assert_eq!(entity.partition_key, "p1");
    assert_eq!(entity.get("Age"), Some(&PropertyValue::Int32(30)));
    assert!(entity.timestamp.is_some());

    assert_eq!(
        mock.request(0).uri.to_string(),
        format!("{BASE}/people(PartitionKey='p1',RowKey='o%27%27r%201')")
    );
}

#[tokio::test]
async fn test_get_entity_not_found() {
    let mock = MockHttpSend::default().reply(StatusCode::NOT_FOUND, "ResourceNotFound");
    let client = client(&mock);

    let err = client.get_entity("people", "p", "r").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_insert_entity() {
    let mock = MockHttpSend::default().reply(StatusCode::CREATED, "");
    let client = client(&mock);

    let entity = Entity::new("p1", "r1").with_property("Age", 30);
    client.insert_entity("people", &entity).await.unwrap();

    let req = mock.request(0);
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.uri.to_string(), format!("{BASE}/people"));
    assert_eq!(req.body, entity::encode(&entity, WriteMode::Insert).unwrap());
}

#[tokio::test]
async fn test_update_and_merge_entity() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::NO_CONTENT, "")
        .reply(StatusCode::NO_CONTENT, "");
    let client = client(&mock);

    let entity = Entity::new("p1", "r1").with_property("Age", 31);
    client.update_entity("people", "p1", "r1", &entity).await.unwrap();
    client.merge_entity("people", "p1", "r1", &entity).await.unwrap();

    let update = mock.request(0);
    assert_eq!(update.method, Method::PUT);
    assert_eq!(
        update.uri.to_string(),
        format!("{BASE}/people(PartitionKey='p1',RowKey='r1')")
    );
    assert!(std::str::from_utf8(&update.body).unwrap().contains("<updated>"));

    let merge = mock.request(1);
    assert_eq!(merge.method.as_str(), "MERGE");
    assert_eq!(merge.uri, update.uri);
}

#[tokio::test]
async fn test_delete_entity_condition() {
    let mock = MockHttpSend::default()
        .reply(StatusCode::NO_CONTENT, "")
        .reply(StatusCode::PRECONDITION_FAILED, "");
    let client = client(&mock);

    client.delete_entity("people", "p1", "r1", None).await.unwrap();
    let status = client
        .delete_entity("people", "p1", "r1", Some("W/\"datetime'2012'\""))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    assert_eq!(mock.request(0).header("if-match"), "*");
    assert_eq!(mock.request(0).header("content-length"), "0");
    assert_eq!(mock.request(1).header("if-match"), "W/\"datetime'2012'\"");
}

#[tokio::test]
async fn test_query_entities() {
    let mock = MockHttpSend::default().reply(
        StatusCode::OK,
        feed(&[entry("p1", "r1", 40), entry("p1", "r2", 50)]),
    );
    let client = client(&mock);

    let entities = client
        .query_entities("people", "Age gt 30")
        .collect()
        .await
        .unwrap();
    assert_eq!(
        entities.iter().map(|e| e.row_key.as_str()).collect::<Vec<_>>(),
        vec!["r1", "r2"]
    );
    assert_eq!(mock.requests().len(), 1);
    assert_eq!(
        mock.request(0).uri.to_string(),
        format!("{BASE}/people()?$filter=Age%20gt%2030")
    );
}

#[tokio::test]
async fn test_top_entities() {
    let mock = MockHttpSend::default().reply(StatusCode::OK, feed(&[entry("p", "r", 1)]));
    let client = client(&mock);

    let mut lister = client.top_entities("people", 5);
    assert_eq!(lister.next().await.unwrap().unwrap().row_key, "r");
    assert!(lister.next().await.unwrap().is_none());
    assert_eq!(
        mock.request(0).uri.to_string(),
        format!("{BASE}/people()?$top=5")
    );
}

#[tokio::test]
async fn test_get_all_of_empty_table() {
    let mock = MockHttpSend::default().reply(StatusCode::OK, feed(&[]));
    let client = client(&mock);

    assert!(client.get_all("people").await.unwrap().is_empty());
    assert_eq!(mock.request(0).uri.to_string(), format!("{BASE}/people"));
}
