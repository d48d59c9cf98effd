use async_trait::async_trait;
use azstore_core::time::now;
use azstore_core::{Context, Error, Result};
use bytes::Bytes;
use http::{header, Method, Request, StatusCode};

use crate::client::{encode_path, encode_query, ClientCore};
use crate::constants::ATOM_CONTENT_TYPE;
use crate::entity::{self, parse_entries, Entity, PropertyValue, WriteMode};
use crate::listing::{FetchPage, Lister, Page};
use crate::{Config, Service};

/// A table of the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Url of the table, taken from the entry id.
    pub url: String,
    /// Table name.
    pub name: String,
}

/// Client of the table service.
///
/// Calls that change state return the response status as is, calls that
/// return data fail with an [`azstore_core::ErrorKind::HttpStatus`] error on
/// any non-success status.
#[derive(Clone, Debug)]
pub struct TableClient {
    core: ClientCore,
}

impl TableClient {
    /// Create a client from its config.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            core: ClientCore::new(ctx, Service::Table, config)?,
        })
    }

    /// Create a table.
    pub async fn create_table(&self, name: &str) -> Result<StatusCode> {
        let body = entity::encode_table(name, now())?;
        let req = self.atom_request(Method::POST, self.core.url("Tables"), body)?;
        self.core.send_for_status(req).await
    }

    /// Delete a table.
    pub async fn delete_table(&self, name: &str) -> Result<StatusCode> {
        let url = self
            .core
            .url(&format!("Tables('{}')", encode_path(&escape_key(name))));
        let req = Request::delete(url).body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// List the tables of the account.
    pub async fn list_tables(&self) -> Result<Vec<Table>> {
        let req = Request::get(self.core.url("Tables")).body(Bytes::new())?;
        let body = self.core.send_for_body(req).await?.into_body();

        parse_entries(&body)?
            .into_iter()
            .map(|entry| {
                let name = entry
                    .properties
                    .into_iter()
                    .find(|p| p.name == "TableName")
                    .map(|p| p.into_value())
                    .transpose()?
                    .flatten();
                match (entry.id, name) {
                    (Some(url), Some(PropertyValue::String(name))) => Ok(Table { url, name }),
                    _ => Err(Error::parse("table entry without id or TableName")),
                }
            })
            .collect()
    }

    /// Get one entity by its keys.
    pub async fn get_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Entity> {
        let req = Request::get(self.entity_url(table, partition_key, row_key)).body(Bytes::new())?;
        let body = self.core.send_for_body(req).await?.into_body();
        entity::decode(&body)
    }

    /// Get every entity of a table returned by a single call.
    pub async fn get_all(&self, table: &str) -> Result<Vec<Entity>> {
        let req = Request::get(self.core.url(&encode_path(table))).body(Bytes::new())?;
        let body = self.core.send_for_body(req).await?.into_body();
        entity::decode_feed(&body)
    }

    /// Insert a new entity.
    pub async fn insert_entity(&self, table: &str, entity: &Entity) -> Result<StatusCode> {
        let body = entity::encode(entity, WriteMode::Insert)?;
        let req = self.atom_request(Method::POST, self.core.url(&encode_path(table)), body)?;
        self.core.send_for_status(req).await
    }

    /// Replace the entity stored under the given keys.
    pub async fn update_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        entity: &Entity,
    ) -> Result<StatusCode> {
        let body = entity::encode(entity, WriteMode::Update(now()))?;
        let url = self.entity_url(table, partition_key, row_key);
        let req = self.atom_request(Method::PUT, url, body)?;
        self.core.send_for_status(req).await
    }

    /// Merge properties into the entity stored under the given keys.
    pub async fn merge_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        entity: &Entity,
    ) -> Result<StatusCode> {
        let body = entity::encode(entity, WriteMode::Update(now()))?;
        let url = self.entity_url(table, partition_key, row_key);
        let req = self.atom_request(Method::from_bytes(b"MERGE")?, url, body)?;
        self.core.send_for_status(req).await
    }

    /// Delete an entity.
    ///
    /// `condition` is sent as `If-Match` and defaults to `*`, which deletes
    /// whatever version is stored.
    pub async fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        condition: Option<&str>,
    ) -> Result<StatusCode> {
        let url = self.entity_url(table, partition_key, row_key);
        let req = Request::delete(url)
            .header(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, "0")
            .header(header::IF_MATCH, condition.unwrap_or("*"))
            .body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// Query the entities matching an OData filter like `Age gt 30`.
    pub fn query_entities(&self, table: &str, filter: &str) -> Lister<EntityQuery> {
        Lister::new(EntityQuery {
            client: self.clone(),
            table: table.to_string(),
            query: format!("$filter={}", encode_query(filter)),
        })
    }

    /// Query the first `n` entities of a table.
    pub fn top_entities(&self, table: &str, n: usize) -> Lister<EntityQuery> {
        Lister::new(EntityQuery {
            client: self.clone(),
            table: table.to_string(),
            query: format!("$top={n}"),
        })
    }

    fn entity_url(&self, table: &str, partition_key: &str, row_key: &str) -> String {
        self.core.url(&format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            encode_path(table),
            encode_path(&escape_key(partition_key)),
            encode_path(&escape_key(row_key)),
        ))
    }

    fn atom_request(&self, method: Method, url: String, body: Bytes) -> Result<Request<Bytes>> {
        Ok(Request::builder()
            .method(method)
            .uri(url)
            .header(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, body.len())
            .body(body)?)
    }
}

/// Quotes inside key literals are doubled.
fn escape_key(key: &str) -> String {
    key.replace('\'', "''")
}

/// A filter or top query over a table.
///
/// The service answers these with a single page.
#[derive(Debug)]
pub struct EntityQuery {
    client: TableClient,
    table: String,
    query: String,
}

#[async_trait]
impl FetchPage for EntityQuery {
    type Item = Entity;

    async fn fetch_page(&self, _: Option<&str>) -> Result<Page<Entity>> {
        let url = format!(
            "{}()?{}",
            self.client.core.url(&encode_path(&self.table)),
            self.query
        );
        let req = Request::get(url).body(Bytes::new())?;
        let body = self.client.core.send_for_body(req).await?.into_body();
        Ok(Page::last(entity::decode_feed(&body)?))
    }
}
