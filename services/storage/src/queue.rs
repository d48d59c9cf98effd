use azstore_core::hash::{base64_decode, base64_encode};
use azstore_core::{Context, Error, Result};
use bytes::Bytes;
use http::{header, Request, StatusCode};
use serde::Deserialize;

use crate::client::{encode_path, encode_query, ClientCore};
use crate::constants::XML_CONTENT_TYPE;
use crate::{Config, Service};

/// A message taken from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Message id.
    pub id: String,
    /// Receipt of this retrieval, required to delete the message.
    pub pop_receipt: String,
    /// Decoded payload.
    pub text: Bytes,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct QueueMessagesList {
    #[serde(rename = "QueueMessage")]
    messages: Vec<RawQueueMessage>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawQueueMessage {
    message_id: String,
    pop_receipt: String,
    message_text: String,
}

/// Client of the queue service.
///
/// Calls that change state return the response status as is, calls that
/// return data fail with an [`azstore_core::ErrorKind::HttpStatus`] error on
/// any non-success status.
#[derive(Clone, Debug)]
pub struct QueueClient {
    core: ClientCore,
}

impl QueueClient {
    /// Create a client from its config.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            core: ClientCore::new(ctx, Service::Queue, config)?,
        })
    }

    /// Create a queue.
    pub async fn create_queue(&self, name: &str) -> Result<StatusCode> {
        let req = Request::put(self.core.url(&encode_path(name)))
            .header(header::CONTENT_LENGTH, "0")
            .body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// Delete a queue.
    pub async fn delete_queue(&self, name: &str) -> Result<StatusCode> {
        let req = Request::delete(self.core.url(&encode_path(name))).body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    /// Put a message on a queue. The payload travels base64 encoded.
    pub async fn put_message(&self, queue: &str, payload: impl AsRef<[u8]>) -> Result<StatusCode> {
        let body = Bytes::from(format!(
            "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
            base64_encode(payload.as_ref())
        ));
        let req = Request::post(self.messages_url(queue))
            .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, body.len())
            .body(body)?;
        self.core.send_for_status(req).await
    }

    /// Take the next message of a queue, `None` if the queue is empty.
    ///
    /// The message stays invisible to other readers until it's deleted or
    /// its visibility timeout expires.
    pub async fn get_message(&self, queue: &str) -> Result<Option<QueueMessage>> {
        let req = Request::get(self.messages_url(queue)).body(Bytes::new())?;
        let body = self.core.send_for_body(req).await?.into_body();
        parse_message(&body)
    }

    /// Delete a message previously taken with [`QueueClient::get_message`].
    pub async fn delete_message(&self, queue: &str, message: &QueueMessage) -> Result<StatusCode> {
        let url = format!(
            "{}/{}?popreceipt={}",
            self.messages_url(queue),
            encode_path(&message.id),
            encode_query(&message.pop_receipt)
        );
        let req = Request::delete(url).body(Bytes::new())?;
        self.core.send_for_status(req).await
    }

    fn messages_url(&self, queue: &str) -> String {
        self.core.url(&format!("{}/messages", encode_path(queue)))
    }
}

fn parse_message(xml: &[u8]) -> Result<Option<QueueMessage>> {
    let xml = std::str::from_utf8(xml)
        .map_err(|e| Error::parse("queue response is not valid utf-8").with_source(e))?;
    let list: QueueMessagesList = quick_xml::de::from_str(xml)
        .map_err(|e| Error::parse("invalid queue messages xml").with_source(e))?;

    let Some(raw) = list.messages.into_iter().next() else {
        return Ok(None);
    };
    if raw.message_id.is_empty() || raw.pop_receipt.is_empty() {
        return Err(Error::parse("queue message without MessageId or PopReceipt"));
    }

    Ok(Some(QueueMessage {
        id: raw.message_id,
        pop_receipt: raw.pop_receipt,
        text: base64_decode(&raw.message_text)?.into(),
    }))
}
