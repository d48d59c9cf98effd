use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azstore_core::{Context, Error, HttpSend, Result};
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};

/// What the mock saw of a sent request.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Sent {
    /// Header value as str, panicking if it's missing.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("header {name} is missing"))
            .to_str()
            .unwrap()
    }
}

/// HttpSend that records every request and replays canned responses in
/// order. Once the replies run out, sending fails like an unreachable
/// service.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    requests: Arc<Mutex<Vec<Sent>>>,
    replies: Arc<Mutex<VecDeque<Response<Bytes>>>>,
}

impl MockHttpSend {
    pub fn reply(self, status: StatusCode, body: impl Into<Bytes>) -> Self {
        let resp = Response::builder()
            .status(status)
            .body(body.into())
            .unwrap();
        self.reply_with(resp)
    }

    pub fn reply_with(self, resp: Response<Bytes>) -> Self {
        self.replies.lock().unwrap().push_back(resp);
        self
    }

    pub fn context(&self) -> Context {
        let _ = env_logger::builder().is_test(true).try_init();
        Context::new().with_http_send(self.clone())
    }

    pub fn requests(&self) -> Vec<Sent> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, idx: usize) -> Sent {
        self.requests()
            .into_iter()
            .nth(idx)
            .unwrap_or_else(|| panic!("request {idx} was never sent"))
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = req.into_parts();
        self.requests.lock().unwrap().push(Sent {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::unexpected("connection refused"))
    }
}
