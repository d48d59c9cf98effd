//! Marker driven listings.
//!
//! A [`Lister`] asks its [`FetchPage`] for one page at a time, starting
//! without a marker and following `NextMarker` until a page comes back
//! without one.

use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use azstore_core::time::{parse_http_date, DateTime};
use azstore_core::{Error, Result};
use log::debug;
use serde::Deserialize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records in document order.
    pub items: Vec<T>,
    /// Marker of the next page, `None` on the last page.
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// A page that ends its listing.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }
}

/// FetchPage issues the call behind one page of a listing.
#[async_trait]
pub trait FetchPage: Send + Sync + 'static {
    /// Record type of this listing.
    type Item: Send + 'static;

    /// Fetch the page starting at `marker`, or the first page for `None`.
    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<Self::Item>>;
}

enum State {
    /// No page fetched yet.
    Start,
    /// The last page carried this marker.
    Next(String),
    /// Exhausted, or stopped by an error.
    Done,
}

/// Lister is a single pass cursor over a paged listing.
///
/// Pages are fetched lazily: a call only hits the service once the records
/// of the previous page are drained. A failed fetch is returned once and
/// finishes the lister, every later call yields `None`.
pub struct Lister<F: FetchPage> {
    fetcher: F,
    state: State,
    buffer: VecDeque<F::Item>,
    pages: usize,
}

impl<F: FetchPage> Debug for Lister<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lister")
            .field("pages", &self.pages)
            .field("buffered", &self.buffer.len())
            .field("finished", &matches!(self.state, State::Done))
            .finish()
    }
}

impl<F: FetchPage> Lister<F> {
    /// Create a lister that has not fetched anything yet.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: State::Start,
            buffer: VecDeque::new(),
            pages: 0,
        }
    }

    /// Fetch the next page, returning `None` once the listing is exhausted.
    ///
    /// Records still buffered from a previous [`Lister::next`] call come
    /// first, as a page of their own.
    pub async fn next_page(&mut self) -> Result<Option<Vec<F::Item>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }

        let marker = match &self.state {
            State::Start => None,
            State::Next(marker) => Some(marker.clone()),
            State::Done => return Ok(None),
        };

        let page = match self.fetcher.fetch_page(marker.as_deref()).await {
            Ok(page) => page,
            Err(err) => {
                self.state = State::Done;
                return Err(err);
            }
        };
        self.pages += 1;

        self.state = match page.next_marker.filter(|v| !v.is_empty()) {
            Some(marker) => State::Next(marker),
            None => {
                debug!("listing finished after {} pages", self.pages);
                State::Done
            }
        };
        Ok(Some(page.items))
    }

    /// Yield the next record, fetching a new page when the buffer is drained.
    pub async fn next(&mut self) -> Result<Option<F::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            // Pages may be empty yet carry a marker, keep going.
            match self.next_page().await? {
                Some(items) => self.buffer.extend(items),
                None => return Ok(None),
            }
        }
    }

    /// Drain the listing into a vector.
    pub async fn collect(mut self) -> Result<Vec<F::Item>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}

/// A container returned by `List Containers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItem {
    /// Container name.
    pub name: String,
    /// Full url of the container, when returned.
    pub url: Option<String>,
    /// ETag of the container.
    pub etag: String,
    /// Last modification time.
    pub last_modified: DateTime,
}

/// A blob returned by `List Blobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name.
    pub name: String,
    /// Full url of the blob, when returned.
    pub url: Option<String>,
    /// ETag of the blob.
    pub etag: String,
    /// Last modification time.
    pub last_modified: DateTime,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct EnumerationResults {
    containers: ContainerList,
    blobs: BlobList,
    next_marker: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct ContainerList {
    #[serde(rename = "Container")]
    items: Vec<RawItem>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct BlobList {
    #[serde(rename = "Blob")]
    items: Vec<RawItem>,
}

/// Older service versions put `Etag` and `LastModified` right under the
/// record, newer ones under `Properties` as `Etag` and `Last-Modified`.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawItem {
    name: Option<String>,
    url: Option<String>,
    etag: Option<String>,
    last_modified: Option<String>,
    properties: Option<RawProperties>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct RawProperties {
    #[serde(rename = "Etag")]
    etag: Option<String>,
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
}

impl RawItem {
    fn into_parts(self) -> Result<(String, Option<String>, String, DateTime)> {
        let (props_etag, props_last_modified) = match self.properties {
            Some(p) => (p.etag, p.last_modified),
            None => (None, None),
        };

        let name = self
            .name
            .ok_or_else(|| Error::parse("listing record without Name"))?;
        let etag = self
            .etag
            .or(props_etag)
            .ok_or_else(|| Error::parse(format!("listing record {name} without Etag")))?;
        let last_modified = self
            .last_modified
            .or(props_last_modified)
            .ok_or_else(|| Error::parse(format!("listing record {name} without LastModified")))?;

        Ok((name, self.url, etag, parse_http_date(&last_modified)?))
    }
}

fn parse_enumeration(xml: &[u8]) -> Result<EnumerationResults> {
    let xml = std::str::from_utf8(xml)
        .map_err(|e| Error::parse("listing is not valid utf-8").with_source(e))?;
    quick_xml::de::from_str(xml).map_err(|e| Error::parse("invalid listing xml").with_source(e))
}

/// Parse one page of `List Containers`.
pub fn parse_containers(xml: &[u8]) -> Result<Page<ContainerItem>> {
    let results = parse_enumeration(xml)?;
    let items = results
        .containers
        .items
        .into_iter()
        .map(|raw| {
            let (name, url, etag, last_modified) = raw.into_parts()?;
            Ok(ContainerItem {
                name,
                url,
                etag,
                last_modified,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Page {
        items,
        next_marker: results.next_marker,
    })
}

/// Parse one page of `List Blobs`.
pub fn parse_blobs(xml: &[u8]) -> Result<Page<BlobItem>> {
    let results = parse_enumeration(xml)?;
    let items = results
        .blobs
        .items
        .into_iter()
        .map(|raw| {
            let (name, url, etag, last_modified) = raw.into_parts()?;
            Ok(BlobItem {
                name,
                url,
                etag,
                last_modified,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Page {
        items,
        next_marker: results.next_marker,
    })
}
