//! Table entities and their Atom wire format.
//!
//! Every property carries an explicit EDM type tag on the wire. Values are
//! typed by construction here, so no runtime kind sniffing is involved when
//! encoding; the only dynamic entry point is `TryFrom<serde_json::Value>`.

use std::collections::BTreeMap;
use std::fmt::Write;

use azstore_core::time::{format_iso8601_micros, truncate_micros, DateTime};
use azstore_core::{Error, Result};
use bytes::Bytes;
use chrono::{NaiveDateTime, TimeDelta};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::constants::{NS_ATOM, NS_DATA, NS_METADATA};

const PARTITION_KEY: &str = "PartitionKey";
const ROW_KEY: &str = "RowKey";
const TIMESTAMP: &str = "Timestamp";

/// Outbound writes always carry this timestamp; the service sets the real one.
const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00";
/// Unix seconds of `0001-01-01T00:00:00Z`.
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

/// A typed property value.
///
/// Date times keep microsecond precision. [`PropertyValue::from`] and
/// [`Entity::insert`] drop anything finer, so values survive a trip through
/// the wire format unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `Edm.String`
    String(String),
    /// `Edm.Boolean`
    Boolean(bool),
    /// `Edm.Int32`
    Int32(i32),
    /// `Edm.Int64`
    Int64(i64),
    /// `Edm.Double`
    Double(f64),
    /// `Edm.DateTime`
    DateTime(DateTime),
}

impl PropertyValue {
    /// The EDM type tag written on the wire.
    pub fn edm_type(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "Edm.String",
            PropertyValue::Boolean(_) => "Edm.Boolean",
            PropertyValue::Int32(_) => "Edm.Int32",
            PropertyValue::Int64(_) => "Edm.Int64",
            PropertyValue::Double(_) => "Edm.Double",
            PropertyValue::DateTime(_) => "Edm.DateTime",
        }
    }

    /// Text form of the value, not yet xml escaped.
    fn to_wire(&self) -> String {
        match self {
            PropertyValue::String(v) => v.clone(),
            PropertyValue::Boolean(v) => v.to_string(),
            PropertyValue::Int32(v) => v.to_string(),
            PropertyValue::Int64(v) => v.to_string(),
            PropertyValue::Double(v) => format_edm_double(*v),
            PropertyValue::DateTime(v) => format_iso8601_micros(*v),
        }
    }

    /// Parse the text of a property tagged with `edm_type`.
    fn from_wire(edm_type: &str, text: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("invalid {edm_type} value: {text}"));

        let value = match edm_type.to_ascii_lowercase().as_str() {
            "edm.string" => PropertyValue::String(text.to_string()),
            "edm.datetime" => PropertyValue::DateTime(parse_edm_datetime(text)?),
            "edm.int32" => {
                PropertyValue::Int32(text.trim().parse().map_err(|e| invalid().with_source(e))?)
            }
            "edm.int64" => {
                PropertyValue::Int64(text.trim().parse().map_err(|e| invalid().with_source(e))?)
            }
            "edm.boolean" => PropertyValue::Boolean(text.trim().eq_ignore_ascii_case("true")),
            "edm.double" => PropertyValue::Double(parse_edm_double(text).ok_or_else(invalid)?),
            _ => {
                return Err(Error::unrecognized_property_type(format!(
                    "property type {edm_type} is not supported"
                )))
            }
        };
        Ok(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int32(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int64(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<DateTime> for PropertyValue {
    fn from(v: DateTime) -> Self {
        PropertyValue::DateTime(truncate_micros(v))
    }
}

impl TryFrom<serde_json::Value> for PropertyValue {
    type Error = Error;

    /// Integers become `Int32` when they fit and `Int64` otherwise. Nothing is
    /// coerced: null, arrays, objects and integers beyond `i64` are rejected.
    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(v) => Ok(PropertyValue::Boolean(v)),
            Value::String(v) => Ok(PropertyValue::String(v)),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(i32::try_from(v)
                        .map(PropertyValue::Int32)
                        .unwrap_or(PropertyValue::Int64(v)))
                } else if n.is_u64() {
                    Err(Error::unsupported_property_type(format!(
                        "integer {n} does not fit in Edm.Int64"
                    )))
                } else {
                    n.as_f64().map(PropertyValue::Double).ok_or_else(|| {
                        Error::unsupported_property_type(format!("number {n} is not supported"))
                    })
                }
            }
            Value::Null => Err(Error::unsupported_property_type(
                "null can't be stored as a property",
            )),
            Value::Array(_) => Err(Error::unsupported_property_type(
                "arrays can't be stored as a property",
            )),
            Value::Object(_) => Err(Error::unsupported_property_type(
                "objects can't be stored as a property",
            )),
        }
    }
}

/// A table entity: its keys, the service timestamp and typed properties.
///
/// Every entity owns its property map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    /// Partition key.
    pub partition_key: String,
    /// Row key.
    pub row_key: String,
    /// Last modification time set by the service, `None` for entities not
    /// read back from it.
    pub timestamp: Option<DateTime>,
    /// User properties, without the system ones.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Entity {
    /// Create an entity without properties.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Default::default()
        }
    }

    /// Add a property, replacing any previous value with this name.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a property, returning the previous value with this name.
    ///
    /// Date times are truncated to microseconds.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let value = match value.into() {
            PropertyValue::DateTime(t) => PropertyValue::DateTime(truncate_micros(t)),
            v => v,
        };
        self.properties.insert(name.into(), value)
    }

    /// Get a property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// Which Atom envelope wraps an encoded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Envelope for inserts, without `updated`.
    Insert,
    /// Envelope for updates and merges, carrying `updated`.
    Update(DateTime),
}

/// Encode an entity into an Atom entry.
pub fn encode(entity: &Entity, mode: WriteMode) -> Result<Bytes> {
    let mut props = String::new();
    for (name, value) in &entity.properties {
        check_property_name(name)?;
        writeln!(
            &mut props,
            r#"      <d:{name} m:type="{}">{}</d:{name}>"#,
            value.edm_type(),
            escape_text(&value.to_wire())?,
        )?;
    }
    writeln!(
        &mut props,
        "      <d:{PARTITION_KEY}>{}</d:{PARTITION_KEY}>",
        escape_text(&entity.partition_key)?
    )?;
    writeln!(
        &mut props,
        "      <d:{ROW_KEY}>{}</d:{ROW_KEY}>",
        escape_text(&entity.row_key)?
    )?;
    write!(
        &mut props,
        r#"      <d:{TIMESTAMP} m:type="Edm.DateTime">{ZERO_TIMESTAMP}</d:{TIMESTAMP}>"#
    )?;

    let updated = match mode {
        WriteMode::Insert => None,
        WriteMode::Update(t) => Some(t),
    };
    envelope(updated, &props)
}

/// Encode the entry creating a table.
pub fn encode_table(name: &str, updated: DateTime) -> Result<Bytes> {
    let props = format!("      <d:TableName>{}</d:TableName>", escape_text(name)?);
    envelope(Some(updated), &props)
}

fn envelope(updated: Option<DateTime>, props: &str) -> Result<Bytes> {
    let mut s = String::with_capacity(512 + props.len());
    writeln!(
        &mut s,
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#
    )?;
    writeln!(
        &mut s,
        r#"<entry xmlns:d="{NS_DATA}" xmlns:m="{NS_METADATA}" xmlns="{NS_ATOM}">"#
    )?;
    writeln!(&mut s, "  <title />")?;
    if let Some(t) = updated {
        writeln!(&mut s, "  <updated>{}</updated>", format_iso8601_micros(t))?;
    }
    writeln!(&mut s, "  <author>\n    <name />\n  </author>")?;
    writeln!(&mut s, "  <id />")?;
    writeln!(&mut s, r#"  <content type="application/xml">"#)?;
    writeln!(&mut s, "    <m:properties>")?;
    writeln!(&mut s, "{props}")?;
    writeln!(&mut s, "    </m:properties>")?;
    writeln!(&mut s, "  </content>")?;
    writeln!(&mut s, "</entry>")?;
    Ok(Bytes::from(s))
}

/// Escape text content for xml 1.0.
///
/// Control characters other than tab, newline and carriage return have no
/// representation in xml 1.0 and are rejected. Carriage returns are written
/// as a character reference, since parsers fold a literal one into a newline.
fn escape_text(text: &str) -> Result<String> {
    let invalid = |c: char| match c {
        '\t' | '\n' | '\r' => false,
        '\u{FFFE}' | '\u{FFFF}' => true,
        c => c < ' ',
    };
    if let Some(c) = text.chars().find(|&c| invalid(c)) {
        return Err(Error::request_invalid(format!(
            "character {c:?} can't be represented in xml"
        )));
    }
    Ok(escape(text).replace('\r', "&#13;"))
}

/// Property names become element names, and must not shadow system
/// properties.
fn check_property_name(name: &str) -> Result<()> {
    if matches!(name, PARTITION_KEY | ROW_KEY | TIMESTAMP) {
        return Err(Error::request_invalid(format!(
            "property name {name} is reserved"
        )));
    }

    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(Error::request_invalid(format!(
            "property name {name:?} is not a valid xml name"
        )));
    }
    Ok(())
}

/// Decode the first entry of an Atom document.
pub fn decode(xml: &[u8]) -> Result<Entity> {
    parse_entries(xml)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::parse("no entry found in response"))?
        .into_entity()
}

/// Decode every entry of an Atom feed, in document order.
pub fn decode_feed(xml: &[u8]) -> Result<Vec<Entity>> {
    parse_entries(xml)?
        .into_iter()
        .map(RawEntry::into_entity)
        .collect()
}

/// A property element as found on the wire.
#[derive(Debug, Default)]
pub(crate) struct RawProperty {
    pub name: String,
    pub edm_type: Option<String>,
    pub null: bool,
    /// `None` when the element has no text node.
    pub text: Option<String>,
}

impl RawProperty {
    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let mut prop = RawProperty {
            name: String::from_utf8(e.local_name().as_ref().to_vec())?,
            ..Default::default()
        };
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::parse("invalid xml attribute").with_source(e))?;
            let value = attr.unescape_value().map_err(xml_error)?;
            match attr.key.local_name().as_ref() {
                b"type" => prop.edm_type = Some(value.into_owned()),
                b"null" => prop.null = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        Ok(prop)
    }

    /// `None` for null and untyped elements without text.
    pub fn into_value(self) -> Result<Option<PropertyValue>> {
        if self.null {
            return Ok(None);
        }
        match (self.edm_type, self.text) {
            (Some(t), text) => PropertyValue::from_wire(&t, text.as_deref().unwrap_or_default()).map(Some),
            (None, Some(text)) => Ok(Some(PropertyValue::String(text))),
            (None, None) => Ok(None),
        }
    }
}

/// An Atom entry: its `id` and the children of `m:properties`.
#[derive(Debug, Default)]
pub(crate) struct RawEntry {
    pub id: Option<String>,
    pub properties: Vec<RawProperty>,
}

impl RawEntry {
    fn into_entity(self) -> Result<Entity> {
        let mut entity = Entity::default();
        for prop in self.properties {
            let name = prop.name.clone();
            let Some(value) = prop.into_value()? else {
                continue;
            };
            match (name.as_str(), value) {
                (PARTITION_KEY, PropertyValue::String(v)) => entity.partition_key = v,
                (ROW_KEY, PropertyValue::String(v)) => entity.row_key = v,
                (TIMESTAMP, PropertyValue::DateTime(t)) => {
                    entity.timestamp = (t.timestamp() != ZERO_TIMESTAMP_SECS
                        || t.timestamp_subsec_nanos() != 0)
                        .then_some(t)
                }
                (PARTITION_KEY | ROW_KEY | TIMESTAMP, v) => {
                    return Err(Error::parse(format!(
                        "system property {name} has unexpected type {}",
                        v.edm_type()
                    )))
                }
                (_, v) => {
                    entity.properties.insert(name, v);
                }
            }
        }
        Ok(entity)
    }
}

/// Walk an Atom document and collect its entries.
pub(crate) fn parse_entries(xml: &[u8]) -> Result<Vec<RawEntry>> {
    let xml = std::str::from_utf8(xml)
        .map_err(|e| Error::parse("response is not valid utf-8").with_source(e))?;
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut in_properties = false;
    let mut in_id = false;
    let mut prop: Option<RawProperty> = None;
    // Elements nested inside a property are skipped.
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.local_name();
                if entry.is_none() {
                    if name.as_ref() == b"entry" {
                        entry = Some(RawEntry::default());
                    }
                } else if prop.is_some() {
                    skip_depth += 1;
                } else if in_properties {
                    prop = Some(RawProperty::from_start(&e)?);
                } else {
                    match name.as_ref() {
                        b"properties" => in_properties = true,
                        b"id" => in_id = true,
                        _ => {}
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = entry.as_mut() {
                    if in_properties && prop.is_none() {
                        entry.properties.push(RawProperty::from_start(&e)?);
                    }
                }
            }
            Event::Text(t) => {
                if skip_depth > 0 {
                    continue;
                }
                if let Some(p) = prop.as_mut() {
                    p.text
                        .get_or_insert_with(String::new)
                        .push_str(&t.unescape().map_err(xml_error)?);
                } else if in_id {
                    if let Some(entry) = entry.as_mut() {
                        entry
                            .id
                            .get_or_insert_with(String::new)
                            .push_str(t.unescape().map_err(xml_error)?.trim());
                    }
                }
            }
            Event::CData(t) => {
                if let (Some(p), 0) = (prop.as_mut(), skip_depth) {
                    p.text
                        .get_or_insert_with(String::new)
                        .push_str(&String::from_utf8(t.into_inner().into_owned())?);
                }
            }
            Event::End(e) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                if let Some(p) = prop.take() {
                    if let Some(entry) = entry.as_mut() {
                        entry.properties.push(p);
                    }
                    continue;
                }
                match e.local_name().as_ref() {
                    b"properties" => in_properties = false,
                    b"id" => in_id = false,
                    b"entry" => {
                        if let Some(done) = entry.take() {
                            entries.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if entry.is_some() {
        return Err(Error::parse("xml ended inside an entry"));
    }
    Ok(entries)
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::parse("invalid xml").with_source(e)
}

/// Parse an `Edm.DateTime` text like `2012-01-02T03:04:05.1234567Z`.
///
/// Fractional seconds may have any number of digits and are rounded to
/// microseconds.
fn parse_edm_datetime(text: &str) -> Result<DateTime> {
    let invalid = || Error::parse(format!("invalid Edm.DateTime value: {text}"));

    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let (seconds, fraction) = match trimmed.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (trimmed, None),
    };

    let mut t = NaiveDateTime::parse_from_str(seconds, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| invalid().with_source(e))?
        .and_utc();
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let fraction: f64 = format!("0.{fraction}")
            .parse()
            .map_err(|e| invalid().with_source(e))?;
        t += TimeDelta::microseconds((fraction * 1_000_000.0).round() as i64);
    }
    Ok(t)
}

fn format_edm_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "INF".to_string()
    } else if v == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        // Debug keeps the shortest text that parses back to the same value.
        format!("{v:?}")
    }
}

fn parse_edm_double(text: &str) -> Option<f64> {
    match text.trim() {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        v => v.parse().ok(),
    }
}
