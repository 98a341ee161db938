//! HTTP wire types shared by the client and the transports.
//!
//! # Design
//! The client prepares an `HttpRequest` (absolute URL, method, final headers,
//! body) and hands it to a `Transport`, which answers with a `RawResponse`.
//! Both are plain data with owned fields so a transport never borrows from the
//! `Request` it was built from.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SdkError;

/// HTTP methods the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }

    /// Methods whose params travel in the request body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(SdkError::MethodNotSpecified),
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            other => Err(SdkError::InvalidMethod(other.to_string())),
        }
    }
}

/// Ordered header list. Keys compare case-sensitively.
pub type Headers = Vec<(String, String)>;

/// Merge `incoming` into `headers`; an incoming value replaces an existing
/// entry with the same key in place.
pub fn merge_headers<I, K, V>(headers: &mut Headers, incoming: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    for (key, value) in incoming {
        let key = key.into();
        let value = value.into();
        match headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => headers.push((key, value)),
        }
    }
}

/// Body handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// JSON-encoded params, sent as-is.
    Json(String),
    /// A file the transport opens and streams as a binary upload.
    FileStream(PathBuf),
}

/// A fully prepared request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Payload,
}

/// What a transport read off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup. The last occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

/// Case-insensitive lookup over a header list; the last occurrence wins.
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse a raw header block into name/value pairs.
///
/// Status lines (including proxy `CONNECT` and redirect responses) are
/// skipped, as is anything without a colon.
pub fn parse_header_block(block: &str) -> Headers {
    let mut headers = Headers::new();
    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with("HTTP/") {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            headers.push((name.to_string(), value.trim().to_string()));
        }
    }
    headers
}
