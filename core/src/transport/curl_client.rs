//! libcurl transport.
//!
//! libcurl hands back headers and body as one byte stream (`show_header`),
//! so the transport has to find the header/body boundary itself. libcurl
//! releases older than 7.30.0 undercount the header size when a proxy sits in
//! the path: the `CONNECT` tunnel's own status block is left out, and in some
//! builds the count disagrees with `Content-Length`. For those versions the
//! boundary is recomputed; newer versions use the reported size unchanged.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use curl::easy::{Easy, List, ReadError};
use regex::bytes::Regex;

use super::{Transport, CONNECT_TIMEOUT};
use crate::error::SdkError;
use crate::http::{parse_header_block, Method, Payload, RawResponse};

/// First libcurl version (7.30.0) that reports header sizes correctly
/// behind a proxy.
pub const PROXY_QUIRK_FIXED_VERSION: u32 = 0x071E00;

/// Status block a proxy sends after accepting a `CONNECT`.
pub const CONNECTION_ESTABLISHED: &str = "HTTP/1.0 200 Connection established\r\n\r\n";

static CONTENT_LENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Content-Length: (\d+)").expect("static regex is valid"));

impl From<curl::Error> for SdkError {
    fn from(err: curl::Error) -> Self {
        SdkError::transport(i64::from(err.code()), err.description().to_string())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CurlTransport {
    debug: bool,
    ca_bundle: Option<PathBuf>,
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify peers against this CA bundle instead of libcurl's default.
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    pub fn ca_bundle(&self) -> Option<&Path> {
        self.ca_bundle.as_deref()
    }

    fn configure(
        &self,
        easy: &mut Easy,
        url: &str,
        method: Method,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.custom_request(method.as_str())?;

        let mut list = List::new();
        for header in compile_request_headers(headers) {
            list.append(&header)?;
        }
        easy.http_headers(list)?;

        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.timeout(timeout)?;
        easy.follow_location(true)?;
        easy.show_header(true)?;
        easy.ssl_verify_peer(true)?;
        easy.ssl_verify_host(true)?;
        if let Some(path) = &self.ca_bundle {
            easy.cainfo(path)?;
        }
        easy.verbose(self.debug)?;
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn send(
        &self,
        url: &str,
        method: Method,
        body: &Payload,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, SdkError> {
        let mut easy = Easy::new();
        self.configure(&mut easy, url, method, headers, timeout)?;

        let mut upload = match body {
            Payload::FileStream(path) => {
                let file = File::open(path)?;
                easy.upload(true)?;
                easy.in_filesize(file.metadata()?.len())?;
                Some(file)
            }
            Payload::Json(json) => {
                if !matches!(method, Method::Get | Method::Head) {
                    easy.post_fields_copy(json.as_bytes())?;
                }
                None
            }
        };
        if method == Method::Head {
            easy.nobody(true)?;
        }

        tracing::trace!(%url, %method, upload = upload.is_some(), "curl perform");

        let mut raw = Vec::new();
        let mut reported = 0usize;
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                reported += line.len();
                true
            })?;
            transfer.write_function(|data| {
                raw.extend_from_slice(data);
                Ok(data.len())
            })?;
            if let Some(file) = upload.as_mut() {
                transfer.read_function(move |buf| file.read(buf).map_err(|_| ReadError::Abort))?;
            }
            transfer.perform()?;
        }

        let status = u16::try_from(easy.response_code()?).unwrap_or(0);
        let version = curl::Version::get().version_num();
        let header_size = corrected_header_size(&raw, reported, version);
        let (header_block, body) = split_response(&raw, header_size);

        Ok(RawResponse::new(status, parse_header_block(&header_block), body))
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn name(&self) -> &'static str {
        "curl"
    }
}

/// `Name: value` lines in the form libcurl expects.
pub fn compile_request_headers(headers: &[(String, String)]) -> Vec<String> {
    headers.iter().map(|(k, v)| format!("{k}: {v}")).collect()
}

/// Whether `version_num` (libcurl's packed `0xXXYYZZ`) has the proxy quirk.
pub fn needs_proxy_fix(version_num: u32) -> bool {
    version_num < PROXY_QUIRK_FIXED_VERSION
}

/// Header section length for `raw`, corrected for affected libcurl versions.
///
/// Affected versions take, in order: total length minus a `Content-Length`
/// value found anywhere in `raw`; or the reported size plus the length of a
/// `CONNECTION_ESTABLISHED` block present in `raw`. Otherwise the reported
/// size stands. The result never exceeds `raw.len()`.
pub fn corrected_header_size(raw: &[u8], reported: usize, version_num: u32) -> usize {
    if !needs_proxy_fix(version_num) {
        return reported.min(raw.len());
    }

    let size = if let Some(content_length) = find_content_length(raw) {
        raw.len().saturating_sub(content_length)
    } else if contains_ignore_ascii_case(raw, CONNECTION_ESTABLISHED.as_bytes()) {
        reported + CONNECTION_ESTABLISHED.len()
    } else {
        reported
    };

    if size != reported {
        tracing::warn!(
            reported,
            corrected = size,
            version = version_num,
            "corrected libcurl header size for proxied response"
        );
    }
    size.min(raw.len())
}

/// Split `raw` at `header_size`, trimming whitespace around both halves.
///
/// The body trim applies to file downloads too: `"line\n"` comes back as
/// `"line"`. `UreqTransport` returns bodies untouched.
pub fn split_response(raw: &[u8], header_size: usize) -> (String, Vec<u8>) {
    let (head, body) = raw.split_at(header_size.min(raw.len()));
    (
        String::from_utf8_lossy(head.trim_ascii()).into_owned(),
        body.trim_ascii().to_vec(),
    )
}

fn find_content_length(raw: &[u8]) -> Option<usize> {
    let captures = CONTENT_LENGTH.captures(raw)?;
    std::str::from_utf8(captures.get(1)?.as_bytes())
        .ok()?
        .parse()
        .ok()
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
