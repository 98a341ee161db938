//! Pluggable transports that put a prepared request on the wire.
//!
//! # Design
//! `Transport` is the seam between the client and an HTTP library. A
//! transport receives the final URL, method, body and headers and returns
//! the buffered `RawResponse`; it never interprets the envelope. Any
//! library-level failure is returned as `SdkError::Transport` and never
//! retried.
//!
//! Two implementations ship, each behind a cargo feature: `CurlTransport`
//! (libcurl, the reference behavior) and `UreqTransport` (pure Rust). With no
//! explicit choice, `detect_default` takes the first one compiled in.

#[cfg(feature = "curl-transport")]
pub mod curl_client;
#[cfg(feature = "ureq-transport")]
pub mod ureq_client;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SdkError;
use crate::http::{Method, Payload, RawResponse};

#[cfg(feature = "curl-transport")]
pub use curl_client::CurlTransport;
#[cfg(feature = "ureq-transport")]
pub use ureq_client::UreqTransport;

/// Connect timeout applied by every shipped transport.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub trait Transport: Send {
    /// Send one request and buffer the whole response.
    fn send(
        &self,
        url: &str,
        method: Method,
        body: &Payload,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, SdkError>;

    /// Toggle verbose diagnostics. Transports without any ignore it.
    fn set_debug(&mut self, _debug: bool) {}

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// A transport selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportChoice {
    Curl,
    Ureq,
}

impl TransportChoice {
    /// Every choice, in default detection order.
    pub const ALL: [TransportChoice; 2] = [TransportChoice::Curl, TransportChoice::Ureq];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportChoice::Curl => "curl",
            TransportChoice::Ureq => "ureq",
        }
    }

    /// Whether this transport was compiled into the crate.
    pub fn is_available(&self) -> bool {
        match self {
            TransportChoice::Curl => cfg!(feature = "curl-transport"),
            TransportChoice::Ureq => cfg!(feature = "ureq-transport"),
        }
    }
}

impl fmt::Display for TransportChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportChoice {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curl" => Ok(TransportChoice::Curl),
            "ureq" => Ok(TransportChoice::Ureq),
            other => Err(SdkError::Config(format!(
                "unsupported transport {other:?}; expected \"curl\" or \"ureq\""
            ))),
        }
    }
}

/// Build the named transport, or the default one when `choice` is `None`.
pub fn create_transport(choice: Option<TransportChoice>) -> Result<Box<dyn Transport>, SdkError> {
    match choice {
        Some(choice) => build(choice),
        None => detect_default(),
    }
}

/// First transport compiled in, in `TransportChoice::ALL` order.
pub fn detect_default() -> Result<Box<dyn Transport>, SdkError> {
    match TransportChoice::ALL.into_iter().find(TransportChoice::is_available) {
        Some(choice) => build(choice),
        None => Err(SdkError::Config(
            "no HTTP transport available; enable the curl-transport or ureq-transport feature"
                .to_string(),
        )),
    }
}

fn build(choice: TransportChoice) -> Result<Box<dyn Transport>, SdkError> {
    tracing::debug!(transport = %choice, "creating transport");
    match choice {
        #[cfg(feature = "curl-transport")]
        TransportChoice::Curl => Ok(Box::new(CurlTransport::new())),
        #[cfg(feature = "ureq-transport")]
        TransportChoice::Ureq => Ok(Box::new(UreqTransport::new())),
        #[allow(unreachable_patterns)]
        other => Err(SdkError::Config(format!(
            "the {other} transport is not compiled in"
        ))),
    }
}
