//! Pure-Rust transport on top of `ureq`.
//!
//! `ureq` parses the response itself, so no header-boundary handling is
//! needed here. Status codes are returned as data, never as errors; the
//! client decides what an error envelope means.

use std::fs::File;
use std::time::Duration;

use ureq::{Agent, SendBody};

use super::{Transport, CONNECT_TIMEOUT};
use crate::error::SdkError;
use crate::http::{Headers, Method, Payload, RawResponse};

/// Largest response body read into memory.
const MAX_BODY_BYTES: u64 = 1 << 30;

impl From<ureq::Error> for SdkError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Io(io) => SdkError::Io(io),
            other => SdkError::transport(0, other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UreqTransport {
    debug: bool,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent(timeout: Duration) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_global(Some(timeout))
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        url: &str,
        method: Method,
        body: &Payload,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, SdkError> {
        let agent = Self::agent(timeout);

        macro_rules! with_headers {
            ($builder:expr) => {{
                let mut builder = $builder;
                for (name, value) in headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder
            }};
        }

        let result = match (method, body) {
            (Method::Get, _) => with_headers!(agent.get(url)).call(),
            (Method::Head, _) => with_headers!(agent.head(url)).call(),
            (Method::Delete, _) => with_headers!(agent.delete(url)).call(),
            (Method::Post | Method::Put | Method::Patch, Payload::FileStream(path)) => {
                let mut file = File::open(path)?;
                let builder = match method {
                    Method::Post => agent.post(url),
                    Method::Patch => agent.patch(url),
                    _ => agent.put(url),
                };
                with_headers!(builder).send(SendBody::from_reader(&mut file))
            }
            (Method::Post, Payload::Json(json)) => with_headers!(agent.post(url)).send(json.as_bytes()),
            (Method::Put, Payload::Json(json)) => with_headers!(agent.put(url)).send(json.as_bytes()),
            (Method::Patch, Payload::Json(json)) => {
                with_headers!(agent.patch(url)).send(json.as_bytes())
            }
        };

        let mut response = result?;
        let status = response.status().as_u16();
        let response_headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()?;

        if self.debug {
            tracing::debug!(%url, %method, status, bytes = body.len(), "ureq response");
        }

        Ok(RawResponse::new(status, response_headers, body))
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn name(&self) -> &'static str {
        "ureq"
    }
}
