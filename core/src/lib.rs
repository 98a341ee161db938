//! Synchronous client core for the Algorithmia API.
//!
//! # Overview
//! Turns `Request` values into authenticated HTTP calls and the raw replies
//! into typed `Response` values, raising API error envelopes as
//! `ResponseError`.
//!
//! # Design
//! - `Request` holds method, endpoint, headers and params; it validates the
//!   method and assembles the URL (`v` version marker, query params for
//!   non-POST methods).
//! - `Client` prepares the wire message (JSON body or file stream,
//!   `Authorization: Simple <token>`), dispatches it through a `Transport`
//!   and selects the response variant from `X-Data-Type`.
//! - Transports are pluggable: libcurl (`curl-transport`) and ureq
//!   (`ureq-transport`), or any caller-supplied `Transport`.
//! - `Algorithmia`, `Algo` and `Connector` are thin endpoint builders on top.

pub mod algo;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod sdk;
pub mod transport;
pub mod types;
pub mod urls;

pub use algo::{Algo, OutputMode};
pub use client::Client;
pub use config::ClientConfig;
pub use connector::Connector;
pub use error::{ApiErrorKind, ResponseError, SdkError};
pub use http::{HttpRequest, Method, Payload, RawResponse};
pub use request::{Params, Request};
pub use response::{DataResponse, DataType, DirectoryResponse, FileResponse, Response};
pub use sdk::Algorithmia;
pub use transport::{create_transport, Transport, TransportChoice};
pub use types::{Acl, FileEntry, FolderEntry};
