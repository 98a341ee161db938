//! Error types for the API client.
//!
//! # Design
//! Failures come in two tiers. `SdkError` covers everything that goes wrong
//! before a usable HTTP response exists: invalid requests, configuration,
//! transport failures. A response that arrived but whose envelope carries an
//! `error`/`errors` key becomes a `ResponseError`, which owns that response
//! and is classified by its error message.

use serde_json::Value;

use crate::response::Response;

/// Message used when the envelope has no `error.message`.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error from Algorithmia.";

/// The one error message the API uses for a missing or rejected key.
pub const AUTHORIZATION_REQUIRED: &str = "authorization required";

/// Errors returned by the client and its transports.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("HTTP method not specified")]
    MethodNotSpecified,

    #[error("Invalid HTTP method specified: {0}")]
    InvalidMethod(String),

    /// The transport failed before a response was read. `code` is the
    /// native error code of the underlying HTTP library, 0 when it has none.
    #[error("transport error ({code}): {message}")]
    Transport { code: i64, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("request id is only available for requests made with output=void")]
    MissingRequestId,

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The API answered with an error envelope.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl SdkError {
    /// Numeric code: native transport code, classified API code, or 0.
    pub fn code(&self) -> i64 {
        match self {
            SdkError::Transport { code, .. } => *code,
            SdkError::Response(err) => i64::from(err.code()),
            SdkError::Io(err) => err.raw_os_error().map(i64::from).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn transport(code: i64, message: impl Into<String>) -> Self {
        SdkError::Transport {
            code,
            message: message.into(),
        }
    }

    /// The API error, if this is one.
    pub fn as_response_error(&self) -> Option<&ResponseError> {
        match self {
            SdkError::Response(err) => Some(err),
            _ => None,
        }
    }
}

/// Classification of an API error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The access token was missing or rejected.
    Authorization,
    /// Any other error message.
    Generic,
}

impl ApiErrorKind {
    /// Status code attached to each kind.
    pub fn code(&self) -> u16 {
        match self {
            ApiErrorKind::Authorization => 401,
            ApiErrorKind::Generic => 404,
        }
    }
}

/// An API error envelope together with the response that carried it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ResponseError {
    kind: ApiErrorKind,
    message: String,
    response: Box<Response>,
}

impl ResponseError {
    /// Classify the error envelope of `response`.
    ///
    /// Dispatch is on the literal `error.message`; new cases are new literals.
    pub fn create(response: Response) -> Self {
        let message = response
            .base()
            .decoded()
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR_MESSAGE)
            .to_string();

        let kind = match message.as_str() {
            AUTHORIZATION_REQUIRED => ApiErrorKind::Authorization,
            _ => ApiErrorKind::Generic,
        };

        Self {
            kind,
            message,
            response: Box::new(response),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn is_authorization(&self) -> bool {
        self.kind == ApiErrorKind::Authorization
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classified code: 401 for authorization errors, 404 otherwise.
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Status code the server actually sent.
    pub fn http_status_code(&self) -> u16 {
        self.response.base().status()
    }

    /// `error.error_subcode`, or -1 when absent.
    pub fn sub_error_code(&self) -> i64 {
        self.error_field("error_subcode")
            .and_then(Value::as_i64)
            .unwrap_or(-1)
    }

    /// `error.type`, or an empty string when absent.
    pub fn error_type(&self) -> &str {
        self.error_field("type")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn raw_body(&self) -> &[u8] {
        self.response.base().body()
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        *self.response
    }

    fn error_field(&self, key: &str) -> Option<&Value> {
        self.response.base().decoded().get("error")?.get(key)
    }
}
