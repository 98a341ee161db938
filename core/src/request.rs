//! Per-call request value: method, endpoint, headers, params and token.
//!
//! # Design
//! A `Request` is built by the caller, adjusted through setters and moved
//! into `Client::send_request`, which hands it on to the response. The method
//! is stored as text and validated only when the URL is generated, so an
//! invalid method surfaces at dispatch time with a typed error.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::SdkError;
use crate::http::{merge_headers, Headers, Method};
use crate::urls::{append_params_to_url, force_slash_prefix};

/// API version used in endpoint paths and as the `v` query marker.
pub const API_VERSION: &str = "v1";

/// Query parameter carrying the API version.
pub const VERSION_PARAM: &str = "v";

/// Request parameters: a structured mapping or a file to upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Structured(Map<String, Value>),
    FileStream(PathBuf),
}

impl Params {
    pub fn empty() -> Self {
        Params::Structured(Map::new())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Params::FileStream(path.into())
    }

    pub fn is_file_stream(&self) -> bool {
        matches!(self, Params::FileStream(_))
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::empty()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Structured(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    access_token: Option<String>,
    method: String,
    endpoint: String,
    headers: Headers,
    params: Params,
    api_version: String,
}

impl Request {
    pub fn new(
        access_token: Option<String>,
        method: &str,
        endpoint: &str,
        params: Params,
    ) -> Self {
        let mut request = Self {
            access_token,
            method: String::new(),
            endpoint: endpoint.to_string(),
            headers: Headers::new(),
            params,
            api_version: API_VERSION.to_string(),
        };
        request.set_method(method);
        request
    }

    pub fn set_access_token(&mut self, access_token: Option<String>) -> &mut Self {
        self.access_token = access_token;
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Store the method uppercased. Validation is deferred to `url()`.
    pub fn set_method(&mut self, method: &str) -> &mut Self {
        self.method = method.trim().to_ascii_uppercase();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn validate_method(&self) -> Result<Method, SdkError> {
        self.method.parse()
    }

    pub fn set_endpoint(&mut self, endpoint: &str) -> &mut Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Merge `headers` into the explicit headers, overriding equal keys.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        merge_headers(&mut self.headers, headers);
        self
    }

    /// Drop every explicit header named `name`, ignoring ASCII case.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    /// Default headers merged with the explicit ones; explicit values win.
    pub fn headers(&self) -> Headers {
        let mut headers = default_headers();
        merge_headers(&mut headers, self.headers.iter().cloned());
        headers
    }

    pub fn set_params(&mut self, params: Params) -> &mut Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Params destined for the body: only POST, PUT and PATCH carry any.
    pub fn post_params(&self) -> Params {
        match self.validate_method() {
            Ok(method) if method.carries_body() => self.params.clone(),
            _ => Params::empty(),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Path and query for this request, relative to the API base.
    ///
    /// POST sends its params in the body, so only the version marker lands in
    /// the query string. Every other method gets its structured params plus
    /// the version marker.
    pub fn url(&self) -> Result<String, SdkError> {
        let method = self.validate_method()?;
        let url = force_slash_prefix(&self.endpoint);

        let mut query = Map::new();
        if method != Method::Post {
            if let Params::Structured(params) = &self.params {
                query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        query.insert(
            VERSION_PARAM.to_string(),
            Value::String(self.api_version.clone()),
        );

        Ok(append_params_to_url(&url, &query))
    }
}

/// Headers every request starts from.
pub fn default_headers() -> Headers {
    vec![("Content-Type".to_string(), "application/json".to_string())]
}
