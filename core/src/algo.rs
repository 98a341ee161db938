//! Algorithm invocation: `POST /<version>/algo/<owner>/<name>[/<version>]`.

use serde_json::{json, Map, Value};

use crate::error::SdkError;
use crate::request::{Params, Request, API_VERSION};
use crate::response::Response;
use crate::sdk::Algorithmia;
use crate::urls::append_params_to_url;

/// Default server-side timeout for a call, in seconds.
pub const DEFAULT_CALL_TIMEOUT: u64 = 300;

/// Upper bound the API accepts for `timeout`.
pub const MAX_CALL_TIMEOUT: u64 = 3000;

/// How the API should deliver an algorithm's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Result without the JSON envelope.
    Raw,
    /// Return immediately with a request id instead of waiting.
    Void,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Raw => "raw",
            OutputMode::Void => "void",
        }
    }
}

/// A prepared algorithm call. Consumed by `call`.
#[derive(Debug)]
pub struct Algo<'a> {
    sdk: &'a Algorithmia,
    request: Request,
}

impl<'a> Algo<'a> {
    pub(crate) fn new(sdk: &'a Algorithmia, path: &str, input: Params) -> Self {
        let endpoint = algo_endpoint(path);
        let request = sdk.request("POST", &endpoint, input, &[]);
        Self { sdk, request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request.set_headers([(name, value)]);
        self
    }

    /// Run the algorithm.
    ///
    /// `timeout` is capped at `MAX_CALL_TIMEOUT`. `stdout` asks for the
    /// algorithm's stdout in the metadata (honored for the owner only).
    pub fn call(
        mut self,
        timeout: u64,
        stdout: bool,
        output: Option<OutputMode>,
    ) -> Result<Response, SdkError> {
        let query = call_query(timeout, stdout, output);
        let endpoint = append_params_to_url(self.request.endpoint(), &query);
        self.request.set_endpoint(&endpoint);
        self.sdk.client().send_request(self.request)
    }

    /// `call` with the API defaults: 300s, no stdout, enveloped output.
    pub fn call_default(self) -> Result<Response, SdkError> {
        self.call(DEFAULT_CALL_TIMEOUT, false, None)
    }
}

pub fn algo_endpoint(path: &str) -> String {
    format!("/{API_VERSION}/algo/{}", path.trim_start_matches('/'))
}

fn call_query(timeout: u64, stdout: bool, output: Option<OutputMode>) -> Map<String, Value> {
    let mut query = Map::new();
    query.insert("timeout".into(), json!(timeout.min(MAX_CALL_TIMEOUT)));
    query.insert("stdout".into(), json!(u8::from(stdout)));
    if let Some(mode) = output {
        query.insert("output".into(), json!(mode.as_str()));
    }
    query
}
