//! Request dispatch: wire preparation, transport call, response selection.
//!
//! # Design
//! `Client` owns exactly one transport and carries no per-request state
//! besides an advisory request counter. `prepare_request_message` is pure
//! apart from stamping the `Authorization` header on the request, so it can be
//! checked without a network. `send_request` is the only place an errored
//! envelope turns into an `Err`: callers never see an error-bearing response
//! as `Ok`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::SdkError;
use crate::http::{HttpRequest, Payload};
use crate::request::{Params, Request};
use crate::response::{DataType, Response, DATA_TYPE_HEADER};
use crate::transport::Transport;

/// Production API base URL.
pub const BASE_URL: &str = "https://api.algorithmia.com";

/// Overall timeout for a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Client {
    transport: Box<dyn Transport>,
    base_url: String,
    timeout: Duration,
    request_count: AtomicU64,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.name())
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("request_count", &self.request_count())
            .finish()
    }
}

impl Client {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            request_count: AtomicU64::new(0),
        }
    }

    /// Point the client at another API host, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    /// Requests sent through this client so far.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Translate `request` into what goes on the wire.
    ///
    /// Structured post params are JSON-encoded; a file stream is passed
    /// through for the transport to upload. `Authorization: Simple <token>`
    /// replaces any caller-supplied value.
    pub fn prepare_request_message(&self, request: &mut Request) -> Result<HttpRequest, SdkError> {
        let method = request.validate_method()?;
        let url = format!("{}{}", self.base_url, request.url()?);

        let body = match request.post_params() {
            Params::FileStream(path) => Payload::FileStream(path),
            Params::Structured(params) => Payload::Json(serde_json::to_string(&params)?),
        };

        let authorization = format!("Simple {}", request.access_token().unwrap_or_default());
        request
            .remove_header("Authorization")
            .set_headers([("Authorization", authorization)]);

        Ok(HttpRequest {
            url,
            method,
            headers: request.headers(),
            body,
        })
    }

    /// Send `request` and return the decoded response.
    ///
    /// Transport failures and error envelopes both come back as `Err`.
    pub fn send_request(&self, mut request: Request) -> Result<Response, SdkError> {
        let message = self.prepare_request_message(&mut request)?;
        tracing::debug!(
            url = %message.url,
            method = %message.method,
            transport = self.transport.name(),
            "sending request"
        );

        let raw = self.transport.send(
            &message.url,
            message.method,
            &message.body,
            &message.headers,
            self.timeout,
        )?;
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let data_type = DataType::from_header(raw.header(DATA_TYPE_HEADER));
        tracing::debug!(status = raw.status, ?data_type, "received response");

        let response = Response::decode(data_type, request, raw).into_result()?;
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use crate::http::{Method, RawResponse};
    use serde_json::{json, Map, Value};
    use std::sync::{Arc, Mutex};

    /// A transport that answers with a canned response and records calls.
    #[derive(Clone, Default)]
    pub(crate) struct MockTransport {
        pub response: RawResponse,
        pub calls: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl MockTransport {
        pub fn answering(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
            Self {
                response: RawResponse::new(
                    status,
                    headers
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    body,
                ),
                calls: Arc::default(),
            }
        }

        pub fn last_call(&self) -> HttpRequest {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for MockTransport {
        fn send(
            &self,
            url: &str,
            method: Method,
            body: &Payload,
            headers: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RawResponse, SdkError> {
            self.calls.lock().unwrap().push(HttpRequest {
                url: url.to_string(),
                method,
                headers: headers.to_vec(),
                body: body.clone(),
            });
            Ok(self.response.clone())
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn send(
            &self,
            _url: &str,
            _method: Method,
            _body: &Payload,
            _headers: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RawResponse, SdkError> {
            Err(SdkError::transport(7, "Couldn't connect to server"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn client(mock: &MockTransport) -> Client {
        Client::new(Box::new(mock.clone()))
    }

    #[test]
    fn prepare_post_encodes_params_in_body() {
        let mock = MockTransport::default();
        let mut request = Request::new(
            Some("simXYZ".to_string()),
            "post",
            "/v1/algo/demo/Hello",
            Params::Structured(map(json!({"name": "world"}))),
        );
        let message = client(&mock).prepare_request_message(&mut request).unwrap();

        assert_eq!(message.url, "https://api.algorithmia.com/v1/algo/demo/Hello?v=v1");
        assert_eq!(message.method, Method::Post);
        assert_eq!(message.body, Payload::Json(r#"{"name":"world"}"#.to_string()));
        assert!(message
            .headers
            .contains(&("Authorization".to_string(), "Simple simXYZ".to_string())));
        assert!(message
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn prepare_get_sends_empty_json_body() {
        let mock = MockTransport::default();
        let mut request = Request::new(
            Some("k".to_string()),
            "GET",
            "/v1/connector/data/.my",
            Params::Structured(map(json!({"acl": "false"}))),
        );
        let message = client(&mock).prepare_request_message(&mut request).unwrap();
        assert_eq!(
            message.url,
            "https://api.algorithmia.com/v1/connector/data/.my?acl=false&v=v1"
        );
        assert_eq!(message.body, Payload::Json("{}".to_string()));
    }

    #[test]
    fn prepare_passes_file_stream_through() {
        let mock = MockTransport::default();
        let mut request = Request::new(
            Some("k".to_string()),
            "PUT",
            "/v1/connector/data/.my/f.bin",
            Params::file("/tmp/f.bin"),
        );
        let message = client(&mock).prepare_request_message(&mut request).unwrap();
        assert_eq!(message.body, Payload::FileStream("/tmp/f.bin".into()));
    }

    #[test]
    fn authorization_header_overrides_caller_value() {
        let mock = MockTransport::default();
        let mut request = Request::new(Some("real".to_string()), "GET", "/x", Params::empty());
        request.set_headers([("Authorization", "Bearer forged")]);
        let message = client(&mock).prepare_request_message(&mut request).unwrap();
        let auth: Vec<_> = message
            .headers
            .iter()
            .filter(|(k, _)| k == "Authorization")
            .collect();
        assert_eq!(auth, vec![&("Authorization".to_string(), "Simple real".to_string())]);
    }

    #[test]
    fn authorization_override_ignores_header_case() {
        let mock = MockTransport::default();
        let mut request = Request::new(Some("real".to_string()), "GET", "/x", Params::empty());
        request.set_headers([("authorization", "Bearer forged"), ("AUTHORIZATION", "Basic b")]);
        let message = client(&mock).prepare_request_message(&mut request).unwrap();
        let auth: Vec<_> = message
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth, vec![&("Authorization".to_string(), "Simple real".to_string())]);
    }

    #[test]
    fn timeout_can_be_changed_in_place() {
        let mut client = client(&MockTransport::default());
        assert_eq!(client.timeout(), DEFAULT_REQUEST_TIMEOUT);
        client.set_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn prepare_rejects_invalid_method_before_sending() {
        let mock = MockTransport::default();
        let client = client(&mock);
        let request = Request::new(None, "CONNECT", "/x", Params::empty());
        let err = client.send_request(request).unwrap_err();
        assert!(matches!(err, SdkError::InvalidMethod(_)));
        assert!(mock.calls.lock().unwrap().is_empty());
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn send_returns_data_response_by_default() {
        let mock = MockTransport::answering(200, &[], r#"{"result":42,"metadata":{"duration":1.2}}"#);
        let client = client(&mock);
        let request = Request::new(Some("k".to_string()), "POST", "/v1/algo/a/b", Params::empty());

        let response = client.send_request(request).unwrap();
        let data = response.as_data().unwrap();
        assert_eq!(data.result(), &json!(42));
        assert_eq!(data.metadata_field("duration"), Some(&json!(1.2)));
        assert_eq!(client.request_count(), 1);
        assert_eq!(response.base().request().method(), "POST");
        assert_eq!(mock.last_call().method, Method::Post);
    }

    #[test]
    fn send_selects_variant_from_data_type_header() {
        let mock = MockTransport::answering(200, &[("x-data-type", "file")], "raw bytes");
        let response = client(&mock)
            .send_request(Request::new(None, "GET", "/v1/connector/data/f", Params::empty()))
            .unwrap();
        assert_eq!(response.as_file().unwrap().file(), b"raw bytes");

        let mock = MockTransport::answering(
            200,
            &[("X-Data-Type", "directory")],
            r#"{"folders":[{"name":"a"}]}"#,
        );
        let response = client(&mock)
            .send_request(Request::new(None, "GET", "/v1/connector/data/d", Params::empty()))
            .unwrap();
        assert_eq!(response.as_directory().unwrap().folders().len(), 1);
    }

    #[test]
    fn errored_envelope_is_raised_not_returned() {
        let mock = MockTransport::answering(
            401,
            &[],
            r#"{"error":{"message":"authorization required"}}"#,
        );
        let client = client(&mock);
        let err = client
            .send_request(Request::new(None, "POST", "/v1/algo/a/b", Params::empty()))
            .unwrap_err();

        let api = err.as_response_error().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::Authorization);
        assert_eq!(api.code(), 401);
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn errored_directory_envelope_is_raised() {
        let mock = MockTransport::answering(
            404,
            &[("X-Data-Type", "directory")],
            r#"{"error":{"message":"path not found"}}"#,
        );
        let err = client(&mock)
            .send_request(Request::new(None, "GET", "/v1/connector/data/nope", Params::empty()))
            .unwrap_err();
        let api = err.as_response_error().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::Generic);
        assert_eq!(api.code(), 404);
        assert!(api.response().as_directory().is_some());
    }

    #[test]
    fn transport_errors_propagate_unchanged() {
        let client = Client::new(Box::new(FailingTransport));
        let err = client
            .send_request(Request::new(None, "GET", "/x", Params::empty()))
            .unwrap_err();
        assert!(matches!(err, SdkError::Transport { code: 7, .. }));
        assert_eq!(err.code(), 7);
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let mock = MockTransport::default();
        let client = client(&mock).with_base_url("http://127.0.0.1:3000/");
        let mut request = Request::new(None, "GET", "x", Params::empty());
        let message = client.prepare_request_message(&mut request).unwrap();
        assert_eq!(message.url, "http://127.0.0.1:3000/x?v=v1");
    }

    #[test]
    fn transport_can_be_replaced() {
        let mut client = Client::new(Box::new(FailingTransport));
        let mock = MockTransport::answering(200, &[], r#"{"result":true}"#);
        client.set_transport(Box::new(mock.clone()));
        assert_eq!(client.transport().name(), "mock");
        assert!(client
            .send_request(Request::new(None, "POST", "/x", Params::empty()))
            .is_ok());
    }
}
