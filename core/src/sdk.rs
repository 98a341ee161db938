//! Entry point holding the default access token and the client.

use crate::algo::Algo;
use crate::client::Client;
use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::error::SdkError;
use crate::request::{Params, Request};
use crate::response::Response;
use crate::transport::{create_transport, Transport};

#[derive(Debug)]
pub struct Algorithmia {
    client: Client,
    default_access_token: String,
}

impl Algorithmia {
    /// Build from configuration. Fails before any network activity when the
    /// access token is missing or the transport cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, SdkError> {
        let token = config.default_access_token.clone().ok_or_else(|| {
            SdkError::Config("no access token set; use default_access_token".to_string())
        })?;

        let mut transport = create_transport(config.transport)?;
        #[cfg(feature = "curl-transport")]
        if let Some(path) = &config.ca_bundle {
            if transport.name() == "curl" {
                transport = Box::new(crate::transport::CurlTransport::new().with_ca_bundle(path));
            }
        }
        transport.set_debug(config.debug);

        let client = Client::new(transport)
            .with_base_url(&config.base_url)
            .with_timeout(config.timeout());

        tracing::debug!(base_url = client.base_url(), transport = client.transport().name(), "client ready");
        Ok(Self {
            client,
            default_access_token: token,
        })
    }

    /// Build from `ALGORITHMIA_*` environment variables.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Use an explicit transport instead of a configured one.
    pub fn with_transport(access_token: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            client: Client::new(transport),
            default_access_token: access_token.to_string(),
        }
    }

    pub fn default_access_token(&self) -> &str {
        &self.default_access_token
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// A request carrying the default access token and `headers`.
    pub fn request(
        &self,
        method: &str,
        endpoint: &str,
        params: Params,
        headers: &[(&str, &str)],
    ) -> Request {
        let mut request = Request::new(
            Some(self.default_access_token.clone()),
            method,
            endpoint,
            params,
        );
        request.set_headers(headers.iter().copied());
        request
    }

    pub fn send_request(
        &self,
        method: &str,
        endpoint: &str,
        params: Params,
        headers: &[(&str, &str)],
    ) -> Result<Response, SdkError> {
        self.client
            .send_request(self.request(method, endpoint, params, headers))
    }

    /// Prepare a call to the algorithm at `path` (`owner/name[/version]`).
    pub fn algo(&self, path: &str, input: Params) -> Algo<'_> {
        Algo::new(self, path, input)
    }

    pub fn connector(&self) -> Connector<'_> {
        Connector::new(self)
    }
}
