//! Data connector operations under `/<version>/connector/<connector>/<path>`.
//!
//! Directory calls answer with `X-Data-Type: directory`, file downloads with
//! `X-Data-Type: file`; the client picks the response variant from that.

use serde_json::{json, Map, Value};

use crate::error::SdkError;
use crate::request::{Params, API_VERSION};
use crate::response::Response;
use crate::sdk::Algorithmia;
use crate::urls::append_params_to_url;

/// The hosted data connector.
pub const DEFAULT_CONNECTOR: &str = "data";

/// The caller's home directory on the hosted connector.
pub const HOME_DIR: &str = ".my";

#[derive(Debug, Clone, Copy)]
pub struct Connector<'a> {
    sdk: &'a Algorithmia,
}

impl<'a> Connector<'a> {
    pub(crate) fn new(sdk: &'a Algorithmia) -> Self {
        Self { sdk }
    }

    /// List a directory. `marker` continues a truncated listing; `acl` asks
    /// for the directory's permissions.
    pub fn get_dir(
        &self,
        connector: &str,
        path: &str,
        marker: Option<&str>,
        acl: bool,
    ) -> Result<Response, SdkError> {
        let mut query = Map::new();
        query.insert("acl".into(), json!(acl.to_string()));
        if let Some(marker) = marker {
            query.insert("marker".into(), json!(marker));
        }
        let endpoint = append_params_to_url(&connector_endpoint(connector, path), &query);
        self.send("GET", &endpoint, Params::empty())
    }

    /// Create a directory under `path`. `params` usually holds `name` and
    /// optionally `acl`.
    pub fn create_dir(
        &self,
        connector: &str,
        path: &str,
        params: Map<String, Value>,
    ) -> Result<Response, SdkError> {
        self.send("POST", &connector_endpoint(connector, path), Params::Structured(params))
    }

    /// Update directory attributes such as its ACL.
    pub fn update_dir(
        &self,
        connector: &str,
        path: &str,
        params: Map<String, Value>,
    ) -> Result<Response, SdkError> {
        self.send("PATCH", &connector_endpoint(connector, path), Params::Structured(params))
    }

    /// Delete a directory; `force` also deletes its contents.
    pub fn delete_dir(&self, connector: &str, path: &str, force: bool) -> Result<Response, SdkError> {
        let mut query = Map::new();
        query.insert("force".into(), json!(force.to_string()));
        let endpoint = append_params_to_url(&connector_endpoint(connector, path), &query);
        self.send("DELETE", &endpoint, Params::empty())
    }

    pub fn get_file(&self, connector: &str, path: &str) -> Result<Response, SdkError> {
        self.send("GET", &connector_endpoint(connector, path), Params::empty())
    }

    /// `HEAD` the file; inspect `FileResponse::file_exists` on the result.
    pub fn file_exists(&self, connector: &str, path: &str) -> Result<Response, SdkError> {
        self.send("HEAD", &connector_endpoint(connector, path), Params::empty())
    }

    /// Upload `content` to `path`: a file stream is sent as raw bytes,
    /// structured params as JSON.
    pub fn upload_file(&self, connector: &str, path: &str, content: Params) -> Result<Response, SdkError> {
        self.send("PUT", &connector_endpoint(connector, path), content)
    }

    pub fn delete_file(&self, connector: &str, path: &str) -> Result<Response, SdkError> {
        self.send("DELETE", &connector_endpoint(connector, path), Params::empty())
    }

    fn send(&self, method: &str, endpoint: &str, params: Params) -> Result<Response, SdkError> {
        self.sdk.send_request(method, endpoint, params, &[])
    }
}

pub fn connector_endpoint(connector: &str, path: &str) -> String {
    format!(
        "/{API_VERSION}/connector/{}/{}",
        connector.trim_matches('/'),
        path.trim_start_matches('/')
    )
}
