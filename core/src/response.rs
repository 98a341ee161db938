//! Typed responses, selected by the `X-Data-Type` response header.
//!
//! # Design
//! `Response` is a closed enum. `DataType::from_header` picks the variant once
//! and `Response::decode` builds it; nothing is decoded twice. Every variant
//! embeds a `ResponseBase` holding the originating request, the raw parts and
//! the decoded envelope. Whether the envelope is an error is fixed at
//! construction; turning it into a `ResponseError` is left to the caller
//! (normally `Client::send_request`).

use serde_json::{Map, Value};

use crate::error::{ResponseError, SdkError};
use crate::http::{header_value, Headers, Method, RawResponse};
use crate::request::Request;
use crate::types::{Acl, FileEntry, FolderEntry};

/// Response header that selects the response variant.
pub const DATA_TYPE_HEADER: &str = "X-Data-Type";

/// Which response variant a raw response decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Data,
    Directory,
    File,
}

impl DataType {
    /// Map the `X-Data-Type` value to a variant. Absent or unknown values
    /// fall back to `Data`.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("file") => DataType::File,
            Some(v) if v.eq_ignore_ascii_case("directory") => DataType::Directory,
            _ => DataType::Data,
        }
    }
}

/// State shared by every response variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBase {
    request: Request,
    status: u16,
    headers: Headers,
    body: Vec<u8>,
    decoded: Value,
    is_error: bool,
}

impl ResponseBase {
    fn new(request: Request, raw: RawResponse, decode_json: bool) -> Self {
        let decoded = if decode_json {
            decode_envelope(&raw.body)
        } else {
            Value::Object(Map::new())
        };
        let is_error = ["error", "errors"]
            .iter()
            .any(|key| decoded.get(key).is_some_and(|v| !v.is_null()));
        Self {
            request,
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            decoded,
            is_error,
        }
    }

    /// The request that produced this response.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn access_token(&self) -> Option<&str> {
        self.request.access_token()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The decoded envelope; always a JSON object, empty when the body was
    /// not a JSON object.
    pub fn decoded(&self) -> &Value {
        &self.decoded
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Parse `body` as a JSON object; anything else decodes to `{}`.
fn decode_envelope(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

/// A `{result, metadata}` envelope, the answer to algorithm calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DataResponse {
    base: ResponseBase,
    result: Value,
    metadata: Value,
    request_id: Option<String>,
}

impl DataResponse {
    fn new(base: ResponseBase) -> Self {
        let decoded = base.decoded();
        let result = decoded.get("result").cloned().unwrap_or(Value::Null);
        let metadata = decoded.get("metadata").cloned().unwrap_or(Value::Null);
        let request_id = if decoded.get("async").and_then(Value::as_str) == Some("void") {
            decoded
                .get("request_id")
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        };
        Self {
            base,
            result,
            metadata,
            request_id,
        }
    }

    pub fn base(&self) -> &ResponseBase {
        &self.base
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Id of an asynchronous request. Only set for calls made with
    /// `output=void`.
    pub fn request_id(&self) -> Result<&str, SdkError> {
        self.request_id.as_deref().ok_or(SdkError::MissingRequestId)
    }
}

/// A directory listing or a directory mutation result.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryResponse {
    base: ResponseBase,
    files: Vec<FileEntry>,
    folders: Vec<FolderEntry>,
    acl: Option<Acl>,
    marker: Option<String>,
    deleted: Value,
    error_deleted: Value,
}

impl DirectoryResponse {
    fn new(base: ResponseBase) -> Self {
        let decoded = base.decoded();
        let files = typed_entries(decoded, "files");
        let folders = typed_entries(decoded, "folders");
        let acl = typed_field(decoded, "acl");
        let marker = decoded
            .get("marker")
            .and_then(Value::as_str)
            .map(str::to_string);
        let deleted = nested_flag(decoded, "result");
        let error_deleted = nested_flag(decoded, "error");
        Self {
            base,
            files,
            folders,
            acl,
            marker,
            deleted,
            error_deleted,
        }
    }

    pub fn base(&self) -> &ResponseBase {
        &self.base
    }

    /// Entries of `files` that decode as `FileEntry`.
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Sub-directories that decode as `FolderEntry`.
    pub fn folders(&self) -> &[FolderEntry] {
        &self.folders
    }

    /// `files` exactly as the API sent it, malformed entries included.
    pub fn raw_files(&self) -> &[Value] {
        raw_array(self.base.decoded(), "files")
    }

    /// `folders` exactly as the API sent it.
    pub fn raw_folders(&self) -> &[Value] {
        raw_array(self.base.decoded(), "folders")
    }

    pub fn acl(&self) -> Option<&Acl> {
        self.acl.as_ref()
    }

    /// Pagination cursor for the next page, if the listing was truncated.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// `result.deleted`, `false` when absent.
    pub fn deleted(&self) -> &Value {
        &self.deleted
    }

    /// `error.deleted`, `false` when absent.
    pub fn error_deleted(&self) -> &Value {
        &self.error_deleted
    }
}

fn typed_field<T: serde::de::DeserializeOwned>(decoded: &Value, key: &str) -> Option<T> {
    let value = decoded.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(typed) => Some(typed),
        Err(err) => {
            tracing::warn!(field = key, %err, "ignoring malformed directory field");
            None
        }
    }
}

/// Decode each element of the `key` array on its own; one bad entry does not
/// drop the others.
fn typed_entries<T: serde::de::DeserializeOwned>(decoded: &Value, key: &str) -> Vec<T> {
    raw_array(decoded, key)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry.clone()) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::warn!(field = key, index, %err, "skipping malformed listing entry");
                None
            }
        })
        .collect()
}

fn raw_array<'a>(decoded: &'a Value, key: &str) -> &'a [Value] {
    decoded
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn nested_flag(decoded: &Value, parent: &str) -> Value {
    decoded
        .get(parent)
        .and_then(|p| p.get("deleted"))
        .cloned()
        .unwrap_or(Value::Bool(false))
}

/// Raw file content.
#[derive(Debug, Clone, PartialEq)]
pub struct FileResponse {
    base: ResponseBase,
    file_exists: Option<bool>,
}

impl FileResponse {
    fn new(base: ResponseBase) -> Self {
        let was_head = base.request().validate_method().ok() == Some(Method::Head);
        let file_exists = (was_head && base.status() == 200).then_some(true);
        Self { base, file_exists }
    }

    pub fn base(&self) -> &ResponseBase {
        &self.base
    }

    pub fn file(&self) -> &[u8] {
        self.base.body()
    }

    /// `Some(true)` for a HEAD request answered with 200, `None` otherwise.
    pub fn file_exists(&self) -> Option<bool> {
        self.file_exists
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Data(DataResponse),
    Directory(DirectoryResponse),
    File(FileResponse),
}

impl Response {
    /// Build the variant for `data_type` from a raw transport response.
    ///
    /// Data and directory bodies are decoded as JSON envelopes. File bodies
    /// are content, not envelopes, and are left undecoded.
    pub fn decode(data_type: DataType, request: Request, raw: RawResponse) -> Self {
        match data_type {
            DataType::Data => Response::Data(DataResponse::new(ResponseBase::new(request, raw, true))),
            DataType::Directory => {
                Response::Directory(DirectoryResponse::new(ResponseBase::new(request, raw, true)))
            }
            DataType::File => Response::File(FileResponse::new(ResponseBase::new(request, raw, false))),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Response::Data(_) => DataType::Data,
            Response::Directory(_) => DataType::Directory,
            Response::File(_) => DataType::File,
        }
    }

    pub fn base(&self) -> &ResponseBase {
        match self {
            Response::Data(r) => r.base(),
            Response::Directory(r) => r.base(),
            Response::File(r) => r.base(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.base().is_error()
    }

    /// `Err` with the classified error when the envelope is an error.
    pub fn into_result(self) -> Result<Response, ResponseError> {
        if self.is_error() {
            Err(ResponseError::create(self))
        } else {
            Ok(self)
        }
    }

    pub fn as_data(&self) -> Option<&DataResponse> {
        match self {
            Response::Data(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryResponse> {
        match self {
            Response::Directory(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileResponse> {
        match self {
            Response::File(r) => Some(r),
            _ => None,
        }
    }
}
