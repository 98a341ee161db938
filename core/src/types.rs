//! DTOs for the directory listing envelope.
//!
//! # Design
//! Fields the API may omit are optional or defaulted so a listing with extra
//! or missing keys still decodes. The mock-server defines its own copies;
//! integration tests catch schema drift between the two crates.

use serde::{Deserialize, Serialize};

/// A file inside a listed directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A sub-directory inside a listed directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
}

/// Directory permissions. `read` holds grants such as `"user://*"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acl {
    #[serde(default)]
    pub read: Vec<String>,
}
