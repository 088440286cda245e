//! Upload normalization
//!
//! Raw upload handles become named, non-empty byte payloads. A handle that
//! cannot be read, or reads as zero bytes, is recorded by name in the
//! failures list and dropped; nothing here returns an error.

use std::io;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name used when an upload carries none
pub const UNNAMED_UPLOAD: &str = "без названия";

/// Anything that can hand over an uploaded file's name and bytes
pub trait UploadHandle {
    fn display_name(&self) -> Option<&str>;

    fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum UploadContent {
    Bytes(Vec<u8>),
    /// The transport failed to deliver the payload
    Unreadable(String),
}

/// In-memory upload, as kept in a session or received over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUpload {
    pub name: Option<String>,
    pub content: UploadContent,
}

impl RawUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            content: UploadContent::Bytes(bytes),
        }
    }

    pub fn unreadable(name: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            name,
            content: UploadContent::Unreadable(reason.into()),
        }
    }
}

impl UploadHandle for RawUpload {
    fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match &self.content {
            UploadContent::Bytes(bytes) => Ok(bytes.clone()),
            UploadContent::Unreadable(reason) => Err(io::Error::new(io::ErrorKind::Other, reason.clone())),
        }
    }
}

/// A successfully read upload. `size == data.len()` and `data` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAttachment {
    pub name: String,
    pub data: Vec<u8>,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedUploads {
    pub accepted: Vec<UploadedAttachment>,
    pub failures: Vec<String>,
}

impl NormalizedUploads {
    pub fn names(&self) -> Vec<String> {
        self.accepted.iter().map(|a| a.name.clone()).collect()
    }
}

pub fn normalize_uploads<H: UploadHandle>(uploads: &[H]) -> NormalizedUploads {
    let mut out = NormalizedUploads::default();

    for upload in uploads {
        let name = upload
            .display_name()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNNAMED_UPLOAD)
            .to_string();

        match upload.read_bytes() {
            Ok(data) if !data.is_empty() => {
                out.accepted.push(UploadedAttachment {
                    size: data.len(),
                    name,
                    data,
                });
            }
            Ok(_) => {
                warn!("Upload '{}' is empty", name);
                out.failures.push(name);
            }
            Err(e) => {
                warn!("Upload '{}' could not be read: {}", name, e);
                out.failures.push(name);
            }
        }
    }

    out
}
