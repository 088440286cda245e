//! Error types for template loading, rendering and cleanup

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Invalid DOCX archive: {0}")]
    Archive(String),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DocxError {
    fn from(err: zip::result::ZipError) -> Self {
        DocxError::Archive(err.to_string())
    }
}

impl From<image::ImageError> for DocxError {
    fn from(err: image::ImageError) -> Self {
        DocxError::Image(err.to_string())
    }
}
