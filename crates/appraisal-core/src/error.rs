//! Error types for report generation

use std::path::PathBuf;

use docx_engine::DocxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppraisalError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Template error: {0}")]
    Template(#[from] DocxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppraisalError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AppraisalError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AppraisalError::NotSignedIn => "NOT_SIGNED_IN",
            AppraisalError::InvalidField { .. } => "INVALID_FIELD",
            AppraisalError::Template(DocxError::TemplateNotFound(_)) => "TEMPLATE_NOT_FOUND",
            AppraisalError::Template(_) => "TEMPLATE_ERROR",
            AppraisalError::Io(_) => "IO_ERROR",
            AppraisalError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, AppraisalError>;
