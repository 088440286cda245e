//! Vehicle appraisal report assembly
//!
//! Turns a filled appraisal form, its uploads and the session's analog
//! slots into a rendered DOCX report:
//!
//! ```text
//! uploads -> normalize -> photo blocks / appendix entries -> context -> render -> cleanup
//! ```
//!
//! Per-file problems never abort a render; they are collected as warnings
//! on the [`GeneratedReport`]. Only template and I/O errors are fatal.

pub mod analogs;
pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod format;
pub mod photos;
pub mod pipeline;
pub mod record;
pub mod session;
pub mod summary;
pub mod upload;

pub use analogs::{
    analog_heading, default_analog_title, AnalogCollection, AnalogSnapshot, MAX_ANALOGS,
};
pub use config::GeneratorConfig;
pub use context::{assemble_context, AnalogBlock, AttachmentGroup, ContextInputs};
pub use error::{AppraisalError, ConfigError, Result};
pub use form::{AppraisalForm, FormUploads, DEFAULT_CONTRACTOR};
pub use pipeline::{report_file_name, GeneratedReport, ReportGenerator};
pub use record::AppraisalRecord;
pub use session::{AppraisalSession, UserProfile};
pub use upload::{normalize_uploads, NormalizedUploads, RawUpload, UploadContent, UploadHandle, UploadedAttachment};
