//! DOCX template rendering engine
//!
//! This crate fills WordprocessingML templates in memory, including:
//! - Placeholder substitution (`{{ name }}`) tolerant of split runs
//! - Rich text runs, photo-grid sub-documents and repeated inline images
//! - Media embedding (parts, relationships, content types)
//! - Post-render cleanup of empty trailing page blocks
//!
//! The engine edits package parts as strings; it never builds a DOM.

pub mod cleanup;
pub mod context;
pub mod error;
pub mod grid;
pub mod inline;
pub mod package;
pub mod template;

mod media;
mod xml;

pub use cleanup::{cleanup_bytes, cleanup_file, BodyParagraphs, PageCleanup, ParagraphNode, ParagraphSequence};
pub use context::{RenderContext, RenderValue, RichText};
pub use error::DocxError;
pub use grid::PhotoGrid;
pub use inline::{probe_image, ImageKind, ImageProbe, InlineImage};
pub use package::DocxPackage;
pub use template::{DocxTemplate, RenderedDocument};
