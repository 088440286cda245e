//! DOCX zip container I/O
//!
//! A package is kept as an ordered list of `(part name, bytes)` so that
//! re-serialization preserves the original entry order.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::DocxError;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// Read a package from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DocxError::TemplateNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a package from memory. The main document part must exist.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            parts.push((name, data));
        }

        let package = Self { parts };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(DocxError::Archive(format!("no {} in archive", DOCUMENT_PART)));
        }
        Ok(package)
    }

    /// Build a bare single-section package around `body_xml`
    /// (the children of `<w:body>`).
    pub fn from_body_xml(body_xml: &str) -> Self {
        let content_types = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            r#"</Types>"#
        );
        let root_rels = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            r#"</Relationships>"#
        );
        let document = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
                r#"<w:body>{}</w:body></w:document>"#
            ),
            body_xml
        );
        let document_rels = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
        );

        Self {
            parts: vec![
                (CONTENT_TYPES_PART.to_string(), content_types.as_bytes().to_vec()),
                ("_rels/.rels".to_string(), root_rels.as_bytes().to_vec()),
                (DOCUMENT_PART.to_string(), document.into_bytes()),
                (DOCUMENT_RELS_PART.to_string(), document_rels.as_bytes().to_vec()),
            ],
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// A part decoded as UTF-8 XML
    pub fn part_str(&self, name: &str) -> Result<String, DocxError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| DocxError::InvalidXml(format!("{} is not UTF-8: {}", name, e)))
    }

    /// Replace a part in place, or append it when new
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Serialize. Media is stored, everything else deflated, which is
    /// the layout Word itself writes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in &self.parts {
            let options = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Serialize to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocxError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
