//! Media embedding for the main document part
//!
//! Images are collected while the document XML is rewritten and written
//! out afterwards: one `word/media/` part, one relationship and, when
//! missing, one `Default` content type per extension.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::DocxError;
use crate::inline::{drawing_xml, InlineImage};
use crate::package::{DocxPackage, CONTENT_TYPES_PART, DOCUMENT_RELS_PART};

const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

static REL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bId="([^"]+)""#).expect("rel id regex is valid"));

static DOC_PR_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(?:wp:docPr|pic:cNvPr)\b[^>]*?\bid="(\d+)""#).expect("docPr regex is valid")
});

struct PendingMedia {
    rel_id: String,
    part_name: String,
    data: Vec<u8>,
    extension: &'static str,
    content_type: &'static str,
}

pub(crate) struct MediaSink {
    pending: Vec<PendingMedia>,
    taken_rel_ids: HashSet<String>,
    taken_parts: HashSet<String>,
    next_index: usize,
    next_doc_pr: u32,
}

impl MediaSink {
    pub(crate) fn new<'a>(
        document_xml: &str,
        rels_xml: &str,
        part_names: impl Iterator<Item = &'a str>,
    ) -> Self {
        let taken_rel_ids = REL_ID_RE
            .captures_iter(rels_xml)
            .map(|caps| caps[1].to_string())
            .collect();
        let max_doc_pr = DOC_PR_ID_RE
            .captures_iter(document_xml)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        Self {
            pending: Vec::new(),
            taken_rel_ids,
            taken_parts: part_names.map(str::to_string).collect(),
            next_index: 1,
            next_doc_pr: max_doc_pr + 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new("", "", std::iter::empty())
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Register `image` and return a `<w:r>` holding its drawing
    pub(crate) fn embed(&mut self, image: &InlineImage) -> String {
        let kind = image.probe().kind;

        let (rel_id, part_name) = loop {
            let index = self.next_index;
            self.next_index += 1;
            let rel_id = format!("rIdImg{}", index);
            let part_name = format!("word/media/report_image{}.{}", index, kind.extension());
            if !self.taken_rel_ids.contains(&rel_id) && !self.taken_parts.contains(&part_name) {
                break (rel_id, part_name);
            }
        };
        self.taken_rel_ids.insert(rel_id.clone());
        self.taken_parts.insert(part_name.clone());

        let doc_pr = self.next_doc_pr;
        self.next_doc_pr += 1;

        let run = format!("<w:r>{}</w:r>", drawing_xml(&rel_id, doc_pr, image));
        debug!("Embedding {} as {} ({})", image.name(), part_name, rel_id);

        self.pending.push(PendingMedia {
            rel_id,
            part_name,
            data: image.data().to_vec(),
            extension: kind.extension(),
            content_type: kind.content_type(),
        });
        run
    }

    /// Write media parts, relationships and content types into `package`.
    ///
    /// Returns the number of embedded images.
    pub(crate) fn finish(self, package: &mut DocxPackage) -> Result<usize, DocxError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut rels = match package.part(DOCUMENT_RELS_PART) {
            Some(_) => package.part_str(DOCUMENT_RELS_PART)?,
            None => concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
            )
            .to_string(),
        };
        let rels_close = rels.rfind("</Relationships>").ok_or_else(|| {
            DocxError::InvalidXml(format!("{} has no closing Relationships tag", DOCUMENT_RELS_PART))
        })?;
        let new_rels: String = self
            .pending
            .iter()
            .map(|m| {
                format!(
                    r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                    m.rel_id,
                    IMAGE_REL_TYPE,
                    m.part_name.trim_start_matches("word/")
                )
            })
            .collect();
        rels.insert_str(rels_close, &new_rels);

        let mut content_types = package.part_str(CONTENT_TYPES_PART)?;
        let types_close = content_types.rfind("</Types>").ok_or_else(|| {
            DocxError::InvalidXml(format!("{} has no closing Types tag", CONTENT_TYPES_PART))
        })?;
        let lowered = content_types.to_lowercase();
        let mut defaults = String::new();
        let mut declared: HashSet<&str> = HashSet::new();
        for media in &self.pending {
            let needle = format!(r#"extension="{}""#, media.extension);
            if lowered.contains(&needle) || !declared.insert(media.extension) {
                continue;
            }
            defaults.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                media.extension, media.content_type
            ));
        }
        content_types.insert_str(types_close, &defaults);

        let count = self.pending.len();
        for media in self.pending {
            package.set_part(&media.part_name, media.data);
        }
        package.set_part(DOCUMENT_RELS_PART, rels.into_bytes());
        package.set_part(CONTENT_TYPES_PART, content_types.into_bytes());

        Ok(count)
    }
}
