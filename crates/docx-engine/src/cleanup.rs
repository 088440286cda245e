//! Removal of empty page blocks left by unused template sections
//!
//! A template can carry a fixed number of repeated sections, each ending
//! in a page break. When fewer sections are filled, the unused ones render
//! as runs of blank paragraphs separated by page breaks. The algorithm:
//!
//! 1. Find the last paragraph whose marker number is within the used count
//!    (the kept boundary). Without a boundary nothing is removed.
//! 2. After it, take each maximal run of paragraphs with no visible content.
//! 3. A run holding at least one page break is deleted; any other run is a
//!    content boundary and stays.
//!
//! The algorithm only sees [`ParagraphSequence`], so it does not depend on
//! how paragraphs are stored. [`BodyParagraphs`] binds it to WordprocessingML.

use std::borrow::Cow;
use std::ops::Range;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::DocxError;
use crate::package::{DocxPackage, DOCUMENT_PART};
use crate::xml::{element_spans, visible_text};

static PAGE_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<w:br\b[^>]*\bw:type="page"|<w:pageBreakBefore\s*/>|<w:pageBreakBefore\s+w:val="(?:1|true|on)"\s*/>"#)
        .expect("page break regex is valid")
});

/// A paragraph as seen by the cleanup algorithm
pub trait ParagraphNode {
    fn text(&self) -> Cow<'_, str>;

    fn has_drawing(&self) -> bool;

    fn has_page_break(&self) -> bool;

    fn has_visible_content(&self) -> bool {
        self.has_drawing() || !self.text().trim().is_empty()
    }
}

/// An ordered, mutable sequence of paragraphs
pub trait ParagraphSequence {
    type Node: ParagraphNode;

    fn len(&self) -> usize;

    fn paragraph(&self, index: usize) -> Option<&Self::Node>;

    /// Remove the paragraph at `index`; later indices shift down by one
    fn remove(&mut self, index: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Marker-driven page cleanup
#[derive(Debug, Clone)]
pub struct PageCleanup {
    marker: Regex,
}

impl PageCleanup {
    /// `marker` must capture the section number in group 1
    pub fn new(marker: Regex) -> Self {
        Self { marker }
    }

    /// Index of the last paragraph whose marker number is `<= used`
    pub fn last_kept_boundary<S: ParagraphSequence>(&self, seq: &S, used: usize) -> Option<usize> {
        let mut boundary = None;
        for index in 0..seq.len() {
            let Some(node) = seq.paragraph(index) else { continue };
            let text = node.text();
            let Some(number) = self
                .marker
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            else {
                continue;
            };
            if number <= used {
                boundary = Some(index);
            }
        }
        boundary
    }

    /// Delete unused page blocks after the kept boundary.
    ///
    /// Returns the number of blocks removed; a second pass over the same
    /// sequence removes nothing.
    pub fn remove_unused_page_blocks<S: ParagraphSequence>(&self, seq: &mut S, used: usize) -> usize {
        let Some(boundary) = self.last_kept_boundary(seq, used) else {
            debug!("No kept section marker for {} sections; nothing to clean", used);
            return 0;
        };

        let visible = |seq: &S, i: usize| seq.paragraph(i).is_some_and(|p| p.has_visible_content());
        let breaks = |seq: &S, i: usize| seq.paragraph(i).is_some_and(|p| p.has_page_break());

        let mut removed = 0;
        let mut index = boundary + 1;
        while index < seq.len() {
            if visible(&*seq, index) {
                index += 1;
                continue;
            }

            let start = index;
            let mut end = index;
            let mut has_break = false;
            while end < seq.len() && !visible(&*seq, end) {
                has_break |= breaks(&*seq, end);
                end += 1;
            }

            if has_break {
                for i in (start..end).rev() {
                    seq.remove(i);
                }
                debug!("Removed empty page block of {} paragraphs at {}", end - start, start);
                removed += 1;
                index = start;
            } else {
                index = end;
            }
        }
        removed
    }
}

/// A direct `<w:p>` child of `<w:body>`
#[derive(Debug, Clone)]
pub struct BodyParagraph {
    range: Range<usize>,
    text: String,
    drawing: bool,
    page_break: bool,
}

impl ParagraphNode for BodyParagraph {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn has_drawing(&self) -> bool {
        self.drawing
    }

    fn has_page_break(&self) -> bool {
        self.page_break
    }
}

/// Body-level paragraphs of a main document part. Tables are not
/// paragraphs and are never touched.
#[derive(Debug, Clone)]
pub struct BodyParagraphs {
    xml: String,
    nodes: Vec<BodyParagraph>,
}

impl BodyParagraphs {
    /// Index the body paragraphs. A part without `<w:body>` yields an
    /// empty sequence.
    pub fn parse(xml: String) -> Self {
        let body = element_spans(&xml, "w:body").into_iter().next();
        let nodes = match body {
            Some(body) => element_spans(&xml, "w:p")
                .into_iter()
                .filter(|p| p.depth == body.depth + 1 && body.range.contains(&p.range.start))
                .map(|p| {
                    let fragment = &xml[p.range.clone()];
                    BodyParagraph {
                        text: visible_text(fragment),
                        drawing: fragment.contains("<w:drawing")
                            || fragment.contains("<w:pict")
                            || fragment.contains("<w:object"),
                        page_break: PAGE_BREAK_RE.is_match(fragment),
                        range: p.range,
                    }
                })
                .collect(),
            None => Vec::new(),
        };
        Self { xml, nodes }
    }

    pub fn into_xml(self) -> String {
        self.xml
    }
}

impl ParagraphSequence for BodyParagraphs {
    type Node = BodyParagraph;

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn paragraph(&self, index: usize) -> Option<&BodyParagraph> {
        self.nodes.get(index)
    }

    fn remove(&mut self, index: usize) {
        if index >= self.nodes.len() {
            return;
        }
        let node = self.nodes.remove(index);
        let removed_len = node.range.len();
        self.xml.replace_range(node.range.clone(), "");
        for later in &mut self.nodes[index..] {
            later.range = (later.range.start - removed_len)..(later.range.end - removed_len);
        }
    }
}

/// Clean an in-memory DOCX. Returns `None` when nothing was removed.
pub fn cleanup_bytes(
    bytes: &[u8],
    cleanup: &PageCleanup,
    used: usize,
) -> Result<Option<Vec<u8>>, DocxError> {
    let mut package = DocxPackage::from_bytes(bytes)?;
    let removed = cleanup_package(&mut package, cleanup, used)?;
    if removed == 0 {
        return Ok(None);
    }
    Ok(Some(package.to_bytes()?))
}

/// Reopen a saved DOCX, clean it and re-save it only when something was
/// removed. Returns the number of blocks removed.
pub fn cleanup_file(path: impl AsRef<Path>, cleanup: &PageCleanup, used: usize) -> Result<usize, DocxError> {
    let path = path.as_ref();
    let mut package = DocxPackage::open(path)?;
    let removed = cleanup_package(&mut package, cleanup, used)?;
    if removed > 0 {
        package.save(path)?;
        info!("Removed {} empty page blocks from {}", removed, path.display());
    }
    Ok(removed)
}

fn cleanup_package(package: &mut DocxPackage, cleanup: &PageCleanup, used: usize) -> Result<usize, DocxError> {
    let mut body = BodyParagraphs::parse(package.part_str(DOCUMENT_PART)?);
    let removed = cleanup.remove_unused_page_blocks(&mut body, used);
    if removed > 0 {
        package.set_part(DOCUMENT_PART, body.into_xml().into_bytes());
    }
    Ok(removed)
}
