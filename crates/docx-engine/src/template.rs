//! Placeholder substitution over a DOCX template
//!
//! Word splits text into runs freely, so a placeholder like
//! `{{ customer_name }}` may be spread over several `<w:t>` elements of
//! one paragraph. Each paragraph's text is therefore matched as a whole
//! and the result is written back into the original `<w:t>` elements:
//! the value goes into the element where the placeholder starts and the
//! remainder of the placeholder is removed from the following ones.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::context::{RenderContext, RenderValue, RichText};
use crate::error::DocxError;
use crate::media::MediaSink;
use crate::package::{DocxPackage, DOCUMENT_PART, DOCUMENT_RELS_PART};
use crate::xml::{self, escape_text, leaf_paragraphs, push_escaped, unescape, WT_RE};

/// `{{ name }}`, also accepting the `{{p name }}` / `{{r name }}` spelling
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(?:[pr]\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("placeholder regex is valid")
});

static RUN_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:r[\s>]").expect("run regex is valid"));

static RUN_PROPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:rPr>(.*?)</w:rPr>").expect("rPr regex is valid"));

static EMPTY_CHILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:([A-Za-z]+)\b[^>]*?/>").expect("child regex is valid"));

static HEADER_FOOTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^word/(?:header|footer)\d*\.xml$").expect("header regex is valid")
});

/// A loaded template, reusable for any number of renders
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    package: DocxPackage,
}

/// Output of a render
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
    images_embedded: usize,
}

impl RenderedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn images_embedded(&self) -> usize {
        self.images_embedded
    }

    /// Write to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocxError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

impl DocxTemplate {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let path = path.as_ref();
        let package = DocxPackage::open(path)?;
        info!("Loaded template {}", path.display());
        Ok(Self { package })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        Ok(Self {
            package: DocxPackage::from_bytes(bytes)?,
        })
    }

    pub fn from_package(package: DocxPackage) -> Self {
        Self { package }
    }

    /// Placeholder names referenced by the document, headers and footers
    pub fn placeholders(&self) -> Result<BTreeSet<String>, DocxError> {
        let mut names = BTreeSet::new();
        for part in self.text_parts() {
            let xml = self.package.part_str(&part)?;
            for range in leaf_paragraphs(&xml) {
                let text = xml::visible_text(&xml[range]);
                names.extend(
                    PLACEHOLDER_RE
                        .captures_iter(&text)
                        .map(|caps| caps[1].to_string()),
                );
            }
        }
        Ok(names)
    }

    /// Substitute every placeholder and serialize the result
    pub fn render(&self, ctx: &RenderContext) -> Result<RenderedDocument, DocxError> {
        let mut package = self.package.clone();

        let document = package.part_str(DOCUMENT_PART)?;
        let rels = match package.part(DOCUMENT_RELS_PART) {
            Some(_) => package.part_str(DOCUMENT_RELS_PART)?,
            None => String::new(),
        };
        let mut media = MediaSink::new(&document, &rels, package.part_names());

        let rendered = render_part(&document, ctx, Some(&mut media));
        package.set_part(DOCUMENT_PART, rendered.into_bytes());

        for part in self.text_parts().into_iter().filter(|p| p != DOCUMENT_PART) {
            let xml = package.part_str(&part)?;
            let rendered = render_part(&xml, ctx, None);
            package.set_part(&part, rendered.into_bytes());
        }

        let images_embedded = media.finish(&mut package)?;
        info!(
            "Rendered template: {} placeholders bound, {} images embedded",
            ctx.len(),
            images_embedded
        );

        Ok(RenderedDocument {
            bytes: package.to_bytes()?,
            images_embedded,
        })
    }

    fn text_parts(&self) -> Vec<String> {
        let mut parts = vec![DOCUMENT_PART.to_string()];
        parts.extend(
            self.package
                .part_names()
                .filter(|name| HEADER_FOOTER_RE.is_match(name))
                .map(str::to_string),
        );
        parts
    }
}

/// Render every leaf paragraph of one part. Block values are only
/// expanded when a media sink is available (the main document part).
fn render_part(xml: &str, ctx: &RenderContext, mut media: Option<&mut MediaSink>) -> String {
    let mut out = xml.to_string();
    let cells = xml::element_spans(xml, "w:tc");
    for range in leaf_paragraphs(xml).into_iter().rev() {
        let paragraph = &xml[range.clone()];
        let in_cell = cells
            .iter()
            .any(|cell| cell.range.start < range.start && range.end <= cell.range.end);
        if let Some(replacement) =
            render_paragraph(paragraph, ctx, media.as_deref_mut(), in_cell)
        {
            out.replace_range(range, &replacement);
        }
    }
    out
}

/// One `<w:t>` element of a paragraph
struct TextSlot {
    /// Whole element range within the paragraph
    element: std::ops::Range<usize>,
    text: String,
}

/// Returns `None` when the paragraph holds no placeholder
fn render_paragraph(
    paragraph: &str,
    ctx: &RenderContext,
    media: Option<&mut MediaSink>,
    in_cell: bool,
) -> Option<String> {
    let slots: Vec<TextSlot> = WT_RE
        .captures_iter(paragraph)
        .filter_map(|caps| {
            let element = caps.get(0)?.range();
            let text = unescape(caps.get(1)?.as_str()).into_owned();
            Some(TextSlot { element, text })
        })
        .collect();

    let mut virtual_text = String::new();
    let mut owners: Vec<usize> = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        virtual_text.push_str(&slot.text);
        owners.extend(std::iter::repeat(index).take(slot.text.chars().count()));
    }

    // (first char, char after last, name)
    let placeholders: Vec<(usize, usize, String)> = PLACEHOLDER_RE
        .captures_iter(&virtual_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let start = virtual_text[..whole.start()].chars().count();
            let len = whole.as_str().chars().count();
            Some((start, start + len, caps[1].to_string()))
        })
        .collect();

    if placeholders.is_empty() {
        return None;
    }

    if let [(_, _, name)] = placeholders.as_slice() {
        let standalone = PLACEHOLDER_RE
            .find(virtual_text.trim())
            .is_some_and(|m| m.as_str().len() == virtual_text.trim().len());
        if let (true, Some(value), Some(media)) = (standalone, ctx.get(name), media) {
            if value.is_block() {
                let paragraph_properties = xml::first_element(paragraph, "w:pPr").unwrap_or("");
                return Some(render_block(value, paragraph_properties, media, in_cell));
            }
        }
    }

    let chars: Vec<char> = virtual_text.chars().collect();
    let mut contents: Vec<String> = vec![String::new(); slots.len()];
    let mut next = placeholders.iter().peekable();
    let mut i = 0;
    while i < chars.len() {
        match next.peek() {
            Some((start, end, name)) if *start == i => {
                let slot = owners[i];
                let run_props = enclosing_run_properties(paragraph, slots[slot].element.start);
                contents[slot].push_str(&inline_fragment(ctx.get(name), name, run_props));
                i = *end;
                next.next();
            }
            _ => {
                push_escaped(&mut contents[owners[i]], chars[i]);
                i += 1;
            }
        }
    }

    let touched: BTreeSet<usize> = placeholders
        .iter()
        .flat_map(|(start, end, _)| owners[*start..*end].iter().copied())
        .collect();

    let mut out = paragraph.to_string();
    for (index, slot) in slots.iter().enumerate().rev() {
        if touched.contains(&index) {
            let element = format!(r#"<w:t xml:space="preserve">{}</w:t>"#, contents[index]);
            out.replace_range(slot.element.clone(), &element);
        }
    }
    Some(out)
}

/// Markup placed inside the `<w:t>` where a placeholder starts
fn inline_fragment(value: Option<&RenderValue>, name: &str, run_props: &str) -> String {
    match value {
        Some(RenderValue::Text(text)) => text
            .split('\n')
            .map(escape_text)
            .collect::<Vec<_>>()
            .join(r#"</w:t><w:br/><w:t xml:space="preserve">"#),
        Some(RenderValue::RichText(rich)) => format!(
            concat!(
                r#"</w:t></w:r><w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
                r#"<w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">"#
            ),
            rich_run_properties(run_props, rich),
            escape_text(&rich.text),
            run_props
        ),
        Some(_) => {
            warn!(
                "Placeholder '{}' holds a block value outside a paragraph of its own; rendered empty",
                name
            );
            String::new()
        }
        None => {
            debug!("Placeholder '{}' not bound; rendered empty", name);
            String::new()
        }
    }
}

/// Replacement for a whole paragraph bound to a block value. A table
/// cell must end with a paragraph, so one is kept there when the block
/// renders nothing.
fn render_block(
    value: &RenderValue,
    paragraph_properties: &str,
    media: &mut MediaSink,
    in_cell: bool,
) -> String {
    let mut out: String = match value {
        RenderValue::SubDocument(grid) => grid.to_xml(paragraph_properties, media),
        RenderValue::Entries(images) => images
            .iter()
            .map(|image| format!("<w:p>{}{}</w:p>", paragraph_properties, media.embed(image)))
            .collect(),
        RenderValue::Text(_) | RenderValue::RichText(_) => String::new(),
    };
    if in_cell && !(out.ends_with("</w:p>") || out.ends_with("<w:p/>")) {
        out.push_str(&format!("<w:p>{}</w:p>", paragraph_properties));
    }
    out
}

/// Inner XML of the `<w:rPr>` of the run containing byte `pos`
fn enclosing_run_properties(paragraph: &str, pos: usize) -> &str {
    let before = &paragraph[..pos];
    let Some(run_start) = RUN_START_RE.find_iter(before).last().map(|m| m.start()) else {
        return "";
    };
    RUN_PROPS_RE
        .captures(&before[run_start..])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("")
}

/// Run properties for a rich run: the original properties with bold and
/// italic flags replaced, kept in schema order (after rStyle/rFonts).
fn rich_run_properties(original: &str, rich: &RichText) -> String {
    let children: Vec<(&str, &str)> = EMPTY_CHILD_RE
        .captures_iter(original)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(0)?.as_str())))
        .filter(|(name, _)| !matches!(*name, "b" | "bCs" | "i" | "iCs"))
        .collect();

    let mut flags = String::new();
    if rich.bold {
        flags.push_str("<w:b/><w:bCs/>");
    }
    if rich.italic {
        flags.push_str("<w:i/><w:iCs/>");
    }

    let split = children
        .iter()
        .rposition(|(name, _)| matches!(*name, "rStyle" | "rFonts"))
        .map(|p| p + 1)
        .unwrap_or(0);

    let mut out = String::new();
    for (_, child) in &children[..split] {
        out.push_str(child);
    }
    out.push_str(&flags);
    for (_, child) in &children[split..] {
        out.push_str(child);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PhotoGrid;
    use crate::inline::{test_images, InlineImage};
    use crate::package::CONTENT_TYPES_PART;
    use pretty_assertions::assert_eq;

    fn template(body: &str) -> DocxTemplate {
        DocxTemplate::from_package(DocxPackage::from_body_xml(body))
    }

    fn rendered_document(doc: &RenderedDocument) -> String {
        DocxPackage::from_bytes(doc.bytes())
            .unwrap()
            .part_str(DOCUMENT_PART)
            .unwrap()
    }

    fn image(name: &str) -> InlineImage {
        InlineImage::new(name, &test_images::png(4, 2), 60.0).unwrap()
    }

    #[test]
    fn test_simple_substitution() {
        let tpl = template(r#"<w:p><w:r><w:t>Заказчик: {{ customer_name }}</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("customer_name", "ООО <Ромашка> & Ко");

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains("Заказчик: ООО &lt;Ромашка&gt; &amp; Ко"));
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn test_placeholder_split_across_runs() {
        let tpl = template(concat!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Договор {{ contract_</w:t></w:r>"#,
            r#"<w:r><w:t>number }}</w:t></w:r><w:r><w:t xml:space="preserve"> от даты</w:t></w:r></w:p>"#
        ));
        let mut ctx = RenderContext::new();
        ctx.insert("contract_number", "42/2024");

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert_eq!(xml::visible_text(&xml), "Договор 42/2024 от даты");
        assert!(xml.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Договор 42/2024</w:t>"#));
    }

    #[test]
    fn test_multiline_text_uses_breaks() {
        let tpl = template(r#"<w:p><w:r><w:t>{{ appendix_1_summary }}</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("appendix_1_summary", "1. a.png\n2. b.pdf");

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains(r#"1. a.png</w:t><w:br/><w:t xml:space="preserve">2. b.pdf"#));
    }

    #[test]
    fn test_unbound_placeholder_renders_empty() {
        let tpl = template(r#"<w:p><w:r><w:t>[{{ missing }}]</w:t></w:r></w:p>"#);
        let xml = rendered_document(&tpl.render(&RenderContext::new()).unwrap());
        assert_eq!(xml::visible_text(&xml), "[]");
    }

    #[test]
    fn test_rich_text_gets_its_own_italic_run() {
        let tpl = template(concat!(
            r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Times New Roman"/><w:i w:val="0"/><w:sz w:val="24"/></w:rPr>"#,
            r#"<w:t>{{ a_source1 }}</w:t></w:r></w:p>"#
        ));
        let mut ctx = RenderContext::new();
        ctx.insert("a_source1", RichText::new("Источник информации: (auto.ru)").italic());

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains(concat!(
            r#"<w:rPr><w:rFonts w:ascii="Times New Roman"/><w:i/><w:iCs/><w:sz w:val="24"/></w:rPr>"#,
            r#"<w:t xml:space="preserve">Источник информации: (auto.ru)</w:t>"#
        )));
        assert_eq!(xml::visible_text(&xml), "Источник информации: (auto.ru)");
        assert_eq!(xml.matches("<w:p>").count(), 1);
    }

    #[test]
    fn test_photo_grid_replaces_paragraph() {
        let tpl = template(concat!(
            r#"<w:p><w:r><w:t>Фото</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>{{p object_ocenki }}</w:t></w:r></w:p>"#
        ));
        let mut ctx = RenderContext::new();
        ctx.insert(
            "object_ocenki",
            PhotoGrid::new(vec![image("1.png"), image("2.png"), image("3.png")], 2, None),
        );

        let doc = tpl.render(&ctx).unwrap();
        assert_eq!(doc.images_embedded(), 3);

        let xml = rendered_document(&doc);
        assert!(!xml.contains("object_ocenki"));
        assert_eq!(xml.matches("<w:tbl>").count(), 1);
        assert_eq!(xml.matches("<w:drawing>").count(), 3);

        let package = DocxPackage::from_bytes(doc.bytes()).unwrap();
        assert!(package.part("word/media/report_image3.png").is_some());
        assert!(package
            .part_str(CONTENT_TYPES_PART)
            .unwrap()
            .contains(r#"Extension="png""#));
    }

    #[test]
    fn test_empty_grid_message_keeps_paragraph_properties() {
        let tpl = template(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>{{ object_ocenki }}</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("object_ocenki", PhotoGrid::new(vec![], 2, Some("Нет фото".into())));

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">Нет фото</w:t></w:r></w:p>"#));
    }

    #[test]
    fn test_entries_expand_to_one_paragraph_each() {
        let tpl = template(r#"<w:p><w:r><w:t>{{ appendix_1_entries }}</w:t></w:r></w:p><w:p><w:r><w:t>конец</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("appendix_1_entries", vec![image("a.png"), image("b.png")]);

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert_eq!(xml.matches("<w:drawing>").count(), 2);
        assert_eq!(xml.matches("<w:p>").count(), 3);
    }

    #[test]
    fn test_empty_entries_remove_paragraph() {
        let tpl = template(r#"<w:p><w:r><w:t>{{ rights_entries }}</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("rights_entries", Vec::<InlineImage>::new());

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains("<w:body></w:body>"));
    }

    #[test]
    fn test_empty_block_in_cell_keeps_a_paragraph() {
        let tpl = template(concat!(
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr>"#,
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>{{ rights_entries }}</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>{{ object_analog2_photo }}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:r><w:t>{{ appendix_1_entries }}</w:t></w:r></w:p>"#
        ));
        let mut ctx = RenderContext::new();
        ctx.insert("rights_entries", Vec::<InlineImage>::new());
        ctx.insert("object_analog2_photo", PhotoGrid::blank());
        ctx.insert("appendix_1_entries", Vec::<InlineImage>::new());

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains(concat!(
            r#"</w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr></w:p></w:tc>"#,
            r#"<w:tc><w:p></w:p></w:tc></w:tr></w:tbl></w:body>"#
        )));
    }

    #[test]
    fn test_grid_in_cell_ends_with_a_paragraph() {
        let tpl = template(concat!(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{ object_ocenki }}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#
        ));
        let mut ctx = RenderContext::new();
        ctx.insert("object_ocenki", PhotoGrid::new(vec![image("1.png")], 2, None));

        let xml = rendered_document(&tpl.render(&ctx).unwrap());
        assert!(xml.contains("</w:tbl><w:p/></w:tc>"));
        assert!(!xml.contains("<w:p/><w:p>"));
    }

    #[test]
    fn test_block_value_inline_renders_empty() {
        let tpl = template(r#"<w:p><w:r><w:t>См. {{ object_ocenki }} выше</w:t></w:r></w:p>"#);
        let mut ctx = RenderContext::new();
        ctx.insert("object_ocenki", PhotoGrid::new(vec![image("a.png")], 2, None));

        let doc = tpl.render(&ctx).unwrap();
        assert_eq!(doc.images_embedded(), 0);
        assert_eq!(xml::visible_text(&rendered_document(&doc)), "См.  выше");
    }

    #[test]
    fn test_headers_get_text_substitution() {
        let mut package = DocxPackage::from_body_xml("<w:p/>");
        package.set_part(
            "word/header1.xml",
            r#"<w:hdr><w:p><w:r><w:t>Отчёт {{ otchet_number }}</w:t></w:r></w:p></w:hdr>"#.as_bytes().to_vec(),
        );
        let tpl = DocxTemplate::from_package(package);
        let mut ctx = RenderContext::new();
        ctx.insert("otchet_number", "17");

        let doc = tpl.render(&ctx).unwrap();
        let header = DocxPackage::from_bytes(doc.bytes())
            .unwrap()
            .part_str("word/header1.xml")
            .unwrap();
        assert!(header.contains("Отчёт 17"));
    }

    #[test]
    fn test_placeholders_listed() {
        let tpl = template(concat!(
            r#"<w:p><w:r><w:t>{{ date_ocenka }} / {{ date_</w:t></w:r><w:r><w:t>otcheta }}</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>{{p object_ocenki }}</w:t></w:r></w:p>"#
        ));
        let names: Vec<_> = tpl.placeholders().unwrap().into_iter().collect();
        assert_eq!(names, vec!["date_ocenka", "date_otcheta", "object_ocenki"]);
    }

    #[test]
    fn test_open_missing_template() {
        let err = DocxTemplate::open("/no/such/template.docx").unwrap_err();
        assert!(matches!(err, DocxError::TemplateNotFound(_)));
        assert!(err.to_string().contains("/no/such/template.docx"));
    }
}
