//! String-level WordprocessingML helpers
//!
//! Parts are scanned with a tag regex and edited by byte range. This is
//! enough for the well-formed XML Word writes; it is not a general parser.

use std::borrow::Cow;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// Any start, end or empty-element tag. Attribute values may contain `>`.
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z_][\w.:\-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("tag regex is valid")
});

/// A `<w:t>` element with its text content in group 1.
pub(crate) static WT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("w:t regex is valid")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(amp|lt|gt|quot|apos|#[0-9]+|#x[0-9A-Fa-f]+);").expect("entity regex is valid")
});

/// Location of one element inside a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementSpan {
    /// Byte range from `<` of the start tag to `>` of the end tag
    pub range: Range<usize>,
    /// Nesting depth (0 = document element)
    pub depth: usize,
}

/// Find every element with the given qualified name, sorted by start offset.
pub(crate) fn element_spans(xml: &str, name: &str) -> Vec<ElementSpan> {
    let mut spans = Vec::new();
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut stack: Vec<bool> = Vec::new();
    let mut depth = 0usize;

    for caps in TAG_RE.captures_iter(xml) {
        let Some(whole) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();
        let matches_name = &caps[2] == name;
        let self_closing = caps[3].ends_with('/');

        if closing {
            depth = depth.saturating_sub(1);
            if stack.pop().unwrap_or(false) {
                if let Some((start, d)) = open.pop() {
                    spans.push(ElementSpan {
                        range: start..whole.end(),
                        depth: d,
                    });
                }
            }
        } else if self_closing {
            if matches_name {
                spans.push(ElementSpan {
                    range: whole.range(),
                    depth,
                });
            }
        } else {
            if matches_name {
                open.push((whole.start(), depth));
            }
            stack.push(matches_name);
            depth += 1;
        }
    }

    spans.sort_by_key(|s| s.range.start);
    spans
}

/// Paragraph ranges that contain no other paragraph (text-box content
/// nests paragraphs inside paragraphs). The returned ranges never overlap.
pub(crate) fn leaf_paragraphs(xml: &str) -> Vec<Range<usize>> {
    let spans = element_spans(xml, "w:p");
    spans
        .iter()
        .enumerate()
        .filter(|(i, span)| match spans.get(i + 1) {
            Some(next) => next.range.start >= span.range.end,
            None => true,
        })
        .map(|(_, span)| span.range.clone())
        .collect()
}

/// The first element with the given name, as a slice of `xml`.
pub(crate) fn first_element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    element_spans(xml, name)
        .into_iter()
        .next()
        .map(|span| &xml[span.range])
}

/// Concatenated, unescaped `<w:t>` text of a fragment.
pub(crate) fn visible_text(xml: &str) -> String {
    WT_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .collect()
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        push_escaped(&mut out, ch);
    }
    out
}

pub(crate) fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        c => out.push(c),
    }
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_text(text)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub(crate) fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let entity = &caps[1];
        match entity {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            numeric => {
                let code = match numeric.strip_prefix("#x") {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => numeric[1..].parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            }
        }
    })
}
