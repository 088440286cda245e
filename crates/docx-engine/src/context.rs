//! Render context: placeholder name to polymorphic value

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::PhotoGrid;
use crate::inline::InlineImage;

/// A run of text carrying its own character formatting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub text: String,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
}

impl RichText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: false,
            bold: false,
        }
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Value bound to a placeholder
///
/// `Text` and `RichText` are inline values. `SubDocument` and `Entries`
/// are block values: they replace the whole paragraph holding the
/// placeholder.
#[derive(Debug, Clone)]
pub enum RenderValue {
    Text(String),
    RichText(RichText),
    SubDocument(PhotoGrid),
    Entries(Vec<InlineImage>),
}

impl RenderValue {
    pub fn is_block(&self) -> bool {
        matches!(self, RenderValue::SubDocument(_) | RenderValue::Entries(_))
    }

    /// Plain text of an inline value, `None` for block values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderValue::Text(text) => Some(text),
            RenderValue::RichText(rich) => Some(&rich.text),
            _ => None,
        }
    }
}

impl From<String> for RenderValue {
    fn from(value: String) -> Self {
        RenderValue::Text(value)
    }
}

impl From<&str> for RenderValue {
    fn from(value: &str) -> Self {
        RenderValue::Text(value.to_string())
    }
}

impl From<RichText> for RenderValue {
    fn from(value: RichText) -> Self {
        RenderValue::RichText(value)
    }
}

impl From<PhotoGrid> for RenderValue {
    fn from(value: PhotoGrid) -> Self {
        RenderValue::SubDocument(value)
    }
}

impl From<Vec<InlineImage>> for RenderValue {
    fn from(value: Vec<InlineImage>) -> Self {
        RenderValue::Entries(value)
    }
}

/// Mapping consumed by [`crate::DocxTemplate::render`]
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: BTreeMap<String, RenderValue>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any previous binding for `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RenderValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RenderValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RenderValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
