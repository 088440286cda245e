//! Analog object slots
//!
//! Slots are stored by a stable id drawn from a counter that only grows,
//! while the display index is the 1-based position among live slots.
//! Titles, sources and uploads are keyed by id, so removing a slot in the
//! middle renumbers the rest without touching what the user typed.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::upload::{normalize_uploads, RawUpload, UploadedAttachment};

/// The template holds this many analog sections
pub const MAX_ANALOGS: usize = 10;

/// Heading of an analog section, with its number in group 1
pub(crate) static ANALOG_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)объект\s*-\s*аналог\s*№\s*(\d+)").expect("analog marker regex is valid")
});

/// Title used for a slot the user left untitled. The post-render cleanup
/// looks for the same wording.
pub fn default_analog_title(index: usize) -> String {
    format!("Объект-аналог № {}", index)
}

/// Section heading for slot `index`: the title itself when its first
/// marker already names this slot, otherwise the marker and then the title.
pub fn analog_heading(index: usize, title: &str) -> String {
    let numbered = ANALOG_MARKER_RE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        == Some(index);
    if numbered {
        title.to_string()
    } else {
        format!("{}. {}", default_analog_title(index), title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogCollection {
    live: Vec<u32>,
    counter: u32,
    #[serde(default)]
    titles: BTreeMap<u32, String>,
    #[serde(default)]
    sources: BTreeMap<u32, String>,
    #[serde(default)]
    uploads: BTreeMap<u32, Vec<RawUpload>>,
}

/// One live slot resolved for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogSnapshot {
    pub index: usize,
    pub slot_id: u32,
    pub title: String,
    pub source: String,
    pub files: Vec<UploadedAttachment>,
    pub failures: Vec<String>,
}

impl AnalogCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new slot. Returns `None` when all slots are in use.
    pub fn add(&mut self) -> Option<u32> {
        if self.live.len() >= MAX_ANALOGS {
            debug!("Analog limit of {} reached", MAX_ANALOGS);
            return None;
        }
        self.counter += 1;
        self.live.push(self.counter);
        info!("Added analog slot {}", self.counter);
        Some(self.counter)
    }

    /// Remove a slot and everything stored for it
    pub fn remove(&mut self, slot_id: u32) -> bool {
        let Some(pos) = self.live.iter().position(|&id| id == slot_id) else {
            return false;
        };
        self.live.remove(pos);
        self.titles.remove(&slot_id);
        self.sources.remove(&slot_id);
        self.uploads.remove(&slot_id);
        info!("Removed analog slot {}", slot_id);
        true
    }

    pub fn set_title(&mut self, slot_id: u32, title: impl Into<String>) -> bool {
        self.set_field(slot_id, |c| &mut c.titles, title.into())
    }

    pub fn set_source(&mut self, slot_id: u32, source: impl Into<String>) -> bool {
        self.set_field(slot_id, |c| &mut c.sources, source.into())
    }

    pub fn set_uploads(&mut self, slot_id: u32, uploads: Vec<RawUpload>) -> bool {
        self.set_field(slot_id, |c| &mut c.uploads, uploads)
    }

    fn set_field<T>(
        &mut self,
        slot_id: u32,
        map: impl FnOnce(&mut Self) -> &mut BTreeMap<u32, T>,
        value: T,
    ) -> bool {
        if !self.live.contains(&slot_id) {
            return false;
        }
        map(self).insert(slot_id, value);
        true
    }

    pub fn slot_ids(&self) -> &[u32] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// 1-based position of a live slot
    pub fn display_index(&self, slot_id: u32) -> Option<usize> {
        self.live.iter().position(|&id| id == slot_id).map(|p| p + 1)
    }

    pub fn title(&self, slot_id: u32) -> Option<&str> {
        self.titles.get(&slot_id).map(String::as_str)
    }

    pub fn source(&self, slot_id: u32) -> Option<&str> {
        self.sources.get(&slot_id).map(String::as_str)
    }

    pub fn uploads(&self, slot_id: u32) -> &[RawUpload] {
        self.uploads.get(&slot_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn snapshot_for_render(&self) -> Vec<AnalogSnapshot> {
        self.live
            .iter()
            .enumerate()
            .map(|(pos, &slot_id)| {
                let index = pos + 1;
                let title = match self.titles.get(&slot_id).map(|t| t.trim()) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => default_analog_title(index),
                };
                let source = self
                    .sources
                    .get(&slot_id)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                let uploads = normalize_uploads(self.uploads(slot_id));

                AnalogSnapshot {
                    index,
                    slot_id,
                    title,
                    source,
                    files: uploads.accepted,
                    failures: uploads.failures,
                }
            })
            .collect()
    }
}
