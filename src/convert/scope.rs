//! Per-card accumulators
//!
//! A [`CardScope`] is created for each candidate block, filled while its
//! front and back render, and consumed when the note is finalized, so tags
//! and media can never carry over into the next card.

use crate::deck::MediaItem;
use crate::rules::TagSource;

/// Tags discovered while rendering one card
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagRegistry {
    headings: Vec<String>,
    strikethroughs: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_heading(&mut self, text: &str) {
        push_unique(&mut self.headings, text);
    }

    pub fn add_strikethrough(&mut self, text: &str) {
        push_unique(&mut self.strikethroughs, text);
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn strikethroughs(&self) -> &[String] {
        &self.strikethroughs
    }

    /// Tags to attach to the note under the given policy
    pub fn tags_for(&self, source: TagSource) -> Vec<String> {
        match source {
            TagSource::Heading => self.headings.clone(),
            TagSource::Strikethrough => self.strikethroughs.clone(),
            TagSource::None => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.headings.clear();
        self.strikethroughs.clear();
    }
}

/// Media staged for the card currently being composed
#[derive(Debug, Default, Clone)]
pub struct MediaBuffer {
    items: Vec<MediaItem>,
}

impl MediaBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.items.iter().any(|item| item.filename == filename)
    }

    /// Stage a file; a filename already staged for this card is not stored twice
    pub fn attach(&mut self, filename: String, bytes: Vec<u8>) -> bool {
        if self.contains(&filename) {
            return false;
        }
        self.items.push(MediaItem { filename, bytes });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move everything staged out of the buffer, leaving it empty
    pub fn drain(&mut self) -> Vec<MediaItem> {
        std::mem::take(&mut self.items)
    }
}

/// Everything one card accumulates while rendering
#[derive(Debug, Default)]
pub struct CardScope {
    pub tags: TagRegistry,
    pub media: MediaBuffer,
}

impl CardScope {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stable media filename for an asset URL.
///
/// Signed query strings are ignored so the same asset maps to one name;
/// the path's extension is kept so players recognize the file type.
pub fn media_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let hash = format!("{:x}", md5::compute(without_query.as_bytes()));

    let last_segment = without_query.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(last_segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last_segment.to_string());
    let suffix = decoded
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });

    match suffix {
        Some(ext) => format!("{}.{}", hash, ext),
        None => hash,
    }
}
