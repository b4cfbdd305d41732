//! Data models for generated decks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::CardOptions;

/// Front marker asking for a reversed companion card
pub const REFRESH_MARKER: &str = "\u{1F504}";
/// Marker for the keep-only filter
pub const CHERRY_MARKER: &str = "\u{1F352}";
/// Marker for the drop filter
pub const AVOCADO_MARKER: &str = "\u{1F951}";

/// How a note is studied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum NoteVariant {
    /// Question on the front, answer revealed on the back
    #[default]
    Basic,
    /// Answer embedded as fill-in-the-blank deletions
    Cloze,
    /// Answer typed in before the back is shown
    Input,
}

/// An embedded file shipped alongside a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A single flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Position within the deck
    pub ordinal: usize,
    #[serde(default)]
    pub variant: NoteVariant,
}

impl Note {
    pub fn new(front: String, back: String) -> Self {
        Self {
            front,
            back,
            tags: Vec::new(),
            media: Vec::new(),
            source_link: None,
            source_id: None,
            ordinal: 0,
            variant: NoteVariant::default(),
        }
    }

    pub fn has_refresh_marker(&self) -> bool {
        self.front.contains(REFRESH_MARKER)
    }

    pub fn has_cherry(&self) -> bool {
        self.front.contains(CHERRY_MARKER) || self.back.contains(CHERRY_MARKER)
    }

    pub fn has_avocado(&self) -> bool {
        self.front.contains(AVOCADO_MARKER) || self.back.contains(AVOCADO_MARKER)
    }

    /// A note with neither side filled in cannot be packaged
    pub fn is_empty(&self) -> bool {
        self.front.trim().is_empty() && self.back.trim().is_empty()
    }

    /// Companion card with the sides swapped
    pub fn reversed(&self) -> Self {
        Self {
            front: self.back.clone(),
            back: self.front.clone(),
            ordinal: self.ordinal + 1,
            ..self.clone()
        }
    }
}

/// A named collection of notes, as handed to the packaging sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    pub notes: Vec<Note>,
    pub style: String,
    pub settings: CardOptions,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn media(&self) -> impl Iterator<Item = &MediaItem> {
        self.notes.iter().flat_map(|note| note.media.iter())
    }
}
