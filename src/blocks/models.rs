//! Data models for document blocks

use serde::{Deserialize, Serialize};

/// Formatting flags on a run of rich text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: default_color(),
        }
    }
}

pub fn default_color() -> String {
    "default".to_string()
}

/// A run of text sharing one set of annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub plain_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            href: None,
            annotations: Annotations::default(),
        }
    }

    pub fn code(text: impl Into<String>) -> Self {
        let mut rt = Self::plain(text);
        rt.annotations.code = true;
        rt
    }

    pub fn strikethrough(text: impl Into<String>) -> Self {
        let mut rt = Self::plain(text);
        rt.annotations.strikethrough = true;
        rt
    }
}

/// Text payload shared by most text-bearing blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub rich_text: Vec<RichText>,
    #[serde(default = "default_color")]
    pub color: String,
}

impl TextContent {
    pub fn new(rich_text: Vec<RichText>) -> Self {
        Self {
            rich_text,
            color: default_color(),
        }
    }

    /// Convenience for a single unformatted run
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![RichText::plain(text)])
    }

    /// Concatenated plain text of all runs
    pub fn plain_text(&self) -> String {
        self.rich_text.iter().map(|rt| rt.plain_text.as_str()).collect()
    }
}

/// Where an embedded file lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichText>,
}

impl FileRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: Vec::new(),
        }
    }
}

/// The closed set of block kinds the converter understands.
///
/// Kinds the document API adds later arrive as `Unsupported` and are
/// rendered as nothing, never guessed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph(TextContent),
    Heading1(TextContent),
    Heading2(TextContent),
    Heading3(TextContent),
    BulletedListItem(TextContent),
    NumberedListItem(TextContent),
    ToDo { text: TextContent, checked: bool },
    Toggle(TextContent),
    Quote(TextContent),
    Callout { text: TextContent, icon: Option<String> },
    Code { text: TextContent, language: String },
    Equation { expression: String },
    Divider,
    Image(FileRef),
    Audio(FileRef),
    File(FileRef),
    Pdf(FileRef),
    Video(FileRef),
    Bookmark { url: String },
    ColumnList,
    Column,
    ChildPage { title: String },
    ChildDatabase { title: String },
    LinkToPage { page_id: String },
    Unsupported { type_name: String },
}

/// Fieldless mirror of [`BlockKind`], used by rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    #[serde(rename = "heading_1")]
    Heading1,
    #[serde(rename = "heading_2")]
    Heading2,
    #[serde(rename = "heading_3")]
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Code,
    Equation,
    Divider,
    Image,
    Audio,
    File,
    Pdf,
    Video,
    Bookmark,
    ColumnList,
    Column,
    ChildPage,
    ChildDatabase,
    LinkToPage,
    Unsupported,
}

impl BlockType {
    /// Name used by the document API for this block type
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::BulletedListItem => "bulleted_list_item",
            Self::NumberedListItem => "numbered_list_item",
            Self::ToDo => "to_do",
            Self::Toggle => "toggle",
            Self::Quote => "quote",
            Self::Callout => "callout",
            Self::Code => "code",
            Self::Equation => "equation",
            Self::Divider => "divider",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::Bookmark => "bookmark",
            Self::ColumnList => "column_list",
            Self::Column => "column",
            Self::ChildPage => "child_page",
            Self::ChildDatabase => "child_database",
            Self::LinkToPage => "link_to_page",
            Self::Unsupported => "unsupported",
        }
    }
}

/// One node of the document's content tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_children: false,
        }
    }

    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }

    pub fn block_type(&self) -> BlockType {
        match &self.kind {
            BlockKind::Paragraph(_) => BlockType::Paragraph,
            BlockKind::Heading1(_) => BlockType::Heading1,
            BlockKind::Heading2(_) => BlockType::Heading2,
            BlockKind::Heading3(_) => BlockType::Heading3,
            BlockKind::BulletedListItem(_) => BlockType::BulletedListItem,
            BlockKind::NumberedListItem(_) => BlockType::NumberedListItem,
            BlockKind::ToDo { .. } => BlockType::ToDo,
            BlockKind::Toggle(_) => BlockType::Toggle,
            BlockKind::Quote(_) => BlockType::Quote,
            BlockKind::Callout { .. } => BlockType::Callout,
            BlockKind::Code { .. } => BlockType::Code,
            BlockKind::Equation { .. } => BlockType::Equation,
            BlockKind::Divider => BlockType::Divider,
            BlockKind::Image(_) => BlockType::Image,
            BlockKind::Audio(_) => BlockType::Audio,
            BlockKind::File(_) => BlockType::File,
            BlockKind::Pdf(_) => BlockType::Pdf,
            BlockKind::Video(_) => BlockType::Video,
            BlockKind::Bookmark { .. } => BlockType::Bookmark,
            BlockKind::ColumnList => BlockType::ColumnList,
            BlockKind::Column => BlockType::Column,
            BlockKind::ChildPage { .. } => BlockType::ChildPage,
            BlockKind::ChildDatabase { .. } => BlockType::ChildDatabase,
            BlockKind::LinkToPage { .. } => BlockType::LinkToPage,
            BlockKind::Unsupported { .. } => BlockType::Unsupported,
        }
    }

    /// The block's own rich text, for kinds that carry any
    pub fn text(&self) -> Option<&TextContent> {
        match &self.kind {
            BlockKind::Paragraph(t)
            | BlockKind::Heading1(t)
            | BlockKind::Heading2(t)
            | BlockKind::Heading3(t)
            | BlockKind::BulletedListItem(t)
            | BlockKind::NumberedListItem(t)
            | BlockKind::Toggle(t)
            | BlockKind::Quote(t) => Some(t),
            BlockKind::ToDo { text, .. }
            | BlockKind::Callout { text, .. }
            | BlockKind::Code { text, .. } => Some(text),
            BlockKind::Equation { .. }
            | BlockKind::Divider
            | BlockKind::Image(_)
            | BlockKind::Audio(_)
            | BlockKind::File(_)
            | BlockKind::Pdf(_)
            | BlockKind::Video(_)
            | BlockKind::Bookmark { .. }
            | BlockKind::ColumnList
            | BlockKind::Column
            | BlockKind::ChildPage { .. }
            | BlockKind::ChildDatabase { .. }
            | BlockKind::LinkToPage { .. }
            | BlockKind::Unsupported { .. } => None,
        }
    }

    pub fn is_column_list(&self) -> bool {
        matches!(self.kind, BlockKind::ColumnList)
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::Heading1(_) | BlockKind::Heading2(_) | BlockKind::Heading3(_)
        )
    }

    /// Whether this block stands for a separate page that is traversed on its own
    pub fn is_page_reference(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::ChildPage { .. } | BlockKind::LinkToPage { .. }
        )
    }

    pub fn is_collection_reference(&self) -> bool {
        matches!(self.kind, BlockKind::ChildDatabase { .. })
    }

    /// Node id to traverse when this block refers to another page
    pub fn referenced_page_id(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::ChildPage { .. } => Some(&self.id),
            BlockKind::LinkToPage { page_id } => Some(page_id),
            _ => None,
        }
    }

    /// Display title used when this block becomes a sub-deck
    pub fn sub_deck_title(&self) -> Option<String> {
        let title = match &self.kind {
            BlockKind::ChildPage { title } | BlockKind::ChildDatabase { title } => title.clone(),
            _ => self.text()?.plain_text(),
        };
        let title = title.trim().to_string();
        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }
}

/// Metadata of a page-like node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Member entry returned by a collection query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: String,
}
