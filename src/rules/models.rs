//! Rule set and card option models

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockType};
use crate::error::PolicyViolation;

/// Where a note's tags come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// Headings rendered inside the card
    #[default]
    Heading,
    /// Struck-through text inside the card
    Strikethrough,
    /// No tags
    None,
}

/// How a collection of pages is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPolicy {
    /// Only the first member page contributes decks
    #[default]
    FirstMember,
    /// Every member page contributes decks, in query order
    MergeAll,
}

/// Role a block plays at one traversal level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Card,
    SubDeck,
}

/// Parser rules: which blocks become cards and which become sub-decks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "default_card_types")]
    pub card_types: Vec<BlockType>,
    #[serde(default = "default_sub_deck_types")]
    pub sub_deck_types: Vec<BlockType>,
    /// Build a deck from the card blocks directly on a page
    #[serde(default = "default_true")]
    pub deck_from_page: bool,
    /// Follow pagination when listing children
    #[serde(default)]
    pub unlimited: bool,
    /// Use the second column of a column list as the answer
    #[serde(default)]
    pub use_columns: bool,
    #[serde(default)]
    pub tag_source: TagSource,
    /// `{parent}` and `{name}` are substituted
    #[serde(default = "default_deck_name_template")]
    pub deck_name_template: String,
    #[serde(default)]
    pub collection_policy: CollectionPolicy,
    /// Deepest page nesting followed; `None` means no cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

fn default_card_types() -> Vec<BlockType> {
    vec![BlockType::Toggle]
}

fn default_sub_deck_types() -> Vec<BlockType> {
    vec![BlockType::ChildPage]
}

fn default_true() -> bool {
    true
}

pub fn default_deck_name_template() -> String {
    "{parent}::{name}".to_string()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            card_types: default_card_types(),
            sub_deck_types: default_sub_deck_types(),
            deck_from_page: true,
            unlimited: false,
            use_columns: false,
            tag_source: TagSource::default(),
            deck_name_template: default_deck_name_template(),
            collection_policy: CollectionPolicy::default(),
            max_depth: None,
        }
    }
}

impl RuleSet {
    pub fn is_card_type(&self, block_type: BlockType) -> bool {
        self.card_types.contains(&block_type)
    }

    pub fn is_sub_deck_type(&self, block_type: BlockType) -> bool {
        self.sub_deck_types.contains(&block_type)
    }

    /// Classify a block for one traversal level.
    ///
    /// A type listed in both sets is a card; the sub-deck check only
    /// runs for blocks that are not cards.
    pub fn classify(&self, block: &Block) -> Option<BlockRole> {
        let block_type = block.block_type();
        if self.is_card_type(block_type) {
            Some(BlockRole::Card)
        } else if self.is_sub_deck_type(block_type) {
            Some(BlockRole::SubDeck)
        } else {
            None
        }
    }

    /// Split blocks into (cards, sub-decks), keeping document order within each
    pub fn partition<'a>(&self, blocks: &'a [Block]) -> (Vec<&'a Block>, Vec<&'a Block>) {
        let mut cards = Vec::new();
        let mut sub_decks = Vec::new();
        for block in blocks {
            match self.classify(block) {
                Some(BlockRole::Card) => cards.push(block),
                Some(BlockRole::SubDeck) => sub_decks.push(block),
                None => {}
            }
        }
        (cards, sub_decks)
    }

    pub fn validate(&self) -> Result<(), PolicyViolation> {
        if !self.deck_name_template.contains("{name}") {
            return Err(PolicyViolation::NamingTemplate(
                self.deck_name_template.clone(),
            ));
        }
        let mut seen = HashSet::new();
        for card_type in &self.card_types {
            if !seen.insert(card_type) {
                return Err(PolicyViolation::DuplicateCardType(
                    card_type.api_name().to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Resolved conversion settings, carried on every deck built with them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardOptions {
    /// Overrides the derived name of top-level decks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_name: Option<String>,
    /// Descend into sub-deck blocks
    #[serde(default = "default_true")]
    pub descend_sub_decks: bool,
    /// Add a reversed copy of every basic card
    #[serde(default)]
    pub basic_reversed: bool,
    #[serde(default = "default_true")]
    pub cloze: bool,
    #[serde(default)]
    pub input: bool,
    /// Keep only notes marked with a cherry
    #[serde(default)]
    pub cherry: bool,
    /// Drop notes marked with an avocado
    #[serde(default)]
    pub avocado: bool,
    #[serde(default)]
    pub add_source_link: bool,
    #[serde(default)]
    pub use_source_id: bool,
    /// Replace note tags with the page's top-level tags plus their own
    #[serde(default)]
    pub merge_tags: bool,
    #[serde(default)]
    pub preserve_newlines: bool,
    /// Render backs as plain text without media
    #[serde(default)]
    pub text_only_back: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    100
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            deck_name: None,
            descend_sub_decks: true,
            basic_reversed: false,
            cloze: true,
            input: false,
            cherry: false,
            avocado: false,
            add_source_link: false,
            use_source_id: false,
            merge_tags: false,
            preserve_newlines: false,
            text_only_back: false,
            page_size: default_page_size(),
        }
    }
}

impl CardOptions {
    pub fn validate(&self) -> Result<(), PolicyViolation> {
        if self.page_size == 0 || self.page_size > 100 {
            return Err(PolicyViolation::PageSize(self.page_size));
        }
        Ok(())
    }
}
