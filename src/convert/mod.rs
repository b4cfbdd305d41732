//! Block tree to deck conversion
//!
//! This module provides:
//! - Per-card scopes for tags and media
//! - Cloze and input marker handling
//! - Card composition with reversal, filters and tag merging
//! - Tree traversal over pages, collections and sub-decks

pub mod composer;
pub mod markers;
pub mod scope;
pub mod walker;

pub use composer::{sanitize_tag, source_link, CardComposer};
pub use markers::{apply_cloze, apply_input, INPUT_BLANK};
pub use scope::{media_file_name, CardScope, MediaBuffer, TagRegistry};
pub use walker::{Locator, NodeRole, TreeWalker};

use tokio_util::sync::CancellationToken;

use crate::deck::Deck;
use crate::error::ConversionError;
use crate::render::Renderer;
use crate::rules::ConversionConfig;
use crate::source::{AssetFetcher, DocumentSource};

/// Result of one conversion run
#[derive(Debug, Clone)]
pub struct Conversion {
    pub decks: Vec<Deck>,
    /// Title of the first page reached, used to name the output
    pub first_page_title: Option<String>,
}

impl Conversion {
    pub fn note_count(&self) -> usize {
        self.decks.iter().map(|d| d.notes.len()).sum()
    }
}

/// Convert the tree below `root_id` into decks.
///
/// The config is validated first. Cancelling `cancel` stops the run at the
/// next step and discards everything built so far.
pub async fn convert(
    source: &dyn DocumentSource,
    assets: &dyn AssetFetcher,
    config: &ConversionConfig,
    root_id: &str,
    role: NodeRole,
    cancel: &CancellationToken,
) -> Result<Conversion, ConversionError> {
    config.validate()?;
    log::info!("Converting {} ({:?})", root_id, role);

    let renderer = Renderer::new(source, assets, config);
    let mut walker = TreeWalker::new(source, &renderer, config, cancel);
    let decks = walker.traverse(Locator::root(root_id, role)).await?;
    let conversion = Conversion {
        decks,
        first_page_title: walker.first_page_title().map(str::to_string),
    };
    log::info!(
        "Converted {} into {} decks with {} notes",
        root_id,
        conversion.decks.len(),
        conversion.note_count()
    );
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Block, BlockKind, TextContent};
    use crate::error::PolicyViolation;
    use crate::source::{MemorySource, NoAssets};

    #[tokio::test]
    async fn test_convert_reports_first_page_title() {
        let source = MemorySource::new()
            .page("root", "Biology")
            .children(
                "root",
                vec![Block::new("t", BlockKind::Toggle(TextContent::plain("Q")))],
            );
        let conversion = convert(
            &source,
            &NoAssets,
            &ConversionConfig::default(),
            "root",
            NodeRole::Page,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(conversion.first_page_title.as_deref(), Some("Biology"));
        assert_eq!(conversion.note_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_fetching() {
        let source = MemorySource::new();
        let mut config = ConversionConfig::default();
        config.options.page_size = 0;

        let result = convert(
            &source,
            &NoAssets,
            &config,
            "root",
            NodeRole::Page,
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(ConversionError::Policy(PolicyViolation::PageSize(0)))
        ));
        assert_eq!(source.fetch_count(), 0);
    }
}
