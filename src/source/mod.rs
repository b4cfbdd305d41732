//! Remote document access
//!
//! The converter only talks to the outside world through the two traits
//! here: [`DocumentSource`] for the block tree and [`AssetFetcher`] for
//! embedded media bytes.

pub mod memory;
pub mod notion;

use async_trait::async_trait;

use crate::blocks::{Block, BlockKind, CollectionEntry, PageMetadata};
use crate::error::RemoteFetchError;
use crate::rules::{RuleSet, TagSource};

pub use memory::{MemoryAssets, MemorySource, NoAssets};
pub use notion::{HttpAssetFetcher, NotionClient};

pub type FetchResult<T> = std::result::Result<T, RemoteFetchError>;

/// Read-only, paginated access to a document tree
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Direct children of a node, in document order.
    ///
    /// Without `unlimited` only the first page of results is returned.
    async fn get_children(&self, node_id: &str, unlimited: bool) -> FetchResult<Vec<Block>>;

    async fn get_page(&self, node_id: &str) -> FetchResult<PageMetadata>;

    /// Member pages of a collection, in query order
    async fn query_collection(&self, collection_id: &str) -> FetchResult<Vec<CollectionEntry>>;

    async fn get_collection_title(&self, collection_id: &str) -> FetchResult<String>;

    /// Tags that apply to every card found under a node
    async fn get_top_level_tags(&self, node_id: &str, rules: &RuleSet) -> FetchResult<Vec<String>> {
        if rules.tag_source == TagSource::None {
            return Ok(Vec::new());
        }
        let blocks = self.get_children(node_id, rules.unlimited).await?;
        Ok(top_level_tags(&blocks, rules.tag_source))
    }
}

/// Fetches the raw bytes of an embedded asset
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>>;
}

/// Tags declared by a page's own top-level blocks
pub fn top_level_tags(blocks: &[Block], source: TagSource) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for block in blocks {
        let candidates: Vec<String> = match source {
            TagSource::Heading if block.is_heading() => block
                .text()
                .map(|t| vec![t.plain_text()])
                .unwrap_or_default(),
            TagSource::Strikethrough => match &block.kind {
                BlockKind::Paragraph(t)
                | BlockKind::Quote(t)
                | BlockKind::Callout { text: t, .. } => t
                    .rich_text
                    .iter()
                    .filter(|rt| rt.annotations.strikethrough)
                    .map(|rt| rt.plain_text.clone())
                    .collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        for tag in candidates {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Strip dashes so ids from links and from the API compare equal
pub fn normalize_id(id: &str) -> String {
    id.replace('-', "")
}
