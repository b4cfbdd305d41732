//! In-memory document source
//!
//! Deterministic stand-in for the remote API. Used by tests and by
//! callers that already hold a block tree.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{AssetFetcher, DocumentSource, FetchResult};
use crate::blocks::{Block, CollectionEntry, PageMetadata};
use crate::error::RemoteFetchError;

#[derive(Debug, Default)]
pub struct MemorySource {
    children: HashMap<String, Vec<Block>>,
    pages: HashMap<String, PageMetadata>,
    collections: HashMap<String, (String, Vec<String>)>,
    failing: HashSet<String>,
    page_size: Option<usize>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page with its title
    pub fn page(mut self, id: &str, title: &str) -> Self {
        self.pages.insert(
            id.to_string(),
            PageMetadata {
                id: id.to_string(),
                title: title.to_string(),
                url: Some(format!("https://www.notion.so/{}", id)),
            },
        );
        self
    }

    /// Set the children of a node
    pub fn children(mut self, parent_id: &str, blocks: Vec<Block>) -> Self {
        self.children.insert(parent_id.to_string(), blocks);
        self
    }

    /// Register a collection with its title and member page ids
    pub fn collection(mut self, id: &str, title: &str, members: &[&str]) -> Self {
        self.collections.insert(
            id.to_string(),
            (
                title.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            ),
        );
        self
    }

    /// Every fetch touching this node fails
    pub fn fail_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Cap on children returned when `unlimited` is not set
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Number of remote calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check(&self, id: &str) -> FetchResult<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(id) {
            return Err(RemoteFetchError::Server {
                status: 502,
                message: format!("injected failure for {}", id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn get_children(&self, node_id: &str, unlimited: bool) -> FetchResult<Vec<Block>> {
        self.check(node_id)?;
        let mut blocks: Vec<Block> = self
            .children
            .get(node_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|block| {
                let has_children = block.has_children || self.children.contains_key(&block.id);
                block.with_children(has_children)
            })
            .collect();
        if let (false, Some(size)) = (unlimited, self.page_size) {
            blocks.truncate(size);
        }
        Ok(blocks)
    }

    async fn get_page(&self, node_id: &str) -> FetchResult<PageMetadata> {
        self.check(node_id)?;
        self.pages
            .get(node_id)
            .cloned()
            .ok_or_else(|| RemoteFetchError::NotFound(node_id.to_string()))
    }

    async fn query_collection(&self, collection_id: &str) -> FetchResult<Vec<CollectionEntry>> {
        self.check(collection_id)?;
        self.collections
            .get(collection_id)
            .map(|(_, members)| {
                members
                    .iter()
                    .map(|id| CollectionEntry { id: id.clone() })
                    .collect()
            })
            .ok_or_else(|| RemoteFetchError::NotFound(collection_id.to_string()))
    }

    async fn get_collection_title(&self, collection_id: &str) -> FetchResult<String> {
        self.check(collection_id)?;
        self.collections
            .get(collection_id)
            .map(|(title, _)| title.clone())
            .ok_or_else(|| RemoteFetchError::NotFound(collection_id.to_string()))
    }
}

/// Asset fetcher serving bytes from a map
#[derive(Debug, Default)]
pub struct MemoryAssets {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(mut self, url: &str, bytes: &[u8]) -> Self {
        self.assets.insert(url.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl AssetFetcher for MemoryAssets {
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteFetchError::NotFound(url.to_string()))
    }
}

/// Asset fetcher that has nothing to serve
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

#[async_trait]
impl AssetFetcher for NoAssets {
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        Err(RemoteFetchError::NotFound(url.to_string()))
    }
}
