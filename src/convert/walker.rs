//! Tree traversal
//!
//! Walks pages and collections depth-first, building one deck per page
//! and per container sub-deck, in discovery order. A node is visited at
//! most once per run, so linked views that point back up the tree
//! terminate.

use std::collections::HashSet;

use futures_util::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use super::composer::CardComposer;
use crate::blocks::Block;
use crate::deck::{assemble, combine_names, Deck, DeckNamer, DECK_STYLE};
use crate::error::ConversionError;
use crate::render::Renderer;
use crate::rules::{BlockRole, CollectionPolicy, ConversionConfig};
use crate::source::{normalize_id, top_level_tags, DocumentSource};

type Result<T> = std::result::Result<T, ConversionError>;

/// What kind of node a traversal starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Page,
    Collection,
}

/// Where a traversal step starts and the deck name it nests under
#[derive(Debug, Clone)]
pub struct Locator {
    pub node_id: String,
    pub role: NodeRole,
    pub lineage: Option<String>,
    pub depth: usize,
    /// Set only on the node the run starts from
    pub origin: bool,
}

impl Locator {
    pub fn root(node_id: impl Into<String>, role: NodeRole) -> Self {
        Self {
            node_id: node_id.into(),
            role,
            lineage: None,
            depth: 0,
            origin: true,
        }
    }

    fn child(&self, node_id: impl Into<String>, role: NodeRole, lineage: Option<String>) -> Self {
        Self {
            node_id: node_id.into(),
            role,
            lineage,
            depth: self.depth + 1,
            origin: false,
        }
    }
}

pub struct TreeWalker<'a> {
    source: &'a dyn DocumentSource,
    renderer: &'a Renderer<'a>,
    config: &'a ConversionConfig,
    cancel: &'a CancellationToken,
    namer: DeckNamer,
    visited: HashSet<String>,
    first_page_title: Option<String>,
    decks: Vec<Deck>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        renderer: &'a Renderer<'a>,
        config: &'a ConversionConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            source,
            renderer,
            config,
            cancel,
            namer: DeckNamer::new(&config.rules.deck_name_template),
            visited: HashSet::new(),
            first_page_title: None,
            decks: Vec::new(),
        }
    }

    /// Title of the first page seen during the run
    pub fn first_page_title(&self) -> Option<&str> {
        self.first_page_title.as_deref()
    }

    /// Traverse from the origin and hand back every deck built.
    ///
    /// Failing to fetch the origin fails the run; failures below it only
    /// drop the affected branch.
    pub async fn traverse(&mut self, origin: Locator) -> Result<Vec<Deck>> {
        self.step(origin).await?;
        Ok(std::mem::take(&mut self.decks))
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ConversionError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn step(&mut self, locator: Locator) -> BoxFuture<'_, Result<()>> {
        async move {
            self.checkpoint()?;
            if let Some(max) = self.config.rules.max_depth {
                if locator.depth > max {
                    log::debug!(
                        "Not descending into {}: depth {} exceeds {}",
                        locator.node_id,
                        locator.depth,
                        max
                    );
                    return Ok(());
                }
            }
            if !self.visited.insert(normalize_id(&locator.node_id)) {
                log::debug!("Already visited {}, skipping", locator.node_id);
                return Ok(());
            }
            match locator.role {
                NodeRole::Page => self.page(&locator).await,
                NodeRole::Collection => self.collection(&locator).await,
            }
        }
        .boxed()
    }

    /// Run a branch below the origin, keeping the run alive if it fails
    async fn branch(&mut self, locator: Locator) -> Result<()> {
        let node_id = locator.node_id.clone();
        match self.step(locator).await {
            Err(ConversionError::Cancelled) => Err(ConversionError::Cancelled),
            Err(e) => {
                log::warn!("Skipping branch {}: {}", node_id, e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn collection(&mut self, locator: &Locator) -> Result<()> {
        let members = self.source.query_collection(&locator.node_id).await?;
        let title = match self.source.get_collection_title(&locator.node_id).await {
            Ok(title) => Some(title),
            Err(e) => {
                log::warn!("No title for collection {}: {}", locator.node_id, e);
                None
            }
        };
        let lineage = combine_names(
            &self.config.rules.deck_name_template,
            locator.lineage.as_deref(),
            title.as_deref(),
        );

        for entry in members {
            self.checkpoint()?;
            let member = Locator {
                node_id: entry.id,
                role: NodeRole::Page,
                lineage: lineage.clone(),
                depth: locator.depth,
                origin: false,
            };
            self.branch(member).await?;
            if self.config.rules.collection_policy == CollectionPolicy::FirstMember {
                break;
            }
        }
        Ok(())
    }

    async fn page(&mut self, locator: &Locator) -> Result<()> {
        let config = self.config;
        let rules = &config.rules;
        let options = &config.options;

        let children = self.source.get_children(&locator.node_id, rules.unlimited).await?;
        let page = match self.source.get_page(&locator.node_id).await {
            Ok(page) => Some(page),
            Err(e) => {
                log::warn!("No metadata for page {}: {}", locator.node_id, e);
                None
            }
        };
        let title = page
            .as_ref()
            .map(|p| p.title.trim().to_string())
            .filter(|t| !t.is_empty());
        if self.first_page_title.is_none() {
            self.first_page_title = title.clone();
        }

        let (cards, sub_decks) = rules.partition(&children);
        let tags = if options.merge_tags {
            top_level_tags(&children, rules.tag_source)
        } else {
            Vec::new()
        };

        let local = match &options.deck_name {
            Some(name) if locator.origin && !name.trim().is_empty() => {
                Some(name.trim().to_string())
            }
            _ => title,
        };

        let deck_name = if rules.deck_from_page {
            let base_link = page.as_ref().and_then(|p| p.url.as_deref());
            let composer = CardComposer::new(self.renderer, self.config);
            let notes = composer.compose(&cards, &tags, base_link, self.cancel).await?;
            let name = self.namer.resolve(
                locator.lineage.as_deref(),
                local.as_deref(),
                self.first_page_title.as_deref(),
                &locator.node_id,
            );
            self.decks.push(assemble(name.clone(), notes, DECK_STYLE, options));
            name
        } else {
            self.namer.base_name(
                locator.lineage.as_deref(),
                local.as_deref(),
                self.first_page_title.as_deref(),
                &locator.node_id,
            )
        };

        if !options.descend_sub_decks {
            return Ok(());
        }
        for block in sub_decks {
            self.checkpoint()?;
            self.sub_deck(locator, block, &deck_name, &tags).await?;
        }
        Ok(())
    }

    async fn sub_deck(
        &mut self,
        parent: &Locator,
        block: &Block,
        parent_name: &str,
        tags: &[String],
    ) -> Result<()> {
        let lineage = Some(parent_name.to_string());
        if let Some(page_id) = block.referenced_page_id() {
            return self
                .branch(parent.child(page_id, NodeRole::Page, lineage))
                .await;
        }
        if block.is_collection_reference() {
            return self
                .branch(parent.child(block.id.as_str(), NodeRole::Collection, lineage))
                .await;
        }

        // container block: one deck from its direct card children
        if !self.visited.insert(normalize_id(&block.id)) {
            return Ok(());
        }
        let config = self.config;
        let rules = &config.rules;
        let children = match self.source.get_children(&block.id, rules.unlimited).await {
            Ok(children) => children,
            Err(e) => {
                log::warn!("Skipping sub-deck {}: {}", block.id, e);
                return Ok(());
            }
        };
        let cards: Vec<&Block> = children
            .iter()
            .filter(|b| rules.classify(b) == Some(BlockRole::Card))
            .collect();
        let composer = CardComposer::new(self.renderer, self.config);
        let notes = composer.compose(&cards, tags, None, self.cancel).await?;
        let name = self.namer.resolve(
            Some(parent_name),
            block.sub_deck_title().as_deref(),
            self.first_page_title.as_deref(),
            &block.id,
        );
        self.decks.push(assemble(name, notes, DECK_STYLE, &config.options));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockKind, BlockType, TextContent};
    use crate::deck::REFRESH_MARKER;
    use crate::source::{MemorySource, NoAssets};

    fn toggle(id: &str, text: &str) -> Block {
        Block::new(id, BlockKind::Toggle(TextContent::plain(text)))
    }

    fn bullet(id: &str, text: &str) -> Block {
        Block::new(id, BlockKind::BulletedListItem(TextContent::plain(text)))
    }

    fn para(id: &str, text: &str) -> Block {
        Block::new(id, BlockKind::Paragraph(TextContent::plain(text)))
    }

    fn child_page(id: &str, title: &str) -> Block {
        Block::new(id, BlockKind::ChildPage { title: title.into() })
    }

    async fn run(
        source: &MemorySource,
        config: &ConversionConfig,
        origin: Locator,
    ) -> Result<Vec<Deck>> {
        let cancel = CancellationToken::new();
        let renderer = Renderer::new(source, &NoAssets, config);
        let mut walker = TreeWalker::new(source, &renderer, config, &cancel);
        walker.traverse(origin).await
    }

    fn bullet_config(reversed: bool) -> ConversionConfig {
        let mut config = ConversionConfig::default();
        config.rules.card_types = vec![BlockType::BulletedListItem];
        config.options.basic_reversed = reversed;
        config
    }

    #[tokio::test]
    async fn test_bullet_card_with_nested_answer() {
        let source = MemorySource::new()
            .page("root", "Biology")
            .children("root", vec![bullet("b1", "Q1")])
            .children("b1", vec![para("a1", "A1")]);

        let decks = run(&source, &bullet_config(false), Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].name, "Biology");
        assert_eq!(decks[0].notes.len(), 1);
        assert_eq!(decks[0].notes[0].front, "Q1");
        assert_eq!(decks[0].notes[0].back, "<p>A1</p>");
    }

    #[tokio::test]
    async fn test_reversed_with_refresh_marker() {
        let front = format!("Q1 {}", REFRESH_MARKER);
        let source = MemorySource::new()
            .page("root", "Biology")
            .children("root", vec![bullet("b1", &front)])
            .children("b1", vec![para("a1", "A1")]);

        let decks = run(&source, &bullet_config(true), Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        let notes = &decks[0].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].front, front);
        assert_eq!(notes[0].back, "<p>A1</p>");
        assert_eq!(notes[1].front, "<p>A1</p>");
        assert_eq!(notes[1].back, front);
        assert_eq!((notes[0].ordinal, notes[1].ordinal), (0, 1));
    }

    #[tokio::test]
    async fn test_empty_card_types_yield_empty_decks() {
        let source = MemorySource::new()
            .page("root", "Root")
            .children("root", vec![toggle("t1", "Q"), child_page("p2", "Child")])
            .page("p2", "Child")
            .children("p2", vec![toggle("t2", "Q2")]);
        let mut config = ConversionConfig::default();
        config.rules.card_types.clear();

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 2);
        assert!(decks.iter().all(|d| d.notes.is_empty()));
    }

    #[tokio::test]
    async fn test_container_sub_deck() {
        let source = MemorySource::new()
            .page("root", "Biology")
            .children(
                "root",
                vec![
                    toggle("t0", "Top"),
                    Block::new(
                        "box",
                        BlockKind::Callout {
                            text: TextContent::plain("Cells"),
                            icon: None,
                        },
                    ),
                ],
            )
            .children("box", vec![toggle("t1", "Q1"), toggle("t2", "Q2")]);
        let mut config = ConversionConfig::default();
        config.rules.sub_deck_types = vec![BlockType::Callout];

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 2);
        assert_eq!(decks[0].name, "Biology");
        assert_eq!(decks[0].notes.len(), 1);
        assert_eq!(decks[1].name, "Biology::Cells");
        assert_eq!(decks[1].notes.len(), 2);
    }

    #[tokio::test]
    async fn test_child_pages_nest_names_and_honor_descend_flag() {
        let source = MemorySource::new()
            .page("root", "Biology")
            .children("root", vec![child_page("p2", "Cells")])
            .page("p2", "Cells")
            .children("p2", vec![toggle("t", "Q")]);
        let config = ConversionConfig::default();

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Biology", "Biology::Cells"]);

        let mut config = ConversionConfig::default();
        config.options.descend_sub_decks = false;
        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 1);
    }

    #[tokio::test]
    async fn test_cyclic_links_terminate() {
        let source = MemorySource::new()
            .page("a", "A")
            .page("b", "B")
            .children("a", vec![child_page("b", "B")])
            .children(
                "b",
                vec![Block::new("link", BlockKind::LinkToPage { page_id: "a".into() })],
            );
        let mut config = ConversionConfig::default();
        config.rules.sub_deck_types = vec![BlockType::ChildPage, BlockType::LinkToPage];

        let decks = run(&source, &config, Locator::root("a", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 2);
    }

    #[tokio::test]
    async fn test_max_depth_caps_page_nesting() {
        let source = MemorySource::new()
            .page("a", "A")
            .page("b", "B")
            .page("c", "C")
            .children("a", vec![child_page("b", "B")])
            .children("b", vec![child_page("c", "C")]);
        let mut config = ConversionConfig::default();
        config.rules.max_depth = Some(1);

        let decks = run(&source, &config, Locator::root("a", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_branch_keeps_other_decks() {
        let source = MemorySource::new()
            .page("root", "Root")
            .children(
                "root",
                vec![child_page("ok1", "One"), child_page("bad", "Bad"), child_page("ok2", "Two")],
            )
            .page("ok1", "One")
            .page("ok2", "Two")
            .fail_on("bad");
        let config = ConversionConfig::default();

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Root::One", "Root::Two"]);
    }

    #[tokio::test]
    async fn test_origin_failure_fails_the_run() {
        let source = MemorySource::new().fail_on("root");
        let config = ConversionConfig::default();
        let result = run(&source, &config, Locator::root("root", NodeRole::Page)).await;
        assert!(matches!(result, Err(ConversionError::Origin(_))));
    }

    #[tokio::test]
    async fn test_collection_policies() {
        let source = MemorySource::new()
            .collection("db", "Vocab", &["m1", "m2"])
            .page("m1", "Week 1")
            .page("m2", "Week 2")
            .children("m1", vec![toggle("t1", "Q1")])
            .children("m2", vec![toggle("t2", "Q2")]);

        let config = ConversionConfig::default();
        let decks = run(&source, &config, Locator::root("db", NodeRole::Collection))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Vocab::Week 1"]);

        let mut config = ConversionConfig::default();
        config.rules.collection_policy = CollectionPolicy::MergeAll;
        let decks = run(&source, &config, Locator::root("db", NodeRole::Collection))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Vocab::Week 1", "Vocab::Week 2"]);
    }

    #[tokio::test]
    async fn test_deck_name_override_and_collisions() {
        let source = MemorySource::new()
            .page("root", "Ignored")
            .children("root", vec![child_page("p1", "Same"), child_page("p2", "Same")])
            .page("p1", "Same")
            .page("p2", "Same");
        let mut config = ConversionConfig::default();
        config.options.deck_name = Some("Exam".into());

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Exam", "Exam::Same", "Exam::Same (2)"]);
    }

    #[tokio::test]
    async fn test_deck_name_leaves_collection_members_alone() {
        let source = MemorySource::new()
            .collection("db", "Vocab", &["m1", "m2"])
            .page("m1", "Week 1")
            .page("m2", "Week 2")
            .children("m1", vec![toggle("t1", "Q1")])
            .children("m2", vec![toggle("t2", "Q2")]);
        let mut config = ConversionConfig::default();
        config.rules.collection_policy = CollectionPolicy::MergeAll;
        config.options.deck_name = Some("Exam".into());

        let decks = run(&source, &config, Locator::root("db", NodeRole::Collection))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Vocab::Week 1", "Vocab::Week 2"]);
    }

    #[tokio::test]
    async fn test_failing_container_keeps_later_siblings() {
        let source = MemorySource::new()
            .page("root", "Root")
            .children(
                "root",
                vec![
                    child_page("ok1", "One"),
                    Block::new(
                        "box",
                        BlockKind::Callout {
                            text: TextContent::plain("Box"),
                            icon: None,
                        },
                    ),
                    child_page("ok2", "Two"),
                ],
            )
            .page("ok1", "One")
            .page("ok2", "Two")
            .fail_on("box");
        let mut config = ConversionConfig::default();
        config.rules.sub_deck_types = vec![BlockType::ChildPage, BlockType::Callout];

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        let names: Vec<&str> = decks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Root::One", "Root::Two"]);
    }

    #[tokio::test]
    async fn test_merged_tags_reuse_fetched_children() {
        let source = MemorySource::new().page("root", "Root").children(
            "root",
            vec![
                Block::new("h", BlockKind::Heading1(TextContent::plain("Chapter"))),
                toggle("t1", "Q"),
            ],
        );
        let mut config = ConversionConfig::default();
        config.options.merge_tags = true;

        let decks = run(&source, &config, Locator::root("root", NodeRole::Page))
            .await
            .unwrap();
        assert_eq!(decks[0].notes[0].tags, vec!["Chapter".to_string()]);
        // one listing and one metadata lookup for the page
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_traversal_is_repeatable() {
        let source = MemorySource::new()
            .page("root", "Root")
            .children("root", vec![toggle("t1", "Q1"), child_page("p", "Sub")])
            .children("t1", vec![Block::new("h", BlockKind::Heading1(TextContent::plain("Tag")))])
            .page("p", "Sub")
            .children("p", vec![toggle("t2", "Q2")]);
        let config = ConversionConfig::default();
        let origin = Locator::root("root", NodeRole::Page);

        let first = run(&source, &config, origin.clone()).await.unwrap();
        let second = run(&source, &config, origin).await.unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.notes, b.notes);
            assert_ne!(a.id, b.id);
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_no_decks() {
        let source = MemorySource::new().page("root", "Root");
        let config = ConversionConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let renderer = Renderer::new(&source, &NoAssets, &config);
        let mut walker = TreeWalker::new(&source, &renderer, &config, &cancel);

        assert!(matches!(
            walker.traverse(Locator::root("root", NodeRole::Page)).await,
            Err(ConversionError::Cancelled)
        ));
    }
}
