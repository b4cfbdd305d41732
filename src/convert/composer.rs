//! Card composition
//!
//! Turns candidate blocks into notes. Each block gets its own [`CardScope`],
//! whose tags and media are moved onto the note it produces.

use tokio_util::sync::CancellationToken;

use super::markers::{apply_cloze, apply_input};
use super::scope::CardScope;
use crate::blocks::Block;
use crate::deck::{Note, NoteVariant};
use crate::error::ConversionError;
use crate::render::{markup_to_text, preserve_newlines, Renderer};
use crate::rules::ConversionConfig;
use crate::source::normalize_id;

/// Link to the block in the source document
pub fn source_link(base: &str, block_id: &str) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#{}", base, normalize_id(block_id))
}

/// Tags may not contain whitespace
pub fn sanitize_tag(tag: &str) -> String {
    tag.split_whitespace().collect::<Vec<_>>().join("-")
}

fn sanitize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = sanitize_tag(&tag);
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub struct CardComposer<'a> {
    renderer: &'a Renderer<'a>,
    config: &'a ConversionConfig,
}

impl<'a> CardComposer<'a> {
    pub fn new(renderer: &'a Renderer<'a>, config: &'a ConversionConfig) -> Self {
        Self { renderer, config }
    }

    /// Compose notes for a batch of candidate blocks, in document order.
    ///
    /// A block that fails to render a front is skipped; only cancellation
    /// aborts the batch.
    pub async fn compose(
        &self,
        blocks: &[&Block],
        top_level_tags: &[String],
        base_link: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Note>, ConversionError> {
        let options = &self.config.options;
        let mut notes: Vec<Note> = Vec::new();

        for block in blocks {
            if cancel.is_cancelled() {
                return Err(ConversionError::Cancelled);
            }
            let Some(mut note) = self.compose_card(block, base_link).await else {
                continue;
            };
            note.ordinal = notes.len();
            // Cherry mode never emits reversed companions
            let reverse = !options.cherry
                && note.variant == NoteVariant::Basic
                && (options.basic_reversed || note.has_refresh_marker());
            let companion = reverse.then(|| note.reversed());
            notes.push(note);
            notes.extend(companion);
        }

        if options.cherry {
            notes.retain(Note::has_cherry);
        }
        if options.avocado {
            notes.retain(|note| !note.has_avocado());
        }
        for (ordinal, note) in notes.iter_mut().enumerate() {
            note.ordinal = ordinal;
        }

        if options.merge_tags && !top_level_tags.is_empty() {
            for note in &mut notes {
                let own = std::mem::take(&mut note.tags);
                note.tags = sanitize_tags(top_level_tags.iter().cloned().chain(own));
            }
        }
        Ok(notes)
    }

    /// One note for one block, or `None` when it has no usable front
    pub async fn compose_card(&self, block: &Block, base_link: Option<&str>) -> Option<Note> {
        let rules = &self.config.rules;
        let options = &self.config.options;
        let mut scope = CardScope::new();

        let front = match self.renderer.render_front(block, &mut scope).await {
            Ok(front) => front,
            Err(e) => {
                log::warn!("Skipping card {}: front failed to render: {}", block.id, e);
                return None;
            }
        };
        if front.trim().is_empty() {
            log::debug!("Skipping card {}: empty front", block.id);
            return None;
        }

        let back = if block.is_column_list() && rules.use_columns {
            self.renderer.column_content(block, 1, &mut scope).await
        } else if block.has_children {
            self.renderer.render_children(&block.id, &mut scope).await
        } else {
            Ok(String::new())
        };
        let mut back = back.unwrap_or_else(|e| {
            log::warn!("Card {} keeps its front only: {}", block.id, e);
            String::new()
        });
        if options.text_only_back {
            back = markup_to_text(&back);
        }

        let mut note = Note::new(front, back);
        note.media = scope.media.drain();

        if options.cloze {
            if let Some(front) = apply_cloze(&note.front) {
                note.front = front;
                note.variant = NoteVariant::Cloze;
            }
        }
        if options.input && note.variant == NoteVariant::Basic {
            if let Some((prompt, answer)) = apply_input(&note.front) {
                note.front = prompt;
                note.back = answer;
                note.variant = NoteVariant::Input;
            }
        }

        if let (true, Some(base)) = (options.add_source_link, base_link) {
            let link = source_link(base, &block.id);
            note.back.push_str(&format!(
                "<a class=\"source-link\" href=\"{}\">Open in Notion</a>",
                html_escape::encode_double_quoted_attribute(&link)
            ));
            note.source_link = Some(link);
        }
        if options.use_source_id {
            note.source_id = Some(block.id.clone());
        }

        note.tags = sanitize_tags(scope.tags.tags_for(rules.tag_source));
        scope.tags.clear();

        note.front = preserve_newlines(&note.front, options.preserve_newlines);
        note.back = preserve_newlines(&note.back, options.preserve_newlines);
        Some(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockKind, BlockType, RichText, TextContent};
    use crate::deck::{AVOCADO_MARKER, CHERRY_MARKER, REFRESH_MARKER};
    use crate::source::{DocumentSource, MemorySource, NoAssets};

    fn toggle(id: &str, text: &str) -> Block {
        Block::new(id, BlockKind::Toggle(TextContent::plain(text)))
    }

    fn para(id: &str, text: &str) -> Block {
        Block::new(id, BlockKind::Paragraph(TextContent::plain(text)))
    }

    async fn compose_all(
        source: &MemorySource,
        config: &ConversionConfig,
        parent: &str,
        tags: &[String],
    ) -> Vec<Note> {
        let blocks = source.get_children(parent, true).await.unwrap();
        let cards: Vec<&Block> = blocks
            .iter()
            .filter(|b| config.rules.is_card_type(b.block_type()))
            .collect();
        let renderer = Renderer::new(source, &NoAssets, config);
        let composer = CardComposer::new(&renderer, config);
        composer
            .compose(&cards, tags, Some("https://www.notion.so/page"), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ordinals_have_no_gaps_after_skipped_fronts() {
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", "Q1"), toggle("empty", ""), toggle("t2", "Q2")])
            .children("t1", vec![para("a1", "A1")])
            .children("t2", vec![para("a2", "A2")]);
        let config = ConversionConfig::default();

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].ordinal, 0);
        assert_eq!(notes[1].ordinal, 1);
        assert_eq!(notes[1].front, "Q2");
        assert_eq!(notes[1].back, "<p>A2</p>");
    }

    #[tokio::test]
    async fn test_refresh_marker_adds_reversed_companion() {
        let front = format!("{} Q1", REFRESH_MARKER);
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", &front), toggle("t2", "Q2")])
            .children("t1", vec![para("a1", "A1")])
            .children("t2", vec![para("a2", "A2")]);
        let config = ConversionConfig::default();

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[1].front, notes[0].back);
        assert_eq!(notes[1].back, notes[0].front);
        assert_eq!(
            notes.iter().map(|n| n.ordinal).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_cloze_wins_over_input_and_is_never_reversed() {
        let source = MemorySource::new().children(
            "page",
            vec![Block::new(
                "t1",
                BlockKind::Toggle(TextContent::new(vec![
                    RichText::plain("Answer: "),
                    RichText::code("?42"),
                ])),
            )],
        );
        let mut config = ConversionConfig::default();
        config.options.input = true;
        config.options.basic_reversed = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].variant, NoteVariant::Cloze);
        assert_eq!(notes[0].front, "Answer: {{c1::?42}}");

        config.options.cloze = false;
        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].variant, NoteVariant::Input);
        assert_eq!(notes[0].back, "42");
    }

    #[tokio::test]
    async fn test_heading_tags_stay_with_their_card() {
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", "Q1"), toggle("t2", "Q2")])
            .children(
                "t1",
                vec![Block::new("h1", BlockKind::Heading3(TextContent::plain("Cell biology")))],
            )
            .children(
                "t2",
                vec![Block::new("h2", BlockKind::Heading3(TextContent::plain("Genetics")))],
            );
        let config = ConversionConfig::default();

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes[0].tags, vec!["Cell-biology".to_string()]);
        assert_eq!(notes[1].tags, vec!["Genetics".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_tags_prepends_top_level_tags() {
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", "Q1")])
            .children(
                "t1",
                vec![Block::new("h1", BlockKind::Heading3(TextContent::plain("Genetics")))],
            );
        let mut config = ConversionConfig::default();
        config.options.merge_tags = true;

        let top = vec!["biology".to_string(), "Genetics".to_string()];
        let notes = compose_all(&source, &config, "page", &top).await;
        assert_eq!(notes[0].tags, vec!["biology".to_string(), "Genetics".to_string()]);
    }

    #[tokio::test]
    async fn test_cherry_then_avocado_filters() {
        let source = MemorySource::new().children(
            "page",
            vec![
                toggle("t1", &format!("{} keep", CHERRY_MARKER)),
                toggle("t2", "unmarked"),
                toggle("t3", &format!("{}{} both", CHERRY_MARKER, AVOCADO_MARKER)),
            ],
        );
        let mut config = ConversionConfig::default();
        config.options.cherry = true;
        config.options.avocado = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 1);
        assert!(notes[0].front.ends_with("keep"));
        assert_eq!(notes[0].ordinal, 0);
    }

    #[tokio::test]
    async fn test_cherry_mode_skips_reversed_companions() {
        let source = MemorySource::new()
            .children(
                "page",
                vec![
                    toggle("t1", &format!("{} Q", CHERRY_MARKER)),
                    toggle("t2", &format!("{} {} Q2", CHERRY_MARKER, REFRESH_MARKER)),
                ],
            )
            .children("t1", vec![para("a1", "A")])
            .children("t2", vec![para("a2", "A2")]);
        let mut config = ConversionConfig::default();
        config.options.cherry = true;
        config.options.basic_reversed = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.variant == NoteVariant::Basic));
        assert!(notes[0].front.ends_with("Q"));
        assert!(notes[1].front.ends_with("Q2"));
        assert_eq!(
            notes.iter().map(|n| n.ordinal).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[tokio::test]
    async fn test_source_link_and_id() {
        let source = MemorySource::new().children("page", vec![toggle("ab-cd", "Q")]);
        let mut config = ConversionConfig::default();
        config.options.add_source_link = true;
        config.options.use_source_id = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(
            notes[0].source_link.as_deref(),
            Some("https://www.notion.so/page#abcd")
        );
        assert!(notes[0].back.contains("Open in Notion"));
        assert_eq!(notes[0].source_id.as_deref(), Some("ab-cd"));
    }

    #[tokio::test]
    async fn test_failed_back_degrades_to_front_only() {
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", "Q1").with_children(true)])
            .fail_on("t1");
        let config = ConversionConfig::default();

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].front, "Q1");
        assert_eq!(notes[0].back, "");
    }

    #[tokio::test]
    async fn test_column_answer_uses_second_column() {
        let source = MemorySource::new()
            .children("page", vec![Block::new("cols", BlockKind::ColumnList)])
            .children(
                "cols",
                vec![Block::new("c1", BlockKind::Column), Block::new("c2", BlockKind::Column)],
            )
            .children("c1", vec![para("q", "Question")])
            .children("c2", vec![para("a", "Answer")]);
        let mut config = ConversionConfig::default();
        config.rules.card_types = vec![BlockType::ColumnList];
        config.rules.use_columns = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].front, "<p>Question</p>");
        assert_eq!(notes[0].back, "<p>Answer</p>");
    }

    #[tokio::test]
    async fn test_preserve_newlines_and_text_only_back() {
        let source = MemorySource::new()
            .children("page", vec![toggle("t1", "line one\nline two")])
            .children("t1", vec![para("a", "A"), para("b", "B")]);
        let mut config = ConversionConfig::default();
        config.options.preserve_newlines = true;
        config.options.text_only_back = true;

        let notes = compose_all(&source, &config, "page", &[]).await;
        assert_eq!(notes[0].front, "line one<br />line two");
        assert_eq!(notes[0].back, "A<br />B");
    }

    #[tokio::test]
    async fn test_cancelled_batch_is_an_error() {
        let source = MemorySource::new().children("page", vec![toggle("t1", "Q")]);
        let config = ConversionConfig::default();
        let blocks = source.get_children("page", true).await.unwrap();
        let cards: Vec<&Block> = blocks.iter().collect();
        let renderer = Renderer::new(&source, &NoAssets, &config);
        let composer = CardComposer::new(&renderer, &config);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            composer.compose(&cards, &[], None, &cancel).await,
            Err(ConversionError::Cancelled)
        ));
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("  cell  biology "), "cell-biology");
        assert_eq!(source_link("https://x.so/p#old", "1-2"), "https://x.so/p#12");
    }
}
