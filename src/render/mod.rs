//! Block rendering
//!
//! Turns blocks into card markup. Rendering a block may fetch its children
//! and embedded media; tags and media discovered on the way are recorded in
//! the [`CardScope`] of the card being composed.

pub mod rich_text;
pub mod text;

use futures_util::future::{BoxFuture, FutureExt};

use crate::blocks::{Block, BlockKind, FileRef, TextContent};
use crate::convert::{media_file_name, CardScope};
use crate::error::RenderError;
use crate::rules::ConversionConfig;
use crate::source::{AssetFetcher, DocumentSource};

pub use rich_text::{color_class, render_runs, render_text};
pub use text::{markup_to_text, preserve_newlines};

type Result<T> = std::result::Result<T, RenderError>;

/// Nesting depth at which back rendering stops descending
const MAX_RENDER_DEPTH: usize = 32;

#[derive(Clone, Copy)]
enum MediaKind {
    Image,
    Audio,
    File,
}

/// Renders blocks for one conversion run
pub struct Renderer<'a> {
    source: &'a dyn DocumentSource,
    assets: &'a dyn AssetFetcher,
    config: &'a ConversionConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        assets: &'a dyn AssetFetcher,
        config: &'a ConversionConfig,
    ) -> Self {
        Self {
            source,
            assets,
            config,
        }
    }

    fn text(&self, text: &TextContent, scope: &mut CardScope) -> String {
        render_text(text, self.config.rules.tag_source, &mut scope.tags)
    }

    /// Markup for the block itself, without its children.
    ///
    /// For a column list this is the content of its first column.
    pub async fn render_front(&self, block: &Block, scope: &mut CardScope) -> Result<String> {
        if block.is_column_list() {
            return self.column_content(block, 0, scope).await;
        }
        Ok(self.render_own(block, scope).await)
    }

    /// Markup for all children of a node, in document order
    pub async fn render_children(&self, parent_id: &str, scope: &mut CardScope) -> Result<String> {
        self.children_markup(parent_id, scope, 0).await
    }

    /// Markup of the column at `index` inside a column list
    pub async fn column_content(
        &self,
        column_list: &Block,
        index: usize,
        scope: &mut CardScope,
    ) -> Result<String> {
        let children = self
            .source
            .get_children(&column_list.id, self.config.rules.unlimited)
            .await?;
        let column = children
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Column))
            .nth(index)
            .ok_or_else(|| RenderError::MissingColumn {
                block_id: column_list.id.clone(),
                index,
            })?;
        self.children_markup(&column.id, scope, 1).await
    }

    async fn children_markup(
        &self,
        parent_id: &str,
        scope: &mut CardScope,
        depth: usize,
    ) -> Result<String> {
        if depth >= MAX_RENDER_DEPTH {
            log::warn!("Stopped rendering below {} at depth {}", parent_id, depth);
            return Ok(String::new());
        }
        let children = self
            .source
            .get_children(parent_id, self.config.rules.unlimited)
            .await?;
        let mut out = String::new();
        for child in &children {
            out.push_str(&self.render_block(child, scope, depth + 1).await?);
        }
        Ok(out)
    }

    async fn nested(&self, block: &Block, scope: &mut CardScope, depth: usize) -> Result<String> {
        if block.has_children {
            self.children_markup(&block.id, scope, depth).await
        } else {
            Ok(String::new())
        }
    }

    /// Full markup for a block including its nested children
    fn render_block<'s>(
        &'s self,
        block: &'s Block,
        scope: &'s mut CardScope,
        depth: usize,
    ) -> BoxFuture<'s, Result<String>> {
        async move {
            let html = match &block.kind {
                BlockKind::ColumnList => format!(
                    "<div class=\"column-list\">{}</div>",
                    self.nested(block, scope, depth).await?
                ),
                BlockKind::Column => format!(
                    "<div class=\"column\">{}</div>",
                    self.nested(block, scope, depth).await?
                ),
                BlockKind::Paragraph(t) => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    let children = if children.is_empty() {
                        children
                    } else {
                        format!("<div class=\"indented\">{}</div>", children)
                    };
                    format!("<p{}>{}</p>{}", color_class(&t.color), own, children)
                }
                BlockKind::Heading1(t) | BlockKind::Heading2(t) | BlockKind::Heading3(t) => {
                    let level = match block.kind {
                        BlockKind::Heading1(_) => 1,
                        BlockKind::Heading2(_) => 2,
                        _ => 3,
                    };
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    format!(
                        "<h{level}{}>{}</h{level}>{}",
                        color_class(&t.color),
                        own,
                        children
                    )
                }
                BlockKind::BulletedListItem(t) => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    format!(
                        "<ul class=\"bulleted-list\"><li{}>{}{}</li></ul>",
                        color_class(&t.color),
                        own,
                        children
                    )
                }
                BlockKind::NumberedListItem(t) => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    format!(
                        "<ol class=\"numbered-list\"><li{}>{}{}</li></ol>",
                        color_class(&t.color),
                        own,
                        children
                    )
                }
                BlockKind::ToDo { checked, .. } => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    let (state, mark) = if *checked {
                        ("checkbox-on", "\u{2611}")
                    } else {
                        ("checkbox-off", "\u{2610}")
                    };
                    format!(
                        concat!(
                            "<ul class=\"to-do-list\"><li>",
                            "<span class=\"checkbox {}\">{}</span> {}{}</li></ul>"
                        ),
                        state, mark, own, children
                    )
                }
                BlockKind::Toggle(_) => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    format!("<details><summary>{}</summary>{}</details>", own, children)
                }
                BlockKind::Quote(t) => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    format!(
                        "<blockquote{}>{}{}</blockquote>",
                        color_class(&t.color),
                        own,
                        children
                    )
                }
                BlockKind::Callout { icon, .. } => {
                    let own = self.render_own(block, scope).await;
                    let children = self.nested(block, scope, depth).await?;
                    let icon = icon
                        .as_deref()
                        .map(|i| {
                            format!(
                                "<div class=\"callout-icon\">{}</div>",
                                html_escape::encode_text(i)
                            )
                        })
                        .unwrap_or_default();
                    format!(
                        "<figure class=\"callout\">{}<div>{}{}</div></figure>",
                        icon, own, children
                    )
                }
                BlockKind::Code { .. }
                | BlockKind::Equation { .. }
                | BlockKind::Divider
                | BlockKind::Image(_)
                | BlockKind::Audio(_)
                | BlockKind::File(_)
                | BlockKind::Pdf(_)
                | BlockKind::Video(_)
                | BlockKind::Bookmark { .. } => self.render_own(block, scope).await,
                BlockKind::ChildPage { .. } | BlockKind::ChildDatabase { .. } => {
                    let own = self.render_own(block, scope).await;
                    format!("<p class=\"child-page\">{}</p>", own)
                }
                BlockKind::LinkToPage { .. } | BlockKind::Unsupported { .. } => {
                    self.render_own(block, scope).await
                }
            };
            Ok(html)
        }
        .boxed()
    }

    /// Inline content of a block, registering headings as tags
    async fn render_own(&self, block: &Block, scope: &mut CardScope) -> String {
        match &block.kind {
            BlockKind::Paragraph(t)
            | BlockKind::BulletedListItem(t)
            | BlockKind::NumberedListItem(t)
            | BlockKind::Toggle(t)
            | BlockKind::Quote(t)
            | BlockKind::ToDo { text: t, .. }
            | BlockKind::Callout { text: t, .. } => self.text(t, scope),
            BlockKind::Heading1(t) | BlockKind::Heading2(t) | BlockKind::Heading3(t) => {
                scope.tags.add_heading(&t.plain_text());
                self.text(t, scope)
            }
            BlockKind::Code { text, language } => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                html_escape::encode_double_quoted_attribute(language),
                html_escape::encode_text(&text.plain_text())
            ),
            BlockKind::Equation { expression } => format!(
                "<div class=\"equation\">\\[{}\\]</div>",
                html_escape::encode_text(expression)
            ),
            BlockKind::Divider => "<hr />".to_string(),
            BlockKind::Image(file) => self.embed(file, MediaKind::Image, scope).await,
            BlockKind::Audio(file) => self.embed(file, MediaKind::Audio, scope).await,
            BlockKind::File(file) | BlockKind::Pdf(file) => {
                self.embed(file, MediaKind::File, scope).await
            }
            BlockKind::Video(file) => link(&file.url),
            BlockKind::Bookmark { url } => link(url),
            BlockKind::ChildPage { title } | BlockKind::ChildDatabase { title } => {
                html_escape::encode_text(title).to_string()
            }
            BlockKind::ColumnList | BlockKind::Column => String::new(),
            BlockKind::LinkToPage { page_id } => {
                log::debug!("Not rendering link to page {} inside a card", page_id);
                String::new()
            }
            BlockKind::Unsupported { type_name } => {
                log::debug!("Not rendering unsupported block {} ({})", block.id, type_name);
                String::new()
            }
        }
    }

    /// Fetch an asset into the card's media and reference it.
    ///
    /// A failed download leaves the card without this media item.
    async fn embed(&self, file: &FileRef, kind: MediaKind, scope: &mut CardScope) -> String {
        if self.config.options.text_only_back || file.url.is_empty() {
            return String::new();
        }
        let name = media_file_name(&file.url);
        if !scope.media.contains(&name) {
            match self.assets.fetch_bytes(&file.url).await {
                Ok(bytes) => {
                    scope.media.attach(name.clone(), bytes);
                }
                Err(e) => {
                    log::warn!("Failed to fetch media {}: {}", file.url, e);
                    return String::new();
                }
            }
        }
        match kind {
            MediaKind::Image => format!("<img src='{}' />", name),
            MediaKind::Audio => format!("[sound:{}]", name),
            MediaKind::File => format!("<embed src='{}' />", name),
        }
    }
}

fn link(url: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_text(url)
    )
}
