//! Mapping of Notion API JSON onto the block model

use serde_json::Value;

use crate::blocks::{
    default_color, Block, BlockKind, CollectionEntry, FileRef, PageMetadata, RichText, TextContent,
};
use crate::error::RemoteFetchError;

type Result<T> = std::result::Result<T, RemoteFetchError>;

fn malformed(what: impl Into<String>) -> RemoteFetchError {
    RemoteFetchError::Malformed(what.into())
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn parse_rich_text(value: Option<&Value>) -> Result<Vec<RichText>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| malformed(format!("rich text: {}", e))),
    }
}

fn parse_text(payload: &Value) -> Result<TextContent> {
    Ok(TextContent {
        rich_text: parse_rich_text(payload.get("rich_text"))?,
        color: str_field(payload, "color")
            .map(str::to_string)
            .unwrap_or_else(default_color),
    })
}

fn parse_file(payload: &Value) -> Result<FileRef> {
    let kind = str_field(payload, "type").unwrap_or("external");
    let url = payload
        .get(kind)
        .and_then(|f| str_field(f, "url"))
        .ok_or_else(|| malformed(format!("file block without {} url", kind)))?;
    Ok(FileRef {
        url: url.to_string(),
        caption: parse_rich_text(payload.get("caption"))?,
    })
}

/// Parse one block object from a children listing
pub fn parse_block(value: &Value) -> Result<Block> {
    let id = str_field(value, "id").ok_or_else(|| malformed("block without id"))?;
    let type_name = str_field(value, "type").ok_or_else(|| malformed("block without type"))?;
    let has_children = value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let empty = Value::Null;
    let payload = value.get(type_name).unwrap_or(&empty);

    let kind = match type_name {
        "paragraph" => BlockKind::Paragraph(parse_text(payload)?),
        "heading_1" => BlockKind::Heading1(parse_text(payload)?),
        "heading_2" => BlockKind::Heading2(parse_text(payload)?),
        "heading_3" => BlockKind::Heading3(parse_text(payload)?),
        "bulleted_list_item" => BlockKind::BulletedListItem(parse_text(payload)?),
        "numbered_list_item" => BlockKind::NumberedListItem(parse_text(payload)?),
        "to_do" => BlockKind::ToDo {
            text: parse_text(payload)?,
            checked: payload
                .get("checked")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        "toggle" => BlockKind::Toggle(parse_text(payload)?),
        "quote" => BlockKind::Quote(parse_text(payload)?),
        "callout" => BlockKind::Callout {
            text: parse_text(payload)?,
            icon: payload
                .get("icon")
                .and_then(|icon| str_field(icon, "emoji"))
                .map(str::to_string),
        },
        "code" => BlockKind::Code {
            text: parse_text(payload)?,
            language: str_field(payload, "language")
                .unwrap_or("plain text")
                .to_string(),
        },
        "equation" => BlockKind::Equation {
            expression: str_field(payload, "expression").unwrap_or_default().to_string(),
        },
        "divider" => BlockKind::Divider,
        "image" => BlockKind::Image(parse_file(payload)?),
        "audio" => BlockKind::Audio(parse_file(payload)?),
        "file" => BlockKind::File(parse_file(payload)?),
        "pdf" => BlockKind::Pdf(parse_file(payload)?),
        "video" => BlockKind::Video(parse_file(payload)?),
        "bookmark" => BlockKind::Bookmark {
            url: str_field(payload, "url").unwrap_or_default().to_string(),
        },
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "child_page" => BlockKind::ChildPage {
            title: str_field(payload, "title").unwrap_or_default().to_string(),
        },
        "child_database" => BlockKind::ChildDatabase {
            title: str_field(payload, "title").unwrap_or_default().to_string(),
        },
        "link_to_page" => BlockKind::LinkToPage {
            page_id: str_field(payload, "page_id")
                .or_else(|| str_field(payload, "database_id"))
                .ok_or_else(|| malformed("link_to_page without target"))?
                .to_string(),
        },
        other => {
            log::debug!("Block {} has unsupported type {}", id, other);
            BlockKind::Unsupported {
                type_name: other.to_string(),
            }
        }
    };

    Ok(Block {
        id: id.to_string(),
        kind,
        has_children,
    })
}

/// One page of a paginated listing
pub struct Listing {
    pub results: Vec<Value>,
    pub next_cursor: Option<String>,
}

pub fn parse_listing(value: &Value) -> Result<Listing> {
    let results = value
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| malformed("listing without results"))?;
    let has_more = value
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = if has_more {
        str_field(value, "next_cursor").map(str::to_string)
    } else {
        None
    };
    Ok(Listing {
        results,
        next_cursor,
    })
}

fn concat_plain_text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|run| str_field(run, "plain_text"))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Page metadata; the title lives in whichever property has type `title`
pub fn parse_page(value: &Value) -> Result<PageMetadata> {
    let id = str_field(value, "id").ok_or_else(|| malformed("page without id"))?;
    let title = value
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|props| {
            props
                .values()
                .find(|prop| str_field(prop, "type") == Some("title"))
        })
        .map(|prop| concat_plain_text(prop.get("title")))
        .unwrap_or_default();
    Ok(PageMetadata {
        id: id.to_string(),
        title,
        url: str_field(value, "url").map(str::to_string),
    })
}

pub fn parse_database_title(value: &Value) -> String {
    concat_plain_text(value.get("title"))
}

pub fn parse_collection_entry(value: &Value) -> Result<CollectionEntry> {
    str_field(value, "id")
        .map(|id| CollectionEntry { id: id.to_string() })
        .ok_or_else(|| malformed("collection entry without id"))
}
