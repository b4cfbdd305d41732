//! Notion API document source
//!
//! Supports:
//! - Paginated block children (first page only unless unlimited)
//! - Page and database metadata
//! - Database queries for member pages
//! - Retry on rate limiting

mod client;
pub mod parse;

pub use client::*;
