//! Block tree model
//!
//! Blocks arrive from the document source already classified into a
//! closed set of kinds; rule sets refer to them by [`BlockType`].

pub mod models;

pub use models::*;
