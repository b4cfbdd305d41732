//! Generated decks and notes
//!
//! This module provides:
//! - Note, deck and media models
//! - Deck assembly with fresh identities and the shared stylesheet
//! - Run-unique deck naming from parent lineage

pub mod assembler;
pub mod models;

pub use assembler::{assemble, combine_names, DeckNamer, DECK_STYLE};
pub use models::*;
