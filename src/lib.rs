//! Convert Notion block trees into flashcard decks.
//!
//! A run walks a page (or database) through a [`source::DocumentSource`],
//! composes notes from the blocks the [`rules::RuleSet`] marks as cards,
//! and returns named [`deck::Deck`]s ready for a [`package::DeckSink`].

pub mod blocks;
pub mod convert;
pub mod deck;
pub mod error;
pub mod package;
pub mod render;
pub mod rules;
pub mod source;

pub use convert::{convert, Conversion, NodeRole};
pub use error::{ConversionError, PackagingError, RemoteFetchError};
pub use rules::ConversionConfig;
