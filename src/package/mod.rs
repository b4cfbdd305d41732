//! Packaging of finished decks
//!
//! This module provides:
//! - The `DeckSink` seam the converter hands its decks to
//! - A zip bundle writer with a JSON manifest and media entries
//! - Output file naming

pub mod bundle;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::deck::Deck;
use crate::error::PackagingError;

pub use bundle::{bundle_file_name, check_decks, write_bundle, BundleManifest, BundleWriter};

pub type Result<T> = std::result::Result<T, PackagingError>;

/// Consumes the decks of a conversion run
#[async_trait]
pub trait DeckSink: Send + Sync {
    /// Package `decks` below `target_dir`, returning the written path
    async fn package(&self, decks: &[Deck], target_dir: &Path) -> Result<PathBuf>;
}
