//! Zip bundle writer

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{DeckSink, Result};
use crate::deck::Deck;
use crate::error::PackagingError;

/// Name of the manifest entry inside a bundle
pub const MANIFEST_NAME: &str = "decks.json";
/// Directory holding media entries inside a bundle
pub const MEDIA_DIR: &str = "media";

/// Manifest stored at the root of a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub decks: Vec<Deck>,
}

/// Output file name: explicit deck name, else first page title, else the root id
pub fn bundle_file_name(
    deck_name: Option<&str>,
    first_page_title: Option<&str>,
    root_id: &str,
) -> String {
    let base = [deck_name, first_page_title]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(root_id);
    let safe: String = base
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if safe.to_lowercase().ends_with(".zip") {
        safe
    } else {
        format!("{}.zip", safe)
    }
}

/// Reject decks holding a note with neither side filled in
pub fn check_decks(decks: &[Deck]) -> Result<()> {
    for deck in decks {
        if let Some(note) = deck.notes.iter().find(|n| n.is_empty()) {
            return Err(PackagingError::EmptyNote {
                deck: deck.name.clone(),
                ordinal: note.ordinal,
            });
        }
    }
    Ok(())
}

/// Write decks and their media into one zip archive
pub fn write_bundle(decks: &[Deck], output_path: &Path) -> Result<BundleManifest> {
    check_decks(decks)?;

    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = HashSet::new();
    for item in decks.iter().flat_map(|deck| deck.media()) {
        if !written.insert(item.filename.as_str()) {
            continue;
        }
        zip.start_file(format!("{}/{}", MEDIA_DIR, item.filename), options)?;
        zip.write_all(&item.bytes)?;
    }

    let manifest = BundleManifest {
        version: "1.0".to_string(),
        created_at: Utc::now(),
        decks: decks.to_vec(),
    };
    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    zip.finish()?;

    log::info!(
        "Wrote {} decks and {} media files to {:?}",
        decks.len(),
        written.len(),
        output_path
    );
    Ok(manifest)
}

/// Packaging sink producing a zip bundle in the target directory
#[derive(Debug, Clone)]
pub struct BundleWriter {
    file_name: String,
}

impl BundleWriter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[async_trait]
impl DeckSink for BundleWriter {
    async fn package(&self, decks: &[Deck], target_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(target_dir)?;
        let output_path = target_dir.join(&self.file_name);
        let decks = decks.to_vec();
        let path = output_path.clone();
        tokio::task::spawn_blocking(move || write_bundle(&decks, &path))
            .await
            .map_err(|e| PackagingError::Io(std::io::Error::other(e.to_string())))??;
        Ok(output_path)
    }
}
