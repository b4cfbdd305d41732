//! Error types shared across the conversion pipeline

use thiserror::Error;

/// Failure reaching the document source or the asset host
#[derive(Error, Debug)]
pub enum RemoteFetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Rate limited by the document API")]
    RateLimited,

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Fetch cancelled")]
    Cancelled,
}

/// A single block's content could not be rendered
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Fetch failed while rendering: {0}")]
    Fetch(#[from] RemoteFetchError),

    #[error("Block {block_id} has no column at index {index}")]
    MissingColumn { block_id: String, index: usize },
}

/// The rule set is internally inconsistent
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Page size must be between 1 and 100, got {0}")]
    PageSize(u32),

    #[error("Deck name template must contain {{name}}: {0}")]
    NamingTemplate(String),

    #[error("Block type {0} is listed as a card type more than once")]
    DuplicateCardType(String),
}

/// Failure of a whole conversion run
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Could not fetch origin node: {0}")]
    Origin(#[from] RemoteFetchError),

    #[error("Invalid rules: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("Conversion cancelled")]
    Cancelled,
}

/// Failure loading a conversion config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid rules: {0}")]
    Policy(#[from] PolicyViolation),
}

/// Failure writing decks to the packaging sink
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Note {ordinal} in deck '{deck}' has neither front nor back")]
    EmptyNote { deck: String, ordinal: usize },
}
