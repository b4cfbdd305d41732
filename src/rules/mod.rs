//! Conversion policy
//!
//! This module provides:
//! - The rule set deciding which blocks are cards and which are sub-decks
//! - Card options (reversal, cloze/input detection, filters, tags)
//! - TOML loading and validation of both

pub mod config;
pub mod models;

pub use config::ConversionConfig;
pub use models::*;
