use std::path::Path;

use anyhow::{Context, Result};

use blockdeck_lib::rules::ConversionConfig;
use blockdeck_lib::source::{HttpAssetFetcher, NotionClient};

/// Environment variable holding the integration token
pub const TOKEN_VAR: &str = "NOTION_TOKEN";

/// Shared state for CLI commands
pub struct App {
    pub config: ConversionConfig,
}

impl App {
    /// Load the config file when given, defaults otherwise
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConversionConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConversionConfig::default(),
        };
        Ok(Self { config })
    }

    /// Notion API client authenticated from the environment
    pub fn notion_client(&self, page_size: u32) -> Result<NotionClient> {
        let token = std::env::var(TOKEN_VAR)
            .with_context(|| format!("{} is not set", TOKEN_VAR))?;
        let client = NotionClient::new(token).context("Failed to create Notion client")?;
        Ok(client.with_page_size(page_size))
    }

    pub fn asset_fetcher(&self) -> Result<HttpAssetFetcher> {
        HttpAssetFetcher::new().context("Failed to create asset fetcher")
    }
}
