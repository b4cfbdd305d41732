use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use super::parse::{
    parse_block, parse_collection_entry, parse_database_title, parse_listing, parse_page,
};
use crate::blocks::{Block, CollectionEntry, PageMetadata};
use crate::error::RemoteFetchError;
use crate::source::{normalize_id, AssetFetcher, DocumentSource, FetchResult};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const MAX_RETRIES: u32 = 3;

/// Notion REST client for block trees
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl NotionClient {
    /// Create a new client for an integration token
    pub fn new(token: impl Into<String>) -> Result<Self, RemoteFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            page_size: 100,
        })
    }

    /// Point at a different API root (proxies, mocks)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Results requested per page, clamped to what the API accepts
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn children_url(&self, node_id: &str, cursor: Option<&str>) -> String {
        let mut url = self.url(&format!(
            "blocks/{}/children?page_size={}",
            normalize_id(node_id),
            self.page_size
        ));
        if let Some(cursor) = cursor {
            url.push_str("&start_cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send a request, retrying while the API asks us to slow down
    async fn send(&self, request: RequestBuilder, what: &str) -> FetchResult<Value> {
        let mut attempt = 0;
        loop {
            let this_try = request.try_clone().ok_or_else(|| {
                RemoteFetchError::Malformed("request body is not cloneable".into())
            })?;
            let response = self.authorized(this_try).send().await?;

            match response.status() {
                status if status.is_success() => {
                    return response.json::<Value>().await.map_err(Into::into);
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(RemoteFetchError::AuthFailed);
                }
                StatusCode::NOT_FOUND => {
                    return Err(RemoteFetchError::NotFound(what.to_string()));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    attempt += 1;
                    if attempt > MAX_RETRIES {
                        return Err(RemoteFetchError::RateLimited);
                    }
                    let wait = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(u64::from(attempt));
                    log::warn!("Rate limited fetching {}, retrying in {}s", what, wait);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                status => {
                    let message = response.text().await.unwrap_or_default();
                    return Err(RemoteFetchError::Server {
                        status: status.as_u16(),
                        message,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl DocumentSource for NotionClient {
    async fn get_children(&self, node_id: &str, unlimited: bool) -> FetchResult<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let url = self.children_url(node_id, cursor.as_deref());
            let value = self.send(self.client.get(&url), node_id).await?;
            let listing = parse_listing(&value)?;
            for result in &listing.results {
                blocks.push(parse_block(result)?);
            }
            match listing.next_cursor {
                Some(next) if unlimited => cursor = Some(next),
                _ => break,
            }
        }
        log::debug!("Fetched {} children of {}", blocks.len(), node_id);
        Ok(blocks)
    }

    async fn get_page(&self, node_id: &str) -> FetchResult<PageMetadata> {
        let url = self.url(&format!("pages/{}", normalize_id(node_id)));
        let value = self.send(self.client.get(&url), node_id).await?;
        parse_page(&value)
    }

    async fn query_collection(&self, collection_id: &str) -> FetchResult<Vec<CollectionEntry>> {
        let url = self.url(&format!("databases/{}/query", normalize_id(collection_id)));
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({ "page_size": self.page_size });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let value = self
                .send(self.client.post(&url).json(&body), collection_id)
                .await?;
            let listing = parse_listing(&value)?;
            for result in &listing.results {
                entries.push(parse_collection_entry(result)?);
            }
            match listing.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(entries)
    }

    async fn get_collection_title(&self, collection_id: &str) -> FetchResult<String> {
        let url = self.url(&format!("databases/{}", normalize_id(collection_id)));
        let value = self.send(self.client.get(&url), collection_id).await?;
        Ok(parse_database_title(&value))
    }
}

/// Downloads embedded media over plain HTTP(S)
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self, RemoteFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteFetchError::AuthFailed),
            StatusCode::NOT_FOUND => Err(RemoteFetchError::NotFound(url.to_string())),
            status => Err(RemoteFetchError::Server {
                status: status.as_u16(),
                message: format!("asset download failed for {}", url),
            }),
        }
    }
}
