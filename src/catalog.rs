use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use thiserror::Error;

/// One entry of the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct ContentItem {
    pub name: String,
    pub year: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("fetch catalog: {0}")]
    Network(#[from] reqwest::Error),
    #[error("decode catalog: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can produce the full, sorted catalog.
pub trait CatalogSource: Send + Sync {
    fn fetch_catalog(&self) -> Result<Vec<ContentItem>, CatalogError>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("catalog client user agent required");
        }
        if config.url.trim().is_empty() {
            bail!("catalog url required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => build_http_client(&config.user_agent, config.timeout)?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            url: config.url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Shared with the link checker so probes reuse the same connection pool.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

impl CatalogSource for Client {
    fn fetch_catalog(&self) -> Result<Vec<ContentItem>, CatalogError> {
        tracing::debug!(url = %self.url, "fetching catalog");
        let body = self
            .http
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .bytes()?;
        let items = parse_catalog(&body)?;
        tracing::info!(items = items.len(), "catalog loaded");
        Ok(items)
    }
}

pub fn build_http_client(user_agent: &str, timeout: Option<Duration>) -> Result<HttpClient> {
    let mut builder = HttpClient::builder().user_agent(user_agent.to_string());
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("build catalog HTTP client")
}

/// Decodes a JSON array of items and returns it sorted by name.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<ContentItem>, CatalogError> {
    let mut items: Vec<ContentItem> = serde_json::from_slice(body)?;
    sort_catalog(&mut items);
    Ok(items)
}

/// Case-insensitive ascending by name. Stable, so equal keys keep input order.
pub fn sort_catalog(items: &mut [ContentItem]) {
    items.sort_by_cached_key(|item| item.name.to_lowercase());
}
