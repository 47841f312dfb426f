//! Instance metadata token source
//!
//! Fetches access tokens for the instance's attached service account from
//! the metadata server. Construction performs no I/O; the first token is
//! requested on first use.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::auth::MetadataEndpoint;

const METADATA_FLAVOR: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Token source backed by the metadata server
#[derive(Clone)]
pub struct MetadataTokenSource {
    client: Client,
    token_url: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl MetadataTokenSource {
    pub fn new(endpoint: &MetadataEndpoint) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .context("Failed to create metadata HTTP client")?;

        Ok(Self {
            client,
            token_url: endpoint.token_url()?.to_string(),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Get an access token, reusing the cached one while it is still valid
    pub async fn token(&self, scopes: &[&str]) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached metadata token expired, fetching new token");
            }
        }

        let cached = self.fetch(scopes).await?;
        let token = cached.token.clone();
        *self.token_cache.write().await = Some(cached);

        Ok(token)
    }

    async fn fetch(&self, scopes: &[&str]) -> Result<CachedToken> {
        tracing::debug!("GET {}", self.token_url);

        let response = self
            .client
            .get(&self.token_url)
            .query(&[("scopes", scopes.join(","))])
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .send()
            .await
            .context("Failed to reach the metadata server")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Metadata server token request failed: {}",
                status
            ));
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse metadata token response")?;

        // Metadata tokens normally live for an hour
        let ttl = Duration::from_secs(body.expires_in.unwrap_or(3600));
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER),
        })
    }
}
