//! Compute Engine API client
//!
//! [`ComputeClientBuilder`] is the seam between provider setup and the API
//! client: anything that can turn an [`AuthorizedClient`] into a handle can
//! stand in for [`ComputeServiceBuilder`].

use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

use super::http::AuthorizedClient;

/// Compute Engine v1 REST root
pub const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1/";

/// Builds an API client handle from an authorized transport
pub trait ComputeClientBuilder {
    type Client;

    fn build(&self, http: AuthorizedClient) -> Result<Self::Client>;
}

/// Builds [`ComputeService`] handles
#[derive(Debug, Clone)]
pub struct ComputeServiceBuilder {
    base_url: String,
}

impl Default for ComputeServiceBuilder {
    fn default() -> Self {
        Self {
            base_url: COMPUTE_BASE_URL.to_string(),
        }
    }
}

impl ComputeServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send requests somewhere other than the public endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl ComputeClientBuilder for ComputeServiceBuilder {
    type Client = ComputeService;

    fn build(&self, http: AuthorizedClient) -> Result<ComputeService> {
        ComputeService::new(http, &self.base_url)
    }
}

/// Handle to the Compute Engine API
#[derive(Debug, Clone)]
pub struct ComputeService {
    http: AuthorizedClient,
    base_url: Url,
}

impl ComputeService {
    pub fn new(http: AuthorizedClient, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid compute API base URL '{}'", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!(
                "Invalid compute API base URL '{}'",
                base_url
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    pub fn http(&self) -> &AuthorizedClient {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a project-scoped API URL
    pub fn project_url(&self, project: &str, path: &str) -> String {
        let mut url = format!("{}projects/{}", self.base_url, project);
        if !path.is_empty() {
            url.push('/');
            url.push_str(path);
        }
        url
    }

    /// Build a regional resource URL
    pub fn regional_url(&self, project: &str, region: &str, resource: &str) -> String {
        self.project_url(project, &format!("regions/{}/{}", region, resource))
    }

    /// Build a zonal resource URL
    pub fn zonal_url(&self, project: &str, zone: &str, resource: &str) -> String {
        self.project_url(project, &format!("zones/{}/{}", zone, resource))
    }

    /// Build a global resource URL
    pub fn global_url(&self, project: &str, resource: &str) -> String {
        self.project_url(project, &format!("global/{}", resource))
    }

    // =========================================================================
    // API calls
    // =========================================================================

    /// Fetch a region resource
    pub async fn get_region(&self, project: &str, region: &str) -> Result<Value> {
        self.http
            .get(&self.project_url(project, &format!("regions/{}", region)))
            .await
    }

    /// List zone names that belong to `region`
    pub async fn list_zones(&self, project: &str, region: &str) -> Result<Vec<String>> {
        let zones = self.list_all(&self.project_url(project, "zones")).await?;
        let suffix = format!("/regions/{}", region);

        let mut names: Vec<String> = zones
            .iter()
            .filter(|z| {
                z.get("region")
                    .and_then(|v| v.as_str())
                    .map(|r| r.ends_with(&suffix))
                    .unwrap_or(false)
            })
            .filter_map(|z| z.get("name").and_then(|v| v.as_str()).map(String::from))
            .collect();
        names.sort();

        Ok(names)
    }

    /// List instances in a zone
    pub async fn list_instances(&self, project: &str, zone: &str) -> Result<Vec<Value>> {
        self.list_all(&self.zonal_url(project, zone, "instances"))
            .await
    }

    /// Collect `items` across all pages of a list call
    async fn list_all(&self, url: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_url = match &page_token {
                Some(token) => {
                    let mut u = Url::parse(url).context("Invalid list URL")?;
                    u.query_pairs_mut().append_pair("pageToken", token);
                    u.to_string()
                }
                None => url.to_string(),
            };

            let response = self.http.get(&page_url).await?;
            if let Some(page) = response.get("items").and_then(|v| v.as_array()) {
                items.extend(page.iter().cloned());
            }

            page_token = response
                .get("nextPageToken")
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .map(String::from);
            if page_token.is_none() {
                break;
            }
        }

        Ok(items)
    }
}
