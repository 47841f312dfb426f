//! Authorized HTTP client for GCP REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::auth::{CredentialSource, GcpCredentials};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate long responses and drop control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client that attaches a bearer token to every request
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: Client,
    credentials: GcpCredentials,
}

impl AuthorizedClient {
    pub fn new(credentials: GcpCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Build credentials for `source` and wrap them in a client
    pub fn from_source(source: &CredentialSource) -> Result<Self> {
        Self::new(GcpCredentials::from_source(source)?)
    }

    pub fn credentials(&self) -> &GcpCredentials {
        &self.credentials
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        self.execute(self.client.get(url)).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        self.execute(self.client.delete(url)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value> {
        let token = self.credentials.get_token().await?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format a GCP API error for display
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    let error_str = error.to_string();

    if error_str.contains("API request failed") {
        if error_str.contains("403") {
            return "Permission denied. Check the service account's IAM permissions.".to_string();
        }
        if error_str.contains("401") {
            return "Authentication failed. Check the account file or instance service account."
                .to_string();
        }
        if error_str.contains("404") {
            return "Resource not found. Check the project and region.".to_string();
        }
        if error_str.contains("429") {
            return "Rate limit exceeded. Please try again later.".to_string();
        }
        if error_str.contains("500") || error_str.contains("503") {
            return "GCP service temporarily unavailable. Please try again.".to_string();
        }
        return "Request failed. Check your network connection and try again.".to_string();
    }

    // Keep the whole context chain for local errors (file paths etc.)
    format!("{:#}", error)
}
