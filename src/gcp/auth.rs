//! GCP Authentication
//!
//! Builds credentials either from a service account key file or from the
//! instance metadata server.

use anyhow::{Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use super::account::AccountFile;
use super::metadata::MetadataTokenSource;

/// OAuth2 token endpoint used for service account keys
pub const TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";

/// Compute Engine read/write scope
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

/// Scopes requested for every token
pub const DEFAULT_SCOPES: &[&str] = &[COMPUTE_SCOPE];

/// Default metadata server root
pub const METADATA_ROOT: &str = "http://metadata.google.internal";

/// Account name the metadata server resolves to the instance's own account
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Where credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account JSON key file
    AccountFile(PathBuf),
    /// Ambient credentials from the metadata server
    Metadata(MetadataEndpoint),
}

/// Metadata server location and account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEndpoint {
    /// Scheme and host, without a trailing slash
    pub root: String,
    pub service_account: String,
}

impl Default for MetadataEndpoint {
    fn default() -> Self {
        Self {
            root: METADATA_ROOT.to_string(),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }
}

impl MetadataEndpoint {
    /// Endpoint on a custom `host[:port]`, as given by `GCE_METADATA_HOST`
    pub fn with_host(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let root = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        Self {
            root,
            ..Self::default()
        }
    }

    /// Token URL for the account; the account name is a single path segment
    pub fn token_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.root)
            .with_context(|| format!("Invalid metadata server root '{}'", self.root))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid metadata server root '{}'", self.root))?
            .pop_if_empty()
            .extend([
                "computeMetadata",
                "v1",
                "instance",
                "service-accounts",
                self.service_account.as_str(),
                "token",
            ]);
        Ok(url)
    }
}

/// Service account key whose token provider is built on first use
#[derive(Clone)]
struct ServiceAccountSource {
    key: String,
    provider: Arc<OnceCell<CustomServiceAccount>>,
}

impl ServiceAccountSource {
    async fn provider(&self) -> Result<&CustomServiceAccount> {
        self.provider
            .get_or_try_init(|| async {
                CustomServiceAccount::from_json(&self.key)
                    .context("Failed to configure service account token source")
            })
            .await
    }
}

#[derive(Clone)]
enum TokenSource {
    ServiceAccount(ServiceAccountSource),
    Metadata(MetadataTokenSource),
}

/// GCP credentials able to mint bearer tokens for [`DEFAULT_SCOPES`]
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    principal: String,
}

impl fmt::Debug for GcpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            TokenSource::ServiceAccount(_) => "service_account",
            TokenSource::Metadata(_) => "metadata",
        };
        f.debug_struct("GcpCredentials")
            .field("kind", &kind)
            .field("principal", &self.principal)
            .finish()
    }
}

impl GcpCredentials {
    /// Build credentials for the given source.
    ///
    /// A key file is read and parsed here; the metadata branch does no I/O.
    /// Neither branch requests a token or checks the key material yet.
    pub fn from_source(source: &CredentialSource) -> Result<Self> {
        match source {
            CredentialSource::AccountFile(path) => {
                let account = AccountFile::load(path)?;
                Self::from_account(&account)
            }
            CredentialSource::Metadata(endpoint) => Self::from_metadata(endpoint),
        }
    }

    /// Credentials signed with a service account key
    pub fn from_account(account: &AccountFile) -> Result<Self> {
        tracing::info!("Requesting Google token...");
        tracing::info!("  -- Email: {}", account.client_email);
        tracing::info!("  -- Scopes: {:?}", DEFAULT_SCOPES);
        tracing::info!("  -- Private Key Length: {}", account.private_key.len());

        let key = serde_json::json!({
            "type": "service_account",
            "private_key_id": account.private_key_id,
            "private_key": account.private_key,
            "client_email": account.client_email,
            "client_id": account.client_id,
            "token_uri": TOKEN_URL,
        });

        Ok(Self {
            source: TokenSource::ServiceAccount(ServiceAccountSource {
                key: key.to_string(),
                provider: Arc::new(OnceCell::new()),
            }),
            principal: account.client_email.clone(),
        })
    }

    /// Credentials served by the metadata server
    pub fn from_metadata(endpoint: &MetadataEndpoint) -> Result<Self> {
        tracing::info!("Requesting Google token via GCE service account...");
        let source = MetadataTokenSource::new(endpoint)?;
        tracing::debug!("Metadata token endpoint: {}", source.token_url());

        Ok(Self {
            source: TokenSource::Metadata(source),
            principal: endpoint.service_account.clone(),
        })
    }

    /// Identity tokens are requested for: the key's client email, or the
    /// metadata account name
    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self.source, TokenSource::Metadata(_))
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        match &self.source {
            TokenSource::ServiceAccount(account) => {
                let token = account
                    .provider()
                    .await?
                    .token(DEFAULT_SCOPES)
                    .await
                    .context("Failed to get access token")?;
                Ok(token.as_str().to_string())
            }
            TokenSource::Metadata(source) => source
                .token(DEFAULT_SCOPES)
                .await
                .context("Failed to get access token from metadata server"),
        }
    }
}
