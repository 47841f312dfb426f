//! Configuration Management
//!
//! Resolves provider settings from explicit input, an optional settings file,
//! and environment fallback.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::gcp::auth::{CredentialSource, MetadataEndpoint};

/// Fallback for [`Config::account_file`]
pub const ENV_ACCOUNT_FILE: &str = "GOOGLE_ACCOUNT_FILE";
/// Fallback for [`Config::project`]
pub const ENV_PROJECT: &str = "GOOGLE_PROJECT";
/// Fallback for [`Config::region`]
pub const ENV_REGION: &str = "GOOGLE_REGION";
/// Overrides the metadata server host (`host[:port]`)
pub const ENV_METADATA_HOST: &str = "GCE_METADATA_HOST";

/// Read access to environment variables.
///
/// Resolution takes this as a parameter so tests can supply a plain map
/// instead of mutating the process environment.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Environment for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to a service account JSON key file
    #[serde(default)]
    pub account_file: String,
    /// Project ID
    #[serde(default)]
    pub project: String,
    /// Region, e.g. `us-central1`
    #[serde(default)]
    pub region: String,
    /// Metadata server account used when no key file is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
}

impl Config {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gce-provider").join("config.json"))
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file '{}'", path.display()))
    }

    /// Load settings from the default location, if a file exists there
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Overlay non-empty values from `other` on top of `self`
    pub fn merge(mut self, other: Config) -> Self {
        if !other.account_file.is_empty() {
            self.account_file = other.account_file;
        }
        if !other.project.is_empty() {
            self.project = other.project;
        }
        if !other.region.is_empty() {
            self.region = other.region;
        }
        if other.service_account.is_some() {
            self.service_account = other.service_account;
        }
        self
    }

    /// Fill blank settings from the environment.
    ///
    /// A non-empty value is kept as is. A blank one is replaced with the
    /// variable's value verbatim, or the empty string when unset.
    pub fn resolve<E: Environment + ?Sized>(mut self, env: &E) -> Self {
        fill_from_env(&mut self.account_file, env, ENV_ACCOUNT_FILE);
        fill_from_env(&mut self.project, env, ENV_PROJECT);
        fill_from_env(&mut self.region, env, ENV_REGION);
        self
    }

    /// Pick where credentials come from. Only meaningful after [`Config::resolve`].
    pub fn credential_source<E: Environment + ?Sized>(&self, env: &E) -> CredentialSource {
        if !self.account_file.is_empty() {
            return CredentialSource::AccountFile(PathBuf::from(&self.account_file));
        }

        let mut endpoint = match env.var(ENV_METADATA_HOST).filter(|h| !h.is_empty()) {
            Some(host) => MetadataEndpoint::with_host(&host),
            None => MetadataEndpoint::default(),
        };
        if let Some(account) = self.service_account.as_deref().filter(|a| !a.is_empty()) {
            endpoint.service_account = account.to_string();
        }
        CredentialSource::Metadata(endpoint)
    }

    /// Names of required settings that are still blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project.is_empty() {
            missing.push("project");
        }
        if self.region.is_empty() {
            missing.push("region");
        }
        missing
    }

    /// Fail if project or region is blank
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        Err(anyhow::anyhow!(
            "Missing required settings: {}. Set {} / {} or pass --project / --region",
            missing.join(", "),
            ENV_PROJECT,
            ENV_REGION
        ))
    }
}

fn fill_from_env<E: Environment + ?Sized>(value: &mut String, env: &E, key: &str) {
    if value.is_empty() {
        *value = env.var(key).unwrap_or_default();
    }
}
