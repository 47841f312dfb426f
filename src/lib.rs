//! Configure and authenticate a Google Compute Engine API client.
//!
//! Settings come from explicit values with environment fallback
//! (`GOOGLE_ACCOUNT_FILE`, `GOOGLE_PROJECT`, `GOOGLE_REGION`). With an account
//! file, tokens are minted from the service account key; without one, they
//! come from the instance metadata server.
//!
//! ```ignore
//! use gce_provider::config::{Config, ProcessEnv};
//! use gce_provider::gcp::compute::ComputeServiceBuilder;
//! use gce_provider::provider::ProviderConfig;
//!
//! let mut provider = ProviderConfig::new(Config::default());
//! let compute = provider.load_and_validate(&ProcessEnv, &ComputeServiceBuilder::new())?;
//! ```

pub mod config;
pub mod gcp;
pub mod provider;

/// Version injected at compile time via GCE_PROVIDER_VERSION env var,
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCE_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
