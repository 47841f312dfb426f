//! GCP API interaction module
//!
//! # Module Structure
//!
//! - [`account`] - Service account key files
//! - [`auth`] - Credential sources and token minting
//! - [`metadata`] - Metadata server token source
//! - [`http`] - Authorized HTTP client for REST calls
//! - [`compute`] - Compute Engine API handle
//!
//! # Example
//!
//! ```ignore
//! use gce_provider::gcp::auth::CredentialSource;
//! use gce_provider::gcp::compute::{ComputeClientBuilder, ComputeServiceBuilder};
//! use gce_provider::gcp::http::AuthorizedClient;
//!
//! async fn example(source: CredentialSource) -> anyhow::Result<()> {
//!     let http = AuthorizedClient::from_source(&source)?;
//!     let compute = ComputeServiceBuilder::new().build(http)?;
//!     let zones = compute.list_zones("my-project", "us-central1").await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod auth;
pub mod compute;
pub mod http;
pub mod metadata;
