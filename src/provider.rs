//! Provider setup
//!
//! Ties settings resolution, credential selection and compute client
//! construction together.

use anyhow::{Context, Result};

use crate::config::{Config, Environment};
use crate::gcp::compute::{ComputeClientBuilder, ComputeService};
use crate::gcp::http::AuthorizedClient;

/// Provider configuration and the compute client built from it
pub struct ProviderConfig<C = ComputeService> {
    config: Config,
    client_compute: Option<C>,
}

impl<C> ProviderConfig<C> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client_compute: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Settings to use on the next [`ProviderConfig::load_and_validate`]
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The compute client, once [`ProviderConfig::load_and_validate`] succeeded
    pub fn compute(&self) -> Option<&C> {
        self.client_compute.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.client_compute.is_some()
    }

    /// Resolve settings, authenticate and build the compute client.
    ///
    /// Calling this again re-authenticates and replaces the client. On error
    /// no client is left behind.
    pub fn load_and_validate<B, E>(&mut self, env: &E, builder: &B) -> Result<&C>
    where
        B: ComputeClientBuilder<Client = C>,
        E: Environment + ?Sized,
    {
        self.client_compute = None;
        self.config = std::mem::take(&mut self.config).resolve(env);

        let missing = self.config.missing_fields();
        if !missing.is_empty() {
            tracing::warn!("Provider settings left blank: {}", missing.join(", "));
        }

        let source = self.config.credential_source(env);
        let http = AuthorizedClient::from_source(&source)?;

        tracing::info!("Instantiating GCE client...");
        let client = builder
            .build(http)
            .context("Failed to instantiate compute client")?;

        Ok(self.client_compute.insert(client))
    }
}
