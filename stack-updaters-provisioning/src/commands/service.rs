//! Stack-updaters service layer
//!
//! Holds the engine and configuration for a run and exposes the operations
//! the CLI calls. Each call to [`ProvisioningService::run`] gets its own
//! [`RunContext`], torn down when the run returns.

use crate::aws::{AwsEngine, AwsSettings};
use crate::commands::provision::provision;
use crate::config::ProvisionConfig;
use crate::engine::{PreviewEngine, ProvisioningEngine, RunContext};
use crate::error::ProvisionResult;
use crate::types::{CallerIdentity, ProvisionOutcome};

/// Main service struct that pairs an engine with the resource configuration
pub struct ProvisioningService {
    engine: Box<dyn ProvisioningEngine>,
    config: ProvisionConfig,
}

impl ProvisioningService {
    /// Create a service that applies declarations against AWS IAM.
    ///
    /// Credentials and region come from the default provider chain, with
    /// `settings` applied on top.
    pub async fn aws(config: ProvisionConfig, settings: &AwsSettings) -> Self {
        Self::with_engine(AwsEngine::from_settings(settings).await, config)
    }

    /// Create a dry-run service for a known identity.
    pub fn preview(config: ProvisionConfig, identity: CallerIdentity) -> Self {
        Self::with_engine(PreviewEngine::new(identity), config)
    }

    pub fn with_engine(engine: impl ProvisioningEngine + 'static, config: ProvisionConfig) -> Self {
        Self {
            engine: Box::new(engine),
            config,
        }
    }

    pub async fn run(&self) -> ProvisionResult<ProvisionOutcome> {
        let mut ctx = RunContext::new(self.engine.as_ref());
        provision(&mut ctx, &self.config).await
    }
}
