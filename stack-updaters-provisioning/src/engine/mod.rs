//! Provisioning engine boundary and the per-run declaration context.
//!
//! A [`ProvisioningEngine`] is the sink that turns declarations into remote
//! resources. It is opaque to the driver: the driver submits one declaration
//! at a time, in dependency order, and stops at the first rejection.

pub mod preview;

use crate::error::{EngineResult, ProvisionError, ProvisionResult};
use crate::types::{CallerIdentity, Declaration, DeclaredResource};
use async_trait::async_trait;
use log::{debug, info};

pub use preview::PreviewEngine;

/// Engine trait
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Resolve the account, ARN and partition of the active credentials.
    async fn caller_identity(&self) -> EngineResult<CallerIdentity>;

    /// Create or update the declared resource so that it matches `declaration`.
    async fn declare(&self, declaration: &Declaration) -> EngineResult<DeclaredResource>;
}

/// Sink handle scoped to a single run.
///
/// Declarations go through [`RunContext::declare`], which refuses anything
/// whose dependencies were not accepted earlier in the same run.
pub struct RunContext<'e> {
    engine: &'e dyn ProvisioningEngine,
    declared: Vec<DeclaredResource>,
}

impl<'e> RunContext<'e> {
    pub fn new(engine: &'e dyn ProvisioningEngine) -> Self {
        Self {
            engine,
            declared: Vec::new(),
        }
    }

    pub async fn resolve_identity(&self) -> ProvisionResult<CallerIdentity> {
        let identity = self
            .engine
            .caller_identity()
            .await
            .map_err(ProvisionError::Identity)?;
        debug!(
            "Resolved caller identity: account {} in partition {}",
            identity.account, identity.partition
        );
        Ok(identity)
    }

    pub async fn declare(&mut self, declaration: Declaration) -> ProvisionResult<DeclaredResource> {
        let kind = declaration.kind();

        if self.is_declared(&declaration.logical_name) {
            return Err(ProvisionError::DuplicateDeclaration {
                kind,
                logical_name: declaration.logical_name,
            });
        }
        if let Some(missing) = declaration
            .depends_on
            .iter()
            .find(|dep| !self.is_declared(dep))
        {
            return Err(ProvisionError::MissingDependency {
                kind,
                logical_name: declaration.logical_name.clone(),
                missing: missing.clone(),
            });
        }

        info!("Declaring {} '{}'", kind, declaration.logical_name);
        let declared = self
            .engine
            .declare(&declaration)
            .await
            .map_err(|source| ProvisionError::Declaration {
                kind,
                logical_name: declaration.logical_name.clone(),
                completed: self
                    .declared
                    .iter()
                    .map(|r| r.logical_name().to_string())
                    .collect(),
                source,
            })?;
        info!("{} '{}' accepted as '{}'", kind, declared.logical_name(), declared.id);

        self.declared.push(declared.clone());
        Ok(declared)
    }

    /// Resources accepted so far, in submission order.
    pub fn declared(&self) -> &[DeclaredResource] {
        &self.declared
    }

    fn is_declared(&self, logical_name: &str) -> bool {
        self.declared
            .iter()
            .any(|r| r.logical_name() == logical_name)
    }
}
