//! Dry-run engine that accepts every declaration without touching AWS

use super::ProvisioningEngine;
use crate::error::EngineResult;
use crate::types::{CallerIdentity, Declaration, DeclaredResource, ResourceArgs};
use async_trait::async_trait;

/// Placeholder id for values only the real engine can produce.
pub const COMPUTED_ID: &str = "(known after apply)";

pub struct PreviewEngine {
    identity: CallerIdentity,
}

impl PreviewEngine {
    pub fn new(identity: CallerIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl ProvisioningEngine for PreviewEngine {
    async fn caller_identity(&self) -> EngineResult<CallerIdentity> {
        Ok(self.identity.clone())
    }

    async fn declare(&self, declaration: &Declaration) -> EngineResult<DeclaredResource> {
        let id = match &declaration.args {
            ResourceArgs::User(args) => args.name.clone(),
            ResourceArgs::AccessKey(_) => COMPUTED_ID.to_string(),
            ResourceArgs::Group(args) => args.name.clone(),
            ResourceArgs::GroupMembership(args) => args.name.clone(),
            ResourceArgs::GroupPolicy(args) => format!("{}:{}", args.group, args.name),
        };
        Ok(DeclaredResource::new(declaration.clone(), id))
    }
}
