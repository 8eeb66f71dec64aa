//! This crate provides the core logic for the stack-updaters IAM bootstrap:
//! - AssumeRole group policy synthesis
//! - Resource declarations and the per-run declaration context
//! - The provisioning pipeline (user, access key, group, membership, policy)
//! - An engine applying declarations directly against AWS IAM
//!

pub mod aws;
pub mod commands;
pub mod config;
pub mod engine;
mod error;
pub mod synthesis;
mod types;

// Re-exports for a small, focused public API
pub use aws::{AwsEngine, AwsError, AwsSettings};
pub use commands::ProvisioningService;
pub use config::ProvisionConfig;
pub use engine::{PreviewEngine, ProvisioningEngine, RunContext};
pub use error::{EngineError, EngineResult, ProvisionError, ProvisionResult};
pub use synthesis::{
    build_assume_role_policy, build_default_assume_role_policy, render_assume_role_policy,
};
pub use types::{
    AccessKeyArgs, AccountId, CallerIdentity, Declaration, DeclaredResource, Effect, GroupArgs,
    GroupHandle, GroupMembershipArgs, GroupPolicyArgs, PolicyDocument, ProvisionOutcome,
    ResourceArgs, ResourceKind, Statement, UserArgs, UserHandle, DEFAULT_PARTITION,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for_sample_account() {
        let account = AccountId::parse("123456789012").expect("should parse");
        let policy = build_default_assume_role_policy(&account);
        assert_eq!(
            policy.statement[0].resource,
            "arn:aws:iam::123456789012:role/*"
        );
    }
}
