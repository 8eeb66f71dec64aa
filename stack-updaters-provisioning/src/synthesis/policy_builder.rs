//! Group policy letting members assume any role in their own account.
//!
//! Members of the stack-updaters group hold no permissions of their own; they
//! call `sts:AssumeRole` to pick up a more permissive role for the duration of
//! a stack update. The resource is scoped to the resolved caller account so
//! the grant never reaches roles in other accounts.

use crate::error::ProvisionResult;
use crate::types::{AccountId, Effect, PolicyDocument, Statement, DEFAULT_PARTITION};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";

/// Build the AssumeRole policy for `account` in `partition`.
pub fn build_assume_role_policy(partition: &str, account: &AccountId) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![Statement {
            action: vec![ASSUME_ROLE_ACTION.to_string()],
            effect: Effect::Allow,
            resource: format!("arn:{partition}:iam::{account}:role/*"),
            sid: String::new(),
        }],
    }
}

/// Same as [`build_assume_role_policy`] in the commercial `aws` partition.
pub fn build_default_assume_role_policy(account: &AccountId) -> PolicyDocument {
    build_assume_role_policy(DEFAULT_PARTITION, account)
}

/// Render the policy to the JSON string attached to the group.
pub fn render_assume_role_policy(partition: &str, account: &AccountId) -> ProvisionResult<String> {
    build_assume_role_policy(partition, account).to_json()
}
