//! The provisioning pipeline: identity, user, access key, group, membership, policy.
//!
//! Each step is submitted only after the resources it references were
//! accepted, and the first failure ends the run. Nothing is retried or rolled
//! back here; a failed run is simply re-invoked and the engine converges.

use crate::config::ProvisionConfig;
use crate::engine::RunContext;
use crate::error::{ProvisionError, ProvisionResult};
use crate::synthesis::build_assume_role_policy;
use crate::types::{
    AccessKeyArgs, Declaration, DeclaredResource, GroupArgs, GroupHandle, GroupMembershipArgs,
    GroupPolicyArgs, ProvisionOutcome, ResourceArgs, UserArgs, UserHandle,
};
use log::info;

pub const USER_LOGICAL_NAME: &str = "lbUser";
pub const ACCESS_KEY_LOGICAL_NAME: &str = "lbAccessKey";
pub const GROUP_LOGICAL_NAME: &str = "pulumiStackUpdaters";
pub const MEMBERSHIP_LOGICAL_NAME: &str = "cicdUserMembership";
pub const POLICY_LOGICAL_NAME: &str = "pulumiStackUpdatersPolicy";

/// Run the full pipeline against the engine behind `ctx`.
pub async fn provision(
    ctx: &mut RunContext<'_>,
    config: &ProvisionConfig,
) -> ProvisionResult<ProvisionOutcome> {
    config.validate()?;

    let identity = ctx.resolve_identity().await?;
    if let Some(expected) = &config.expected_account {
        if *expected != identity.account {
            return Err(ProvisionError::AccountMismatch {
                expected_account: expected.clone(),
                caller_account: identity.account,
            });
        }
    }

    let user = declare_user(ctx, config).await?;
    declare_access_key(ctx, &user).await?;
    let group = declare_group(ctx, config).await?;
    declare_group_membership(ctx, &config.membership_name, &group, &[&user]).await?;

    let policy = build_assume_role_policy(&identity.partition, &identity.account);
    declare_group_policy(ctx, &config.policy_name, &group, policy.to_json()?).await?;

    info!(
        "Submitted {} declarations for account {}",
        ctx.declared().len(),
        identity.account
    );
    Ok(ProvisionOutcome {
        identity,
        resources: ctx.declared().to_vec(),
        policy,
    })
}

pub async fn declare_user(
    ctx: &mut RunContext<'_>,
    config: &ProvisionConfig,
) -> ProvisionResult<UserHandle> {
    let declared = ctx
        .declare(Declaration::new(
            USER_LOGICAL_NAME,
            ResourceArgs::User(UserArgs {
                name: config.user_name.clone(),
                path: config.user_path.clone(),
                tags: config.user_tags.clone(),
            }),
        ))
        .await?;
    Ok(UserHandle {
        logical_name: declared.declaration.logical_name,
        name: config.user_name.clone(),
    })
}

pub async fn declare_access_key(
    ctx: &mut RunContext<'_>,
    user: &UserHandle,
) -> ProvisionResult<DeclaredResource> {
    ctx.declare(
        Declaration::new(
            ACCESS_KEY_LOGICAL_NAME,
            ResourceArgs::AccessKey(AccessKeyArgs {
                user: user.name.clone(),
            }),
        )
        .depends_on(&user.logical_name),
    )
    .await
}

pub async fn declare_group(
    ctx: &mut RunContext<'_>,
    config: &ProvisionConfig,
) -> ProvisionResult<GroupHandle> {
    let declared = ctx
        .declare(Declaration::new(
            GROUP_LOGICAL_NAME,
            ResourceArgs::Group(GroupArgs {
                name: config.group_name.clone(),
            }),
        ))
        .await?;
    Ok(GroupHandle {
        logical_name: declared.declaration.logical_name,
        name: config.group_name.clone(),
    })
}

pub async fn declare_group_membership(
    ctx: &mut RunContext<'_>,
    name: &str,
    group: &GroupHandle,
    members: &[&UserHandle],
) -> ProvisionResult<DeclaredResource> {
    let mut declaration = Declaration::new(
        MEMBERSHIP_LOGICAL_NAME,
        ResourceArgs::GroupMembership(GroupMembershipArgs {
            name: name.to_string(),
            group: group.name.clone(),
            users: members.iter().map(|u| u.name.clone()).collect(),
        }),
    )
    .depends_on(&group.logical_name);
    for member in members {
        declaration = declaration.depends_on(&member.logical_name);
    }
    ctx.declare(declaration).await
}

pub async fn declare_group_policy(
    ctx: &mut RunContext<'_>,
    name: &str,
    group: &GroupHandle,
    policy_json: String,
) -> ProvisionResult<DeclaredResource> {
    ctx.declare(
        Declaration::new(
            POLICY_LOGICAL_NAME,
            ResourceArgs::GroupPolicy(GroupPolicyArgs {
                name: name.to_string(),
                group: group.name.clone(),
                policy: policy_json,
            }),
        )
        .depends_on(&group.logical_name),
    )
    .await
}
