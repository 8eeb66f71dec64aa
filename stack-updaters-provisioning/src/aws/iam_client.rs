//! AWS IAM client wrapper for the stack-updaters resources
//!
//! Every operation is keyed by name and safe to repeat: a re-run converges on
//! the declared state instead of failing on resources that already exist.

use crate::aws::{AwsError, AwsResult};
use crate::types::{GroupMembershipArgs, UserArgs};
use aws_sdk_iam::types::{AccessKeyMetadata, StatusType, Tag};
use aws_sdk_iam::Client as IamClient;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Access key chosen for a user. `secret_access_key` is only known when the
/// key was created by this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AccessKeyOutcome {
    pub access_key_id: String,
    pub secret_access_key: Option<String>,
}

pub struct AwsIamClient {
    client: IamClient,
}

impl AwsIamClient {
    pub fn new(client: IamClient) -> Self {
        Self { client }
    }

    /// Create the user, or bring an existing user's path and tags in line.
    pub async fn ensure_user(&self, user: &UserArgs) -> AwsResult<()> {
        let tags = build_tags(&user.tags)?;

        let created = self
            .client
            .create_user()
            .user_name(&user.name)
            .path(&user.path)
            .set_tags(Some(tags.clone()))
            .send()
            .await;

        match created {
            Ok(_) => {
                debug!("Created IAM user '{}'", user.name);
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_entity_already_exists_exception()) =>
            {
                debug!("IAM user '{}' already exists, updating", user.name);
                self.client
                    .update_user()
                    .user_name(&user.name)
                    .new_path(&user.path)
                    .send()
                    .await
                    .map_err(|e| {
                        AwsError::IamError(format!(
                            "Failed to update path of user '{}': {e:?}",
                            user.name
                        ))
                    })?;
                self.reconcile_user_tags(&user.name, &user.tags, tags).await
            }
            Err(e) => Err(AwsError::IamError(format!(
                "Failed to create user '{}': {e:?}",
                user.name
            ))),
        }
    }

    /// Make the declared tags the user's exact tag set.
    async fn reconcile_user_tags(
        &self,
        user_name: &str,
        desired: &BTreeMap<String, String>,
        tags: Vec<Tag>,
    ) -> AwsResult<()> {
        let mut current_keys = Vec::new();
        let mut pages = self
            .client
            .list_user_tags()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.try_next().await.map_err(|e| {
            AwsError::IamError(format!("Failed to list tags of user '{user_name}': {e:?}"))
        })? {
            current_keys.extend(page.tags.iter().map(|t| t.key().to_string()));
        }

        let stale = stale_tag_keys(&current_keys, desired);
        if !stale.is_empty() {
            debug!("Removing undeclared tags {stale:?} from user '{user_name}'");
            self.client
                .untag_user()
                .user_name(user_name)
                .set_tag_keys(Some(stale))
                .send()
                .await
                .map_err(|e| {
                    AwsError::IamError(format!("Failed to untag user '{user_name}': {e:?}"))
                })?;
        }
        if !tags.is_empty() {
            self.client
                .tag_user()
                .user_name(user_name)
                .set_tags(Some(tags))
                .send()
                .await
                .map_err(|e| {
                    AwsError::IamError(format!("Failed to tag user '{user_name}': {e:?}"))
                })?;
        }
        Ok(())
    }

    /// Reuse the user's active access key, or create one.
    pub(crate) async fn ensure_access_key(&self, user_name: &str) -> AwsResult<AccessKeyOutcome> {
        let mut existing = Vec::new();
        let mut pages = self
            .client
            .list_access_keys()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.try_next().await.map_err(|e| {
            AwsError::IamError(format!(
                "Failed to list access keys of user '{user_name}': {e:?}"
            ))
        })? {
            existing.extend(page.access_key_metadata);
        }

        if let Some(access_key_id) = reusable_key(&existing) {
            warn!(
                "User '{user_name}' already has active access key {access_key_id}; reusing it, its secret is not retrievable"
            );
            return Ok(AccessKeyOutcome {
                access_key_id,
                secret_access_key: None,
            });
        }
        if !existing.is_empty() {
            warn!(
                "User '{user_name}' has {} access key(s) but none is active; creating a new one",
                existing.len()
            );
        }

        let created = self
            .client
            .create_access_key()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_limit_exceeded_exception())
                {
                    AwsError::IamError(format!(
                        "User '{user_name}' has no active access key and already holds the maximum number of keys; delete an inactive key and re-run"
                    ))
                } else {
                    AwsError::IamError(format!(
                        "Failed to create access key for user '{user_name}': {e:?}"
                    ))
                }
            })?;
        let key = created.access_key().ok_or_else(|| {
            AwsError::IamError(format!(
                "CreateAccessKey for user '{user_name}' returned no key"
            ))
        })?;
        debug!("Created access key {} for '{user_name}'", key.access_key_id());

        Ok(AccessKeyOutcome {
            access_key_id: key.access_key_id().to_string(),
            secret_access_key: Some(key.secret_access_key().to_string()),
        })
    }

    pub async fn ensure_group(&self, group_name: &str) -> AwsResult<()> {
        match self.client.create_group().group_name(group_name).send().await {
            Ok(_) => {
                debug!("Created IAM group '{group_name}'");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_entity_already_exists_exception()) =>
            {
                debug!("IAM group '{group_name}' already exists");
                Ok(())
            }
            Err(e) => Err(AwsError::IamError(format!(
                "Failed to create group '{group_name}': {e:?}"
            ))),
        }
    }

    /// Make `membership.users` the exact member set of the group.
    pub async fn ensure_group_membership(&self, membership: &GroupMembershipArgs) -> AwsResult<()> {
        let group = &membership.group;
        let mut current_members = BTreeSet::new();
        let mut pages = self
            .client
            .get_group()
            .group_name(group)
            .into_paginator()
            .send();
        while let Some(page) = pages
            .try_next()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to get group '{group}': {e:?}")))?
        {
            current_members.extend(page.users.iter().map(|u| u.user_name().to_string()));
        }
        let (to_add, to_remove) = membership_changes(&current_members, &membership.users);

        for user in to_remove {
            warn!("Removing '{user}' from group '{group}': not a declared member");
            self.client
                .remove_user_from_group()
                .group_name(group)
                .user_name(user)
                .send()
                .await
                .map_err(|e| {
                    AwsError::IamError(format!(
                        "Failed to remove user '{user}' from group '{group}': {e:?}"
                    ))
                })?;
        }
        for user in to_add {
            self.client
                .add_user_to_group()
                .group_name(group)
                .user_name(user)
                .send()
                .await
                .map_err(|e| {
                    AwsError::IamError(format!(
                        "Failed to add user '{user}' to group '{group}': {e:?}"
                    ))
                })?;
            debug!("Added '{user}' to group '{group}'");
        }
        Ok(())
    }

    pub async fn put_group_policy(
        &self,
        group_name: &str,
        policy_name: &str,
        policy_json: &str,
    ) -> AwsResult<()> {
        self.client
            .put_group_policy()
            .group_name(group_name)
            .policy_name(policy_name)
            .policy_document(policy_json)
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!(
                    "Failed to put group policy '{policy_name}' on group '{group_name}': {e:?}"
                ))
            })?;
        Ok(())
    }
}

fn build_tags(tags: &BTreeMap<String, String>) -> AwsResult<Vec<Tag>> {
    tags.iter()
        .map(|(key, value)| {
            Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|e| AwsError::ConfigError(format!("Invalid tag '{key}': {e}")))
        })
        .collect()
}

/// First key that is still usable. Inactive keys are never handed to CI.
fn reusable_key(keys: &[AccessKeyMetadata]) -> Option<String> {
    keys.iter()
        .filter(|meta| meta.status() == Some(&StatusType::Active))
        .find_map(|meta| meta.access_key_id().map(std::string::ToString::to_string))
}

/// Tag keys present on the user but no longer declared.
fn stale_tag_keys(current: &[String], desired: &BTreeMap<String, String>) -> Vec<String> {
    current
        .iter()
        .filter(|key| !desired.contains_key(key.as_str()))
        .cloned()
        .collect()
}

/// Users to add and users to remove so that `current` becomes `desired`.
fn membership_changes<'a>(
    current: &'a BTreeSet<String>,
    desired: &'a BTreeSet<String>,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let to_add = desired.difference(current).map(String::as_str).collect();
    let to_remove = current.difference(desired).map(String::as_str).collect();
    (to_add, to_remove)
}
