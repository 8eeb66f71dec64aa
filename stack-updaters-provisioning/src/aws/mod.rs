//! AWS SDK integration: IAM client wrapper, caller identity and the engine
//! that applies declarations directly against the IAM control plane.

pub(crate) mod iam_client;
pub(crate) mod sts;

use crate::engine::ProvisioningEngine;
use crate::error::EngineResult;
use crate::types::{CallerIdentity, Declaration, DeclaredResource, ResourceArgs};
use async_trait::async_trait;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::Client as StsClient;
use iam_client::AwsIamClient;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("IAM client error: {0}")]
    IamError(String),
    #[error("AWS SDK error: {0}")]
    SdkError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;

/// Overrides applied on top of the default AWS configuration chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
}

impl AwsSettings {
    pub async fn load(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        loader.load().await
    }
}

/// Engine that reconciles each declaration by name against IAM.
pub struct AwsEngine {
    iam: AwsIamClient,
    sts_client: StsClient,
}

impl AwsEngine {
    pub fn new(iam_client: IamClient, sts_client: StsClient) -> Self {
        Self {
            iam: AwsIamClient::new(iam_client),
            sts_client,
        }
    }

    pub async fn from_settings(settings: &AwsSettings) -> Self {
        let config = settings.load().await;
        Self::new(IamClient::new(&config), StsClient::new(&config))
    }

    /// Caller identity straight from STS, without going through a run.
    pub async fn resolve_identity(&self) -> AwsResult<CallerIdentity> {
        sts::caller_identity(&self.sts_client).await
    }
}

#[async_trait]
impl ProvisioningEngine for AwsEngine {
    async fn caller_identity(&self) -> EngineResult<CallerIdentity> {
        Ok(self.resolve_identity().await?)
    }

    async fn declare(&self, declaration: &Declaration) -> EngineResult<DeclaredResource> {
        let declared = match &declaration.args {
            ResourceArgs::User(user) => {
                self.iam.ensure_user(user).await?;
                DeclaredResource::new(declaration.clone(), user.name.clone())
            }
            ResourceArgs::AccessKey(key) => {
                let outcome = self.iam.ensure_access_key(&key.user).await?;
                let mut declared = DeclaredResource::new(declaration.clone(), outcome.access_key_id);
                declared.secret_access_key = outcome.secret_access_key;
                declared
            }
            ResourceArgs::Group(group) => {
                self.iam.ensure_group(&group.name).await?;
                DeclaredResource::new(declaration.clone(), group.name.clone())
            }
            ResourceArgs::GroupMembership(membership) => {
                self.iam.ensure_group_membership(membership).await?;
                DeclaredResource::new(declaration.clone(), membership.name.clone())
            }
            ResourceArgs::GroupPolicy(policy) => {
                self.iam
                    .put_group_policy(&policy.group, &policy.name, &policy.policy)
                    .await?;
                DeclaredResource::new(
                    declaration.clone(),
                    format!("{}:{}", policy.group, policy.name),
                )
            }
        };
        Ok(declared)
    }
}
