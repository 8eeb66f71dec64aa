use crate::error::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// AWS account identifier: a non-empty string of decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> ProvisionResult<Self> {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ProvisionError::InvalidAccountId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DEFAULT_PARTITION: &str = "aws";

/// Effective identity of the credentials a run is executing with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub account: AccountId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub partition: String,
}

impl CallerIdentity {
    /// Build an identity, taking the partition from the caller ARN when present.
    pub fn new(account: AccountId, arn: Option<String>, user_id: Option<String>) -> Self {
        let partition = arn
            .as_deref()
            .and_then(partition_from_arn)
            .unwrap_or(DEFAULT_PARTITION)
            .to_string();
        Self {
            account,
            arn,
            user_id,
            partition,
        }
    }

    /// Identity known up front (no ARN), e.g. for a dry run.
    pub fn for_account(account: AccountId, partition: &str) -> Self {
        Self {
            account,
            arn: None,
            user_id: None,
            partition: partition.to_string(),
        }
    }
}

/// Partition is field 2 of `arn:partition:service:region:account:resource`
fn partition_from_arn(arn: &str) -> Option<&str> {
    let mut parts = arn.split(':');
    match (parts.next(), parts.next()) {
        (Some("arn"), Some(partition)) if !partition.is_empty() => Some(partition),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: Vec<String>,
    pub effect: Effect,
    pub resource: String,
    pub sid: String,
}

/// IAM policy document. Field order matches the IAM policy grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn to_json(&self) -> ProvisionResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    User,
    AccessKey,
    Group,
    GroupMembership,
    GroupPolicy,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "User",
            Self::AccessKey => "AccessKey",
            Self::Group => "Group",
            Self::GroupMembership => "GroupMembership",
            Self::GroupPolicy => "GroupPolicy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserArgs {
    pub name: String,
    pub path: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyArgs {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupArgs {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembershipArgs {
    pub name: String,
    pub group: String,
    pub users: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicyArgs {
    pub name: String,
    pub group: String,
    pub policy: String,
}

/// Desired properties of one resource, by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "properties")]
pub enum ResourceArgs {
    User(UserArgs),
    AccessKey(AccessKeyArgs),
    Group(GroupArgs),
    GroupMembership(GroupMembershipArgs),
    GroupPolicy(GroupPolicyArgs),
}

impl ResourceArgs {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::User,
            Self::AccessKey(_) => ResourceKind::AccessKey,
            Self::Group(_) => ResourceKind::Group,
            Self::GroupMembership(_) => ResourceKind::GroupMembership,
            Self::GroupPolicy(_) => ResourceKind::GroupPolicy,
        }
    }
}

/// A resource declaration handed to a provisioning engine.
///
/// `depends_on` names the logical resources that must have been accepted
/// earlier in the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub logical_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(flatten)]
    pub args: ResourceArgs,
}

impl Declaration {
    pub fn new(logical_name: impl Into<String>, args: ResourceArgs) -> Self {
        Self {
            logical_name: logical_name.into(),
            depends_on: Vec::new(),
            args,
        }
    }

    #[must_use]
    pub fn depends_on(mut self, logical_name: impl Into<String>) -> Self {
        self.depends_on.push(logical_name.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.args.kind()
    }
}

/// A declaration the engine accepted, with the identifier it assigned.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredResource {
    #[serde(flatten)]
    pub declaration: Declaration,
    pub id: String,
    /// Only set when an access key was created by this run.
    #[serde(skip)]
    pub secret_access_key: Option<String>,
}

impl DeclaredResource {
    pub fn new(declaration: Declaration, id: impl Into<String>) -> Self {
        Self {
            declaration,
            id: id.into(),
            secret_access_key: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.declaration.kind()
    }

    pub fn logical_name(&self) -> &str {
        &self.declaration.logical_name
    }
}

impl fmt::Debug for DeclaredResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredResource")
            .field("declaration", &self.declaration)
            .field("id", &self.id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Reference to a user accepted earlier in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub(crate) logical_name: String,
    pub(crate) name: String,
}

impl UserHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Reference to a group accepted earlier in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub(crate) logical_name: String,
    pub(crate) name: String,
}

impl GroupHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Result of a run in which every declaration was accepted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionOutcome {
    pub identity: CallerIdentity,
    pub resources: Vec<DeclaredResource>,
    pub policy: PolicyDocument,
}

impl ProvisionOutcome {
    pub fn resource(&self, kind: ResourceKind) -> Option<&DeclaredResource> {
        self.resources.iter().find(|r| r.kind() == kind)
    }
}
