//! Names and properties of the provisioned resources.
//!
//! Defaults describe the standard stack-updaters setup; a JSON file or CLI
//! flags can override any of them.

use crate::error::{ProvisionError, ProvisionResult};
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_USER_NAME: &str = "Jenkins-pulumi-bot";
pub const DEFAULT_USER_PATH: &str = "/system/";
pub const DEFAULT_PURPOSE_TAG: &str = "Account used to perform Pulumi stack updates on CI/CD.";
pub const DEFAULT_GROUP_NAME: &str = "pulumiStackUpdaters";
pub const DEFAULT_MEMBERSHIP_NAME: &str = "cicdUserMembership";
pub const DEFAULT_POLICY_NAME: &str = "pulumiStackUpdatersPolicy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProvisionConfig {
    pub user_name: String,
    pub user_path: String,
    pub user_tags: BTreeMap<String, String>,
    pub group_name: String,
    pub membership_name: String,
    pub policy_name: String,
    /// When set, the run aborts unless the credentials belong to this account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_account: Option<AccountId>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            user_path: DEFAULT_USER_PATH.to_string(),
            user_tags: BTreeMap::from([("purpose".to_string(), DEFAULT_PURPOSE_TAG.to_string())]),
            group_name: DEFAULT_GROUP_NAME.to_string(),
            membership_name: DEFAULT_MEMBERSHIP_NAME.to_string(),
            policy_name: DEFAULT_POLICY_NAME.to_string(),
            expected_account: None,
        }
    }
}

impl ProvisionConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> ProvisionResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ProvisionError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProvisionResult<()> {
        for (field, value) in [
            ("userName", &self.user_name),
            ("groupName", &self.group_name),
            ("membershipName", &self.membership_name),
            ("policyName", &self.policy_name),
        ] {
            if value.trim().is_empty() {
                return Err(ProvisionError::config(format!("{field} must not be empty")));
            }
        }
        // IAM paths begin and end with '/'
        if !self.user_path.starts_with('/') || !self.user_path.ends_with('/') {
            return Err(ProvisionError::config(format!(
                "userPath '{}' must begin and end with '/'",
                self.user_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_describe_stack_updaters_setup() {
        let config = ProvisionConfig::default();
        assert_eq!(config.user_name, "Jenkins-pulumi-bot");
        assert_eq!(config.user_path, "/system/");
        assert_eq!(
            config.user_tags.get("purpose").map(String::as_str),
            Some("Account used to perform Pulumi stack updates on CI/CD.")
        );
        assert_eq!(config.group_name, "pulumiStackUpdaters");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_path_and_empty_names() {
        let config = ProvisionConfig {
            user_path: "system".to_string(),
            ..ProvisionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ProvisionError::Config(_))));

        let config = ProvisionConfig {
            group_name: "  ".to_string(),
            ..ProvisionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("groupName"));
    }

    #[test]
    fn test_from_file_merges_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"userName": "gitlab-bot", "expectedAccount": "123456789012"}}"#
        )
        .unwrap();

        let config = ProvisionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.user_name, "gitlab-bot");
        assert_eq!(config.group_name, DEFAULT_GROUP_NAME);
        assert_eq!(
            config.expected_account.as_ref().map(AccountId::as_str),
            Some("123456789012")
        );
    }

    #[test]
    fn test_from_file_rejects_invalid_account_and_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"expectedAccount": "*"}}"#).unwrap();
        assert!(ProvisionConfig::from_file(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"userNmae": "typo"}}"#).unwrap();
        assert!(ProvisionConfig::from_file(file.path()).is_err());
    }
}
