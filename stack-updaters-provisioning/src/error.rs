//! Error types for provisioning runs

use crate::aws::AwsError;
use crate::types::{AccountId, ResourceKind};
use thiserror::Error;

/// Failure reported by a provisioning engine for one identity query or declaration.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Aws(#[from] AwsError),
    /// The engine refused the declaration (conflict, permission denied, bad property).
    #[error("{0}")]
    Rejected(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error returned by a provisioning run.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Invalid account identifier '{0}': expected a non-empty string of decimal digits")]
    InvalidAccountId(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Identity resolution failed; nothing was declared.
    #[error("Failed to resolve caller identity: {0}")]
    Identity(#[source] EngineError),

    #[error("Caller account {caller_account} does not match expected account {expected_account}")]
    AccountMismatch {
        expected_account: AccountId,
        caller_account: AccountId,
    },

    #[error("{kind} '{logical_name}' depends on '{missing}', which has not been declared in this run")]
    MissingDependency {
        kind: ResourceKind,
        logical_name: String,
        missing: String,
    },

    #[error("{kind} '{logical_name}' was already declared in this run")]
    DuplicateDeclaration {
        kind: ResourceKind,
        logical_name: String,
    },

    /// An engine rejected a declaration. `completed` lists the logical names
    /// accepted before the failure, in submission order.
    #[error(
        "Declaration of {kind} '{logical_name}' failed ({} resource(s) already submitted: [{}]): {source}",
        .completed.len(),
        .completed.join(", ")
    )]
    Declaration {
        kind: ResourceKind,
        logical_name: String,
        completed: Vec<String>,
        #[source]
        source: EngineError,
    },

    #[error("Failed to serialize policy document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProvisionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_error_lists_completed_resources() {
        let err = ProvisionError::Declaration {
            kind: ResourceKind::GroupPolicy,
            logical_name: "pulumiStackUpdatersPolicy".to_string(),
            completed: vec!["lbUser".to_string(), "lbAccessKey".to_string()],
            source: EngineError::Rejected("MalformedPolicyDocument".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("GroupPolicy 'pulumiStackUpdatersPolicy'"));
        assert!(msg.contains("2 resource(s) already submitted: [lbUser, lbAccessKey]"));
        assert!(msg.ends_with("MalformedPolicyDocument"));
    }

    #[test]
    fn test_engine_error_is_preserved_as_source() {
        let err = ProvisionError::Identity(EngineError::Rejected("ExpiredToken".to_string()));
        let source = std::error::Error::source(&err).expect("identity error keeps its source");
        assert_eq!(source.to_string(), "ExpiredToken");
    }
}
