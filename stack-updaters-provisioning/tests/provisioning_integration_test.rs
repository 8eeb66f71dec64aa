use async_trait::async_trait;
use stack_updaters_provisioning::{
    render_assume_role_policy, AccountId, CallerIdentity, Declaration, DeclaredResource,
    EngineError, EngineResult, ProvisionConfig, ProvisionError, ProvisioningEngine,
    ProvisioningService, ResourceArgs, ResourceKind,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const ACCOUNT: &str = "123456789012";

/// In-memory engine that records every submission and can be told to fail.
#[derive(Clone, Default)]
struct ScriptedEngine {
    fail_identity: bool,
    fail_on: Option<ResourceKind>,
    submitted: Arc<Mutex<Vec<Declaration>>>,
}

impl ScriptedEngine {
    fn failing_identity() -> Self {
        Self {
            fail_identity: true,
            ..Self::default()
        }
    }

    fn failing_on(kind: ResourceKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Self::default()
        }
    }

    fn submitted(&self) -> Vec<Declaration> {
        self.submitted.lock().unwrap().clone()
    }

    fn submitted_kinds(&self) -> Vec<ResourceKind> {
        self.submitted().iter().map(Declaration::kind).collect()
    }
}

#[async_trait]
impl ProvisioningEngine for ScriptedEngine {
    async fn caller_identity(&self) -> EngineResult<CallerIdentity> {
        if self.fail_identity {
            return Err(EngineError::Rejected(
                "ExpiredToken: the security token included in the request is expired".to_string(),
            ));
        }
        Ok(CallerIdentity::new(
            AccountId::parse(ACCOUNT).unwrap(),
            Some(format!("arn:aws:iam::{ACCOUNT}:user/deployer")),
            Some("AIDAEXAMPLE".to_string()),
        ))
    }

    async fn declare(&self, declaration: &Declaration) -> EngineResult<DeclaredResource> {
        self.submitted.lock().unwrap().push(declaration.clone());
        if self.fail_on == Some(declaration.kind()) {
            return Err(EngineError::Rejected(format!(
                "AccessDenied: cannot create {}",
                declaration.kind()
            )));
        }
        Ok(DeclaredResource::new(
            declaration.clone(),
            format!("id-{}", declaration.logical_name),
        ))
    }
}

fn service(engine: &ScriptedEngine) -> ProvisioningService {
    ProvisioningService::with_engine(engine.clone(), ProvisionConfig::default())
}

#[tokio::test]
async fn test_end_to_end_declares_expected_resources() {
    let engine = ScriptedEngine::default();
    let outcome = service(&engine).run().await.expect("run should succeed");

    let submitted = engine.submitted();
    assert_eq!(submitted.len(), 5);

    let users: Vec<_> = submitted
        .iter()
        .filter_map(|d| match &d.args {
            ResourceArgs::User(user) => Some(user),
            _ => None,
        })
        .collect();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Jenkins-pulumi-bot");
    assert_eq!(users[0].path, "/system/");

    let keys: Vec<_> = submitted
        .iter()
        .filter_map(|d| match &d.args {
            ResourceArgs::AccessKey(key) => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].user, "Jenkins-pulumi-bot");

    let groups: Vec<_> = submitted
        .iter()
        .filter_map(|d| match &d.args {
            ResourceArgs::Group(group) => Some(group),
            _ => None,
        })
        .collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "pulumiStackUpdaters");

    let memberships: Vec<_> = submitted
        .iter()
        .filter_map(|d| match &d.args {
            ResourceArgs::GroupMembership(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].group, "pulumiStackUpdaters");
    assert_eq!(
        memberships[0].users,
        BTreeSet::from(["Jenkins-pulumi-bot".to_string()])
    );

    let policies: Vec<_> = submitted
        .iter()
        .filter_map(|d| match &d.args {
            ResourceArgs::GroupPolicy(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].group, "pulumiStackUpdaters");
    assert_eq!(policies[0].name, "pulumiStackUpdatersPolicy");
    let expected =
        render_assume_role_policy("aws", &AccountId::parse(ACCOUNT).unwrap()).unwrap();
    assert_eq!(policies[0].policy, expected);

    assert_eq!(outcome.identity.account.as_str(), ACCOUNT);
    assert_eq!(outcome.resources.len(), 5);
}

#[tokio::test]
async fn test_identity_failure_declares_nothing() {
    let engine = ScriptedEngine::failing_identity();
    let result = service(&engine).run().await;

    match result {
        Err(ProvisionError::Identity(EngineError::Rejected(msg))) => {
            assert!(msg.starts_with("ExpiredToken"));
        }
        other => panic!("expected identity error, got {other:?}"),
    }
    assert!(engine.submitted().is_empty());
}

#[tokio::test]
async fn test_user_failure_short_circuits_dependents() {
    let engine = ScriptedEngine::failing_on(ResourceKind::User);
    let result = service(&engine).run().await;

    match result {
        Err(ProvisionError::Declaration {
            kind, completed, ..
        }) => {
            assert_eq!(kind, ResourceKind::User);
            assert!(completed.is_empty());
        }
        other => panic!("expected declaration error, got {other:?}"),
    }
    assert_eq!(engine.submitted_kinds(), vec![ResourceKind::User]);
}

#[tokio::test]
async fn test_access_key_failure_stops_the_run() {
    let engine = ScriptedEngine::failing_on(ResourceKind::AccessKey);
    let result = service(&engine).run().await;

    assert!(matches!(
        result,
        Err(ProvisionError::Declaration {
            kind: ResourceKind::AccessKey,
            ..
        })
    ));
    assert_eq!(
        engine.submitted_kinds(),
        vec![ResourceKind::User, ResourceKind::AccessKey]
    );
}

#[tokio::test]
async fn test_membership_failure_is_reported() {
    let engine = ScriptedEngine::failing_on(ResourceKind::GroupMembership);
    let result = service(&engine).run().await;

    match result {
        Err(ProvisionError::Declaration {
            kind,
            logical_name,
            completed,
            source,
        }) => {
            assert_eq!(kind, ResourceKind::GroupMembership);
            assert_eq!(logical_name, "cicdUserMembership");
            assert_eq!(
                completed,
                vec!["lbUser", "lbAccessKey", "pulumiStackUpdaters"]
            );
            assert!(source.to_string().starts_with("AccessDenied"));
        }
        other => panic!("expected declaration error, got {other:?}"),
    }
    // No policy is attached once membership has failed
    assert!(!engine.submitted_kinds().contains(&ResourceKind::GroupPolicy));
}

#[tokio::test]
async fn test_policy_failure_is_reported() {
    let engine = ScriptedEngine::failing_on(ResourceKind::GroupPolicy);
    let result = service(&engine).run().await;

    match result {
        Err(ProvisionError::Declaration {
            kind, completed, ..
        }) => {
            assert_eq!(kind, ResourceKind::GroupPolicy);
            assert_eq!(completed.len(), 4);
        }
        other => panic!("expected declaration error, got {other:?}"),
    }
    assert_eq!(engine.submitted().len(), 5);
}

#[tokio::test]
async fn test_custom_names_flow_through_declarations() {
    let engine = ScriptedEngine::default();
    let config = ProvisionConfig {
        user_name: "gitlab-deployer".to_string(),
        group_name: "deployers".to_string(),
        ..ProvisionConfig::default()
    };
    ProvisioningService::with_engine(engine.clone(), config)
        .run()
        .await
        .unwrap();

    let membership = engine
        .submitted()
        .into_iter()
        .find_map(|d| match d.args {
            ResourceArgs::GroupMembership(m) => Some(m),
            _ => None,
        })
        .unwrap();
    assert_eq!(membership.group, "deployers");
    assert!(membership.users.contains("gitlab-deployer"));
}
