//! STS helpers for caller identity

use crate::aws::{AwsError, AwsResult};
use crate::types::{AccountId, CallerIdentity};
use aws_sdk_sts::Client as StsClient;

/// Return the identity of the active credentials using STS GetCallerIdentity.
///
/// The account from this call scopes the AssumeRole group policy, so a
/// response without one is an error rather than a fallback to a wildcard.
pub async fn caller_identity(client: &StsClient) -> AwsResult<CallerIdentity> {
    let out = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| AwsError::SdkError(format!("STS GetCallerIdentity failed: {e}")))?;
    let acct = out
        .account()
        .ok_or_else(|| AwsError::SdkError("STS GetCallerIdentity missing Account".to_string()))?;
    let account = AccountId::parse(acct).map_err(|e| AwsError::SdkError(e.to_string()))?;

    Ok(CallerIdentity::new(
        account,
        out.arn().map(std::string::ToString::to_string),
        out.user_id().map(std::string::ToString::to_string),
    ))
}
