use crate::deploy::Deploy;
use crate::error::SignerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an in-flight signing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Unsigned,
    Signed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Signed | RequestStatus::Failed)
    }
}

/// Why a request ended up `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum RequestFailure {
    UserCancelled,
    KeyChangedDuringSigning,
    NullPayload,
    ParseFailure(String),
    SigningFailed(String),
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // same text the submitter receives
        fmt::Display::fmt(&SignerError::from(self.clone()), f)
    }
}

impl From<RequestFailure> for SignerError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::UserCancelled => SignerError::Cancelled,
            RequestFailure::KeyChangedDuringSigning => SignerError::KeyChangedDuringSigning,
            RequestFailure::NullPayload => SignerError::NullPayload,
            RequestFailure::ParseFailure(msg) => SignerError::ParseFailure(msg),
            RequestFailure::SigningFailed(msg) => SignerError::SigningFailed(msg),
        }
    }
}

/// A deploy waiting for (or done with) the user's decision.
///
/// `signing_key` is fixed at submission; only the manager changes `status`,
/// `deploy` and `error`, and only through its finalize step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningRequest {
    id: RequestId,
    status: RequestStatus,
    deploy: Option<Deploy>,
    signing_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RequestFailure>,
    created_at: DateTime<Utc>,
}

impl SigningRequest {
    pub(crate) fn unsigned(id: RequestId, deploy: Deploy, signing_key: String) -> Self {
        Self {
            id,
            status: RequestStatus::Unsigned,
            deploy: Some(deploy),
            signing_key,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn failed_at_birth(id: RequestId, signing_key: String, error: RequestFailure) -> Self {
        Self {
            id,
            status: RequestStatus::Failed,
            deploy: None,
            signing_key,
            error: Some(error),
            created_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn without_payload(id: RequestId, signing_key: String) -> Self {
        Self {
            id,
            status: RequestStatus::Unsigned,
            deploy: None,
            signing_key,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn deploy(&self) -> Option<&Deploy> {
        self.deploy.as_ref()
    }

    pub fn signing_key(&self) -> &str {
        &self.signing_key
    }

    pub fn error(&self) -> Option<&RequestFailure> {
        self.error.as_ref()
    }

    /// Human-readable failure; `None` unless the request failed.
    pub fn error_message(&self) -> Option<String> {
        match (self.status, &self.error) {
            (RequestStatus::Failed, Some(failure)) => Some(failure.to_string()),
            (RequestStatus::Failed, None) => Some(SignerError::Cancelled.to_string()),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn mark_signed(&mut self, signed: Deploy) {
        self.status = RequestStatus::Signed;
        self.deploy = Some(signed);
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, failure: RequestFailure) {
        self.status = RequestStatus::Failed;
        self.error = Some(failure);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployType {
    Transfer,
    Contract,
}

impl fmt::Display for DeployType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployType::Transfer => f.write_str("Transfer"),
            DeployType::Contract => f.write_str("Contract"),
        }
    }
}

/// Read-only view of a deploy for the approval surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySummary {
    pub deploy_hash: String,
    pub signing_key: String,
    pub account: String,
    pub chain_name: String,
    pub timestamp: String,
    pub gas_price: u64,
    /// Payment amount in motes, decimal
    pub payment: String,
    pub deploy_type: DeployType,
    pub deploy_args: BTreeMap<String, String>,
}
