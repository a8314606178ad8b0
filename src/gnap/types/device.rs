//! # Device verification types
//!
//! The JSON contract between the consent surface and the engine: user-code
//! verification and the approve/deny decision. The HTML rendering of these
//! screens lives outside the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gnap::state::{Grant, GrantStatus};
use crate::gnap::types::access::AccessTokenRequest;

/// A user-code submission from the consent surface.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VerifyCodeRequest {
    /// The code the user typed, `XXXX-XXXX`.
    pub user_code: String,
}

/// The consent decision for a verified grant.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DecideRequest {
    /// The grant being decided.
    pub grant_id: String,

    /// Approve or deny.
    pub decision: Decision,

    /// Principal identifier to record on approval. Defaults to
    /// `user:device` when the consent surface does not identify the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Narrowed access to approve. Empty approves the requested access
    /// unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approved_access: Vec<AccessTokenRequest>,
}

/// A consent decision.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Grant the requested access.
    Approve,

    /// Refuse the request.
    #[default]
    Deny,
}

/// A grant snapshot for the consent surface. Deliberately excludes the
/// continuation token: the consent surface never needs it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GrantSummary {
    /// Grant identifier.
    pub id: String,

    /// Lifecycle status.
    pub status: GrantStatus,

    /// What the client asked for, for display on the consent screen.
    pub requested_access: Vec<AccessTokenRequest>,

    /// The user code bound to the grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,

    /// The recorded subject, after approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Whether the user code has been verified.
    pub code_verified: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl From<&Grant> for GrantSummary {
    fn from(grant: &Grant) -> Self {
        Self {
            id: grant.id.clone(),
            status: grant.status,
            requested_access: grant.requested_access.clone(),
            user_code: grant.user_code.clone(),
            subject: grant.subject.clone(),
            code_verified: grant.code_verified,
            created_at: grant.created_at,
            updated_at: grant.updated_at,
            expires_at: grant.expires_at,
        }
    }
}
