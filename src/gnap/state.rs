//! # Grant state
//!
//! The persisted grant entity and its lifecycle state machine. Transitions
//! are monotonic: no status is re-entered once left, and `expired` is
//! absorbing. The guarded transition methods here are the only way to move
//! a grant between statuses, so stores cannot produce an illegal sequence.

use anyhow::bail;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::generate;
use crate::gnap::types::{AccessTokenRequest, Client, GrantRequest};

/// Grant lifecycle status.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Awaiting user consent.
    #[default]
    Pending,

    /// Consent recorded; tokens may be issued on the next continuation.
    Approved,

    /// The user denied the request.
    Denied,

    /// The grant's lifetime lapsed before completion. Absorbing.
    Expired,
}

/// The authorization context persisted for one client grant request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Grant {
    /// Globally unique grant identifier (UUID v4).
    pub id: String,

    /// Lifecycle status.
    pub status: GrantStatus,

    /// The requesting client's key material and declared proof method.
    pub client: Client,

    /// The access token request(s) as submitted by the client.
    pub requested_access: Vec<AccessTokenRequest>,

    /// The access granted at approval. Defaults to `requested_access` when
    /// the consent step does not narrow it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_access: Option<Vec<AccessTokenRequest>>,

    /// Principal identifier recorded at approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Opaque bearer for the continuation endpoint. Cleared once tokens
    /// have been issued.
    pub continuation_token: String,

    /// Short human-typeable code binding the flow to a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,

    /// Whether the consent surface has validated the user code.
    #[serde(default)]
    pub code_verified: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// `created_at` plus the configured grant lifetime.
    pub expires_at: DateTime<Utc>,

    /// Last continuation poll, for rate limiting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// Build a fresh pending grant for the request.
    #[must_use]
    pub fn new(request: GrantRequest, grant_ttl_seconds: i64) -> Self {
        let now = Utc::now();
        let ttl = TimeDelta::try_seconds(grant_ttl_seconds).unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            status: GrantStatus::Pending,
            client: request.client,
            requested_access: request.access_token.as_slice().to_vec(),
            approved_access: None,
            subject: None,
            continuation_token: generate::continuation_token(),
            user_code: Some(generate::user_code()),
            code_verified: false,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            last_polled_at: None,
        }
    }

    /// Determines whether the grant's lifetime has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Transition to `expired` if the lifetime has lapsed and the grant is
    /// still pending. Returns `true` if a transition occurred (the caller
    /// re-persists). Idempotent.
    pub fn expire_if_due(&mut self) -> bool {
        if self.status == GrantStatus::Pending && self.is_expired() {
            self.status = GrantStatus::Expired;
            self.updated_at = Utc::now();
            return true;
        }
        false
    }

    /// Record user-code verification. Requires `pending`.
    ///
    /// # Errors
    ///
    /// Will return an error if the grant is not pending.
    pub fn mark_code_verified(&mut self) -> anyhow::Result<()> {
        if self.status != GrantStatus::Pending {
            bail!("grant not pending");
        }
        self.code_verified = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition `pending` → `approved`. Requires a verified user code.
    /// An empty `approved` list approves exactly what was requested.
    ///
    /// # Errors
    ///
    /// Will return an error if the grant is not pending or the code has not
    /// been verified.
    pub fn approve(
        &mut self, approved: Vec<AccessTokenRequest>, subject: Option<String>,
    ) -> anyhow::Result<()> {
        if self.status != GrantStatus::Pending {
            bail!("grant not pending");
        }
        if !self.code_verified {
            bail!("code not verified");
        }

        self.approved_access =
            if approved.is_empty() { Some(self.requested_access.clone()) } else { Some(approved) };
        self.subject = subject;
        self.status = GrantStatus::Approved;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition `pending` → `denied`. Unlike approval, denial does not
    /// require a verified code.
    ///
    /// # Errors
    ///
    /// Will return an error if the grant is not pending.
    pub fn deny(&mut self) -> anyhow::Result<()> {
        if self.status != GrantStatus::Pending {
            bail!("grant not pending");
        }
        self.status = GrantStatus::Denied;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// The access to issue tokens for: approved access, falling back to the
    /// request.
    #[must_use]
    pub fn granted_access(&self) -> &[AccessTokenRequest] {
        self.approved_access.as_deref().unwrap_or(&self.requested_access)
    }
}
