//! # Device Verification Endpoints
//!
//! The JSON contract behind the consent surface. `verify_code` binds a
//! typed user code to its pending grant and marks the code verified;
//! `decide` records the user's approve/deny decision. Rendering of the
//! consent screens is the embedding application's concern.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{GrantStore, Provider};
use crate::gnap::state::GrantStatus;
use crate::gnap::types::{DecideRequest, Decision, GrantSummary, VerifyCodeRequest};
use crate::gnap::{Error, Result};

static USER_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z0-9]{4}-[A-Z0-9]{4}$").expect("should compile"));

/// User-code verification handler. Matching is exact: case-sensitive, and
/// only the formatted `XXXX-XXXX` shape is accepted.
///
/// # Errors
///
/// Returns a GNAP error if the code is malformed or no pending grant
/// matches it.
#[instrument(level = "debug", skip(provider))]
pub async fn verify_code(
    provider: impl Provider, request: VerifyCodeRequest,
) -> Result<GrantSummary> {
    if !USER_CODE.is_match(&request.user_code) {
        return Err(Error::InvalidRequest("invalid user_code format".into()));
    }

    let grant = GrantStore::find_pending_by_user_code(&provider, &request.user_code)
        .await
        .map_err(|e| Error::ServerError(format!("issue finding grant: {e}")))?
        .ok_or_else(|| Error::InvalidRequest("invalid or expired code".into()))?;

    GrantStore::mark_code_verified(&provider, &grant.id)
        .await
        .map_err(|e| Error::ServerError(format!("issue marking code verified: {e}")))?;

    let mut summary = GrantSummary::from(&grant);
    summary.code_verified = true;
    Ok(summary)
}

impl Handler for VerifyCodeRequest {
    type Response = GrantSummary;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        verify_code(provider.clone(), self)
    }
}

/// Consent decision handler.
///
/// # Errors
///
/// Returns a GNAP error if the grant is unknown, expired, not pending, or
/// approval is attempted before code verification.
#[instrument(level = "debug", skip(provider))]
pub async fn decide(provider: impl Provider, request: DecideRequest) -> Result<GrantSummary> {
    // expire-on-read happens inside the store's get
    let grant = GrantStore::get(&provider, &request.grant_id)
        .await
        .map_err(|e| Error::ServerError(format!("issue reading grant: {e}")))?
        .ok_or_else(|| Error::GrantNotFound("grant not found".into()))?;

    if grant.status == GrantStatus::Expired {
        return Err(Error::GrantExpired("grant expired".into()));
    }
    if grant.status != GrantStatus::Pending {
        return Err(Error::GrantNotPending("grant not pending".into()));
    }

    match request.decision {
        Decision::Approve => {
            if !grant.code_verified {
                return Err(Error::CodeNotVerified("code not verified".into()));
            }

            let subject = request.subject.or_else(|| Some("user:device".into()));
            let updated =
                GrantStore::approve(&provider, &grant.id, request.approved_access, subject)
                    .await
                    .map_err(|e| Error::ServerError(format!("issue approving grant: {e}")))?;
            Ok(GrantSummary::from(&updated))
        }
        Decision::Deny => {
            let updated = GrantStore::deny(&provider, &grant.id)
                .await
                .map_err(|e| Error::ServerError(format!("issue denying grant: {e}")))?;
            Ok(GrantSummary::from(&updated))
        }
    }
}

impl Handler for DecideRequest {
    type Response = GrantSummary;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        decide(provider.clone(), self)
    }
}
