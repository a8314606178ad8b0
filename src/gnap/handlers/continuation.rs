//! # Continuation Endpoint
//!
//! `POST /continue/{grant_id}` with `Authorization: GNAP <token>` — the
//! client polls for the outcome of its grant. A pending grant echoes the
//! continuation handle with a suggested wait; an approved grant triggers
//! token issuance, after which the continuation token is invalidated so a
//! replayed poll cannot re-issue.
//!
//! Continuation tokens are compared in constant time.

use std::future::Future;

use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::issuer;
use crate::gnap::provider::{GrantStore, Metadata, Provider};
use crate::gnap::state::GrantStatus;
use crate::gnap::types::{
    Config, ContinuationRequest, ContinueInfo, ContinueResponse, SubjectIds,
};
use crate::gnap::{Error, Result};

/// Continuation request handler.
///
/// # Errors
///
/// Returns a GNAP error if the continuation token is absent or wrong, the
/// grant is unknown, expired, or denied, or the client polls too quickly.
#[instrument(level = "debug", skip(provider))]
pub async fn continue_grant(
    provider: impl Provider, request: ContinuationRequest,
) -> Result<ContinueResponse> {
    let config = Metadata::config(&provider)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting configuration: {e}")))?;

    let ctx = Context { config };
    ctx.process(&provider, request).await
}

impl Handler for ContinuationRequest {
    type Response = ContinueResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        continue_grant(provider.clone(), self)
    }
}

#[derive(Debug)]
struct Context {
    config: Config,
}

impl Context {
    async fn process(
        &self, provider: &impl Provider, request: ContinuationRequest,
    ) -> Result<ContinueResponse> {
        tracing::debug!("continue_grant::process");

        let Some(token) = &request.token else {
            return Err(Error::MissingContinuationToken("missing continuation token".into()));
        };

        let grant = GrantStore::get(provider, &request.grant_id)
            .await
            .map_err(|e| Error::ServerError(format!("issue reading grant: {e}")))?
            .ok_or_else(|| Error::GrantNotFound("grant not found".into()))?;

        // a consumed (empty) stored token can never match
        if grant.continuation_token.is_empty() || !constant_time_eq(token, &grant.continuation_token)
        {
            return Err(Error::InvalidContinuationToken("invalid continuation token".into()));
        }

        match grant.status {
            GrantStatus::Pending => {
                if let Some(last) = grant.last_polled_at {
                    let elapsed = Utc::now().signed_duration_since(last).num_seconds();
                    if elapsed < self.config.min_poll_seconds {
                        return Err(Error::TooFast("poll interval too short".into()));
                    }
                }
                GrantStore::record_poll(provider, &grant.id)
                    .await
                    .map_err(|e| Error::ServerError(format!("issue recording poll: {e}")))?;

                let base = self.config.issuer.trim_end_matches('/');
                Ok(ContinueResponse {
                    continue_: Some(ContinueInfo {
                        access_token: grant.continuation_token.clone(),
                        uri: format!("{base}/continue/{}", grant.id),
                        wait: self.config.wait_seconds,
                    }),
                    ..ContinueResponse::default()
                })
            }
            GrantStatus::Approved => {
                let tokens = issuer::issue(provider, &grant, &self.config).await?;

                // one-shot: a replayed poll must not re-issue
                GrantStore::consume_continuation(provider, &grant.id)
                    .await
                    .map_err(|e| Error::ServerError(format!("issue consuming token: {e}")))?;

                Ok(ContinueResponse {
                    continue_: None,
                    access_token: Some(tokens),
                    instance_id: Some(grant.id.clone()),
                    subject: grant.subject.clone().map(|sub| SubjectIds { sub_ids: vec![sub] }),
                })
            }
            GrantStatus::Denied => Err(Error::GrantDenied("grant denied by user".into())),
            GrantStatus::Expired => Err(Error::GrantExpired("grant expired".into())),
        }
    }
}

// Timing-safe string equality.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_semantics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("abc", ""));
    }
}
