//! # Grant Endpoint
//!
//! `POST /grants` — a client asks for access. The request arrives with an
//! HTTP Message Signature over the client's declared key; the HTTP boundary
//! verifies the proof before the body reaches this handler. The grant is
//! persisted as `pending` and the response hands back a continuation handle
//! plus the user code the end user must enter on the consent surface.
//!
//! The server MUST include the HTTP `Cache-Control` response header with a
//! value of `no-store` on any response containing tokens.

use std::future::Future;

use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{GrantStore, Metadata, Provider};
use crate::gnap::types::{
    Config, ContinueInfo, GrantRequest, GrantResponse, InteractResponse, UserCodeInfo,
};
use crate::gnap::{Error, Result};

/// Grant request handler.
///
/// # Errors
///
/// Returns a GNAP error if the request is invalid or the grant cannot be
/// persisted.
#[instrument(level = "debug", skip(provider))]
pub async fn create_grant(
    provider: impl Provider, request: GrantRequest,
) -> Result<GrantResponse> {
    let config = Metadata::config(&provider)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting configuration: {e}")))?;

    let ctx = Context { config };

    ctx.verify(&request)?;
    ctx.process(&provider, request).await
}

impl Handler for GrantRequest {
    type Response = GrantResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        create_grant(provider.clone(), self)
    }
}

#[derive(Debug)]
struct Context {
    config: Config,
}

impl Context {
    fn verify(&self, request: &GrantRequest) -> Result<()> {
        tracing::debug!("create_grant::verify");

        if request.client.key.proof.is_empty() {
            return Err(Error::InvalidRequest("no `client.key.proof` specified".into()));
        }
        if request.client.key.jwk.x.is_empty() {
            return Err(Error::InvalidRequest("no `client.key.jwk` specified".into()));
        }
        if request.access_token.is_empty()
            || request.access_token.as_slice().iter().any(|t| t.access.is_empty())
        {
            return Err(Error::InvalidRequest("no access requested".into()));
        }

        Ok(())
    }

    async fn process(
        &self, provider: &impl Provider, request: GrantRequest,
    ) -> Result<GrantResponse> {
        tracing::debug!("create_grant::process");

        let grant = GrantStore::create(provider, request)
            .await
            .map_err(|e| Error::ServerError(format!("issue saving grant: {e}")))?;

        let base = self.config.issuer.trim_end_matches('/');

        Ok(GrantResponse {
            continue_: ContinueInfo {
                access_token: grant.continuation_token.clone(),
                uri: format!("{base}/continue/{}", grant.id),
                wait: self.config.wait_seconds,
            },
            interact: InteractResponse {
                expires: grant.expires_at,
                user_code: UserCodeInfo {
                    code: grant.user_code.clone().unwrap_or_default(),
                    uri: format!("{base}/device"),
                },
            },
        })
    }
}
