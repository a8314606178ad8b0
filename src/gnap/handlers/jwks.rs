//! # JWKS Endpoint
//!
//! `GET /.well-known/jwks.json` — the server's public key set.

use std::future::Future;

use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{Metadata, Provider};
use crate::gnap::types::JwksRequest;
use crate::gnap::{Error, Result};
use crate::jose::Jwks;

/// JWKS request handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read.
#[instrument(level = "debug", skip(provider))]
pub async fn jwks(provider: impl Provider, _request: JwksRequest) -> Result<Jwks> {
    let config = Metadata::config(&provider)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting configuration: {e}")))?;

    Ok(config.jwks)
}

impl Handler for JwksRequest {
    type Response = Jwks;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        jwks(provider.clone(), self)
    }
}
