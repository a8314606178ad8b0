//! # Discovery Endpoint
//!
//! `OPTIONS /grants` — the GNAP AS discovery document, built from
//! configuration. RFC 9635 requires the advertised grant request endpoint
//! to be an `https` URL.

use std::future::Future;

use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{Metadata, Provider};
use crate::gnap::types::{DiscoveryRequest, DiscoveryResponse};
use crate::gnap::{Error, Result};

/// Discovery request handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read.
#[instrument(level = "debug", skip(provider))]
pub async fn discovery(
    provider: impl Provider, _request: DiscoveryRequest,
) -> Result<DiscoveryResponse> {
    let config = Metadata::config(&provider)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting configuration: {e}")))?;

    let endpoint = format!("{}/grants", config.issuer.trim_end_matches('/'));

    Ok(DiscoveryResponse {
        grant_request_endpoint: ensure_https(&endpoint),
        interaction_start_modes_supported: config.interaction_start_modes,
        interaction_finish_methods_supported: config.interaction_finish_methods,
        key_proofs_supported: config.key_proofs,
        sub_id_formats_supported: config.sub_id_formats,
        assertion_formats_supported: config.assertion_formats,
        key_rotation_supported: config.key_rotation_supported,
    })
}

impl Handler for DiscoveryRequest {
    type Response = DiscoveryResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        discovery(provider.clone(), self)
    }
}

// Advertised URLs MUST be https.
fn ensure_https(url: &str) -> String {
    url.strip_prefix("http://").map_or_else(|| url.to_string(), |rest| format!("https://{rest}"))
}
