//! # Introspection Endpoint
//!
//! `POST /introspect` — a resource server asks whether a token is active
//! and what access it carries (RFC 9767 style). The caller authenticates
//! with an HTTP Message Signature; the boundary attaches the verified
//! [`crate::httpsig::RsIdentity`] to the request before calling here.
//!
//! Every trust or validity failure produces the same opaque response,
//! exactly `{"active": false}`, with HTTP 200 and `Cache-Control:
//! no-store`. Only malformed configuration surfaces as an error.

use std::collections::HashSet;
use std::future::Future;

use chrono::Utc;
use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{KeyRegistry, Metadata, Provider, TokenStore};
use crate::gnap::types::{
    AccessItem, IntrospectionRequest, IntrospectionResponse, ResourceServer, token_hash,
};
use crate::gnap::{Error, Result};

/// Introspection request handler.
///
/// # Errors
///
/// Returns an error only when configuration cannot be read; token and
/// caller problems all shape into the inactive response.
#[instrument(level = "debug", skip(provider))]
pub async fn introspect(
    provider: impl Provider, request: IntrospectionRequest,
) -> Result<IntrospectionResponse> {
    let config = Metadata::config(&provider)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting configuration: {e}")))?;

    // RS authentication must have happened at the boundary
    let Some(rs) = &request.rs else {
        return Ok(IntrospectionResponse::inactive());
    };
    if rs.id.is_empty() || request.access_token.is_empty() {
        return Ok(IntrospectionResponse::inactive());
    }

    // the body's resource_server must resolve to the authenticated caller
    let Some(rs_id) = resolve_rs(&provider, &request.resource_server).await else {
        return Ok(IntrospectionResponse::inactive());
    };
    if rs_id != rs.id {
        return Ok(IntrospectionResponse::inactive());
    }

    // lookup is by hash only
    let hash_b64 = token_hash(&request.access_token);
    let Ok(Some(record)) = TokenStore::get_by_hash(&provider, &hash_b64).await else {
        return Ok(IntrospectionResponse::inactive());
    };

    let now = Utc::now().timestamp();

    if record.iss.is_empty() || record.iss != config.issuer {
        return Ok(IntrospectionResponse::inactive());
    }
    if record.revoked {
        return Ok(IntrospectionResponse::inactive());
    }
    if record.exp != 0 && record.exp <= now {
        return Ok(IntrospectionResponse::inactive());
    }
    if record.nbf != 0 && now < record.nbf {
        return Ok(IntrospectionResponse::inactive());
    }
    // proof binding must match if the token is bound
    if let Some(bound) = &record.bound_key {
        if request.proof.as_deref() != Some(bound.proof.as_str()) {
            return Ok(IntrospectionResponse::inactive());
        }
    }
    // an empty audience is unrestricted
    if !record.aud.is_empty() && !record.aud.iter().any(|a| a == &rs_id) {
        return Ok(IntrospectionResponse::inactive());
    }
    // the token must satisfy any access the caller requires
    if !request.access.is_empty() && !satisfies_access(&record.access, &request.access) {
        return Ok(IntrospectionResponse::inactive());
    }

    let filtered = filter_access_for_rs(&record.access, &rs_id);
    Ok(IntrospectionResponse::active(record, filtered))
}

impl Handler for IntrospectionRequest {
    type Response = IntrospectionResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        introspect(provider.clone(), self)
    }
}

// Resolve the request's `resource_server` value to a canonical RS id: an
// identifier stands for itself; a reference object resolves through the
// registry by the key's thumbprint.
async fn resolve_rs(
    provider: &impl Provider, resource_server: &ResourceServer,
) -> Option<String> {
    match resource_server {
        ResourceServer::Id(id) => (!id.is_empty()).then(|| id.clone()),
        ResourceServer::ByRef(server) => {
            let thumb = server.key.as_ref()?.thumbprint().ok()?;
            let record = KeyRegistry::find_by_thumbprint(provider, &thumb).await.ok()??;
            record.active.then(|| record.rs_id())
        }
    }
}

// The token's access must cover each requested item, compared by the
// (type, identifier) tuple.
fn satisfies_access(token_access: &[AccessItem], requested: &[AccessItem]) -> bool {
    let held: HashSet<(&str, &str)> = token_access
        .iter()
        .map(|a| (a.type_.as_str(), a.identifier.as_deref().unwrap_or_default()))
        .collect();

    requested
        .iter()
        .all(|r| held.contains(&(r.type_.as_str(), r.identifier.as_deref().unwrap_or_default())))
}

// Access items carry no audience tagging; the full list is appropriate for
// any RS the token's audience admits.
fn filter_access_for_rs(access: &[AccessItem], _rs_id: &str) -> Vec<AccessItem> {
    access.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(type_: &str, identifier: Option<&str>) -> AccessItem {
        AccessItem {
            type_: type_.into(),
            identifier: identifier.map(Into::into),
            ..AccessItem::default()
        }
    }

    #[test]
    fn equal_filter_admits() {
        let held = vec![item("photo-api", Some("album-7"))];
        assert!(satisfies_access(&held, &held.clone()));
    }

    #[test]
    fn subset_filter_admits() {
        let held = vec![item("photo-api", None), item("print-api", None)];
        let requested = vec![item("photo-api", None)];
        assert!(satisfies_access(&held, &requested));
    }

    #[test]
    fn superset_filter_rejects() {
        let held = vec![item("photo-api", None)];
        let requested = vec![item("photo-api", None), item("print-api", None)];
        assert!(!satisfies_access(&held, &requested));
    }

    #[test]
    fn identifier_participates_in_matching() {
        let held = vec![item("photo-api", Some("album-7"))];
        let requested = vec![item("photo-api", Some("album-8"))];
        assert!(!satisfies_access(&held, &requested));
    }
}
