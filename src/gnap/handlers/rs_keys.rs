//! # Resource Server Key Endpoints
//!
//! Admin management of the tenant-scoped key registry:
//!
//! - `POST /admin/tenants/{tenant}/rs/keys` — register
//! - `GET /admin/tenants/{tenant}/rs/keys` — list
//! - `GET /admin/tenants/{tenant}/rs/keys/{thumb256}` — fetch
//! - `DELETE /admin/tenants/{tenant}/rs/keys/{thumb256}` — deactivate
//!
//! Admin-caller authentication happens at the HTTP boundary. Registration
//! through this trusted path admits first-seen keys.

use std::future::Future;

use tracing::instrument;

use crate::gnap::endpoint::Handler;
use crate::gnap::provider::{KeyNotFound, KeyRegistry, Provider, UnknownKey};
use crate::gnap::types::{
    DeactivateKeyRequest, GetKeyRequest, ListKeysRequest, ListKeysResponse, RegisterKeyRequest,
    RegisterKeyResponse, RsKeyRecord,
};
use crate::gnap::{Error, Result};

const DEFAULT_TENANT: &str = "default";

fn tenant_or_default(tenant: &str) -> &str {
    if tenant.is_empty() { DEFAULT_TENANT } else { tenant }
}

/// Key registration handler.
///
/// # Errors
///
/// Returns a GNAP error if the JWK is invalid or the registry write fails.
#[instrument(level = "debug", skip(provider))]
pub async fn register_key(
    provider: impl Provider, request: RegisterKeyRequest,
) -> Result<RegisterKeyResponse> {
    // the key must coerce to a supported verifying key
    if request.jwk.verifying_key().is_err() {
        return Err(Error::InvalidRequest("invalid JWK".into()));
    }

    let tenant = tenant_or_default(&request.tenant);
    let record = KeyRegistry::upsert(
        &provider,
        tenant,
        request.jwk,
        request.kid,
        request.alg,
        request.display_rs,
        true,
    )
    .await
    .map_err(|e| {
        if e.downcast_ref::<UnknownKey>().is_some() {
            Error::UnknownKey("unknown key".into())
        } else {
            Error::ServerError(format!("issue saving key: {e}"))
        }
    })?;

    Ok(RegisterKeyResponse {
        thumb256: record.thumb256,
        kid: record.kid,
        display_rs: record.display_rs,
    })
}

impl Handler for RegisterKeyRequest {
    type Response = RegisterKeyResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        register_key(provider.clone(), self)
    }
}

/// Key listing handler.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
#[instrument(level = "debug", skip(provider))]
pub async fn list_keys(
    provider: impl Provider, request: ListKeysRequest,
) -> Result<ListKeysResponse> {
    let keys = KeyRegistry::list(&provider, tenant_or_default(&request.tenant))
        .await
        .map_err(|e| Error::ServerError(format!("issue listing keys: {e}")))?;

    Ok(ListKeysResponse { keys })
}

impl Handler for ListKeysRequest {
    type Response = ListKeysResponse;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        list_keys(provider.clone(), self)
    }
}

/// Single-key fetch handler.
///
/// # Errors
///
/// Returns a GNAP error if no record exists at the address.
#[instrument(level = "debug", skip(provider))]
pub async fn get_key(provider: impl Provider, request: GetKeyRequest) -> Result<RsKeyRecord> {
    KeyRegistry::get(&provider, tenant_or_default(&request.tenant), &request.thumb256)
        .await
        .map_err(|e| Error::ServerError(format!("issue reading key: {e}")))?
        .ok_or_else(|| Error::NotFound("key not found".into()))
}

impl Handler for GetKeyRequest {
    type Response = RsKeyRecord;

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        get_key(provider.clone(), self)
    }
}

/// Key deactivation handler. Deactivation is rotation: the record is
/// stamped and kept, never deleted.
///
/// # Errors
///
/// Returns a GNAP error if no record exists at the address.
#[instrument(level = "debug", skip(provider))]
pub async fn deactivate_key(
    provider: impl Provider, request: DeactivateKeyRequest,
) -> Result<()> {
    KeyRegistry::deactivate(&provider, tenant_or_default(&request.tenant), &request.thumb256)
        .await
        .map_err(|e| {
            if e.downcast_ref::<KeyNotFound>().is_some() {
                Error::NotFound("key not found".into())
            } else {
                Error::ServerError(format!("issue deactivating key: {e}"))
            }
        })
}

impl Handler for DeactivateKeyRequest {
    type Response = ();

    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        deactivate_key(provider.clone(), self)
    }
}
