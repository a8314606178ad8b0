//! # Provider
//!
//! Traits the embedding application implements (or takes from [`crate::store`])
//! to supply configuration and durable state to the engine. Each store
//! exclusively owns its record type; handlers only ever see immutable
//! snapshots.

use std::future::Future;

use thiserror::Error;

use crate::gnap::state::Grant;
use crate::gnap::types::{
    AccessTokenRequest, Config, GrantRequest, RsKeyRecord, TokenRecord,
};
use crate::httpsig::verify::{KeyResolver, ResolvedKey};
use crate::httpsig::{SignatureInput, VerifyError};
use crate::jose::PublicKeyJwk;

/// Result type for provider callbacks.
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Grant engine provider.
pub trait Provider: Metadata + GrantStore + TokenStore + KeyRegistry + Clone {}

/// Server configuration supplied by the implementer.
pub trait Metadata: Send + Sync {
    /// The server's configuration object.
    fn config(&self) -> impl Future<Output = Result<Config>> + Send;
}

/// Durable storage of grant state.
///
/// Every operation is durable before it returns: a successful write has
/// been fsynced and atomically renamed into place. Dropping an operation's
/// future cancels it; a canceled write leaves the prior committed state
/// intact.
pub trait GrantStore: Send + Sync {
    /// Persist a new grant for the request: fills id, timestamps,
    /// continuation token, and user code.
    fn create(&self, request: GrantRequest) -> impl Future<Output = Result<Grant>> + Send;

    /// Retrieve a grant by id. A pending grant observed past its expiry is
    /// transitioned to `expired` and re-persisted before being returned
    /// (the only read that writes).
    fn get(&self, grant_id: &str) -> impl Future<Output = Result<Option<Grant>>> + Send;

    /// The pending grant whose user code matches `code` exactly.
    fn find_pending_by_user_code(
        &self, code: &str,
    ) -> impl Future<Output = Result<Option<Grant>>> + Send;

    /// Record that the consent surface validated the grant's user code.
    /// Requires `pending` status.
    fn mark_code_verified(&self, grant_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Transition `pending` → `approved`. Requires a verified code. An
    /// empty `approved` list approves exactly what was requested.
    fn approve(
        &self, grant_id: &str, approved: Vec<AccessTokenRequest>, subject: Option<String>,
    ) -> impl Future<Output = Result<Grant>> + Send;

    /// Transition `pending` → `denied` (allowed before code verification).
    fn deny(&self, grant_id: &str) -> impl Future<Output = Result<Grant>> + Send;

    /// Record a continuation poll, for rate-limit bookkeeping.
    fn record_poll(&self, grant_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Invalidate the grant's continuation token after token issuance.
    fn consume_continuation(&self, grant_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Storage of issued-token records, addressed by the SHA-256 hash of the
/// token value. The token value itself is never persisted.
pub trait TokenStore: Send + Sync {
    /// Store (or overwrite) a token record under its hash.
    fn put(&self, record: TokenRecord) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve a record by hash. A missing record is `None`, not an error.
    fn get_by_hash(
        &self, hash_b64: &str,
    ) -> impl Future<Output = Result<Option<TokenRecord>>> + Send;

    /// Mark the record revoked and re-persist it.
    fn revoke(&self, hash_b64: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove records whose expiry is at or before `now` (unix seconds).
    /// Returns the number removed. Safe to run periodically.
    fn cleanup_expired(&self, now: i64) -> impl Future<Output = Result<usize>> + Send;
}

/// Tenant-scoped storage of resource-server public keys, indexed by RFC
/// 7638 thumbprint. Records are deactivated on rotation, never deleted.
pub trait KeyRegistry: Send + Sync {
    /// Insert or update the record for `(tenant, thumbprint(jwk))`. A
    /// previously unseen key is admitted only when `accept_tofu` is true;
    /// otherwise the operation fails with [`UnknownKey`] and the registry
    /// is unchanged.
    fn upsert(
        &self, tenant: &str, pub_jwk: PublicKeyJwk, kid: Option<String>, alg: Option<String>,
        display_rs: Option<String>, accept_tofu: bool,
    ) -> impl Future<Output = Result<RsKeyRecord>> + Send;

    /// The record for `(tenant, thumb256)`, if any.
    fn get(
        &self, tenant: &str, thumb256: &str,
    ) -> impl Future<Output = Result<Option<RsKeyRecord>>> + Send;

    /// All records for the tenant.
    fn list(&self, tenant: &str) -> impl Future<Output = Result<Vec<RsKeyRecord>>> + Send;

    /// Deactivate the record for `(tenant, thumb256)`, stamping
    /// `rotated_at`. Fails with [`KeyNotFound`] if absent.
    fn deactivate(
        &self, tenant: &str, thumb256: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// The first active record with a matching `kid`, across all tenants.
    /// Fails with [`KeyNotFound`] if there is none.
    fn lookup_by_kid(&self, kid: &str) -> impl Future<Output = Result<RsKeyRecord>> + Send;

    /// The active record with a matching `kid` within one tenant.
    /// Preferred over [`Self::lookup_by_kid`] when the tenant is known.
    fn lookup_by_tenant_kid(
        &self, tenant: &str, kid: &str,
    ) -> impl Future<Output = Result<RsKeyRecord>> + Send;

    /// The record with the given thumbprint, across all tenants.
    fn find_by_thumbprint(
        &self, thumb256: &str,
    ) -> impl Future<Output = Result<Option<RsKeyRecord>>> + Send;
}

/// The presented key is not in the registry and trust-on-first-use is
/// disabled. Recovered by handlers with `downcast_ref` to surface the
/// `unknown_key` wire tag.
#[derive(Error, Debug)]
#[error("unknown RS key and TOFU disabled")]
pub struct UnknownKey;

/// No registry record matches the lookup. Distinct from signature failure
/// so callers never conflate the two.
#[derive(Error, Debug)]
#[error("key not found")]
pub struct KeyNotFound;

/// Adapts a [`KeyRegistry`] into the signature verifier's [`KeyResolver`]:
/// the signature's `keyid` is looked up across tenants and the record's
/// `display_rs` (falling back to `kid`, then thumbprint) becomes the
/// canonical resource server identity.
pub struct RegistryResolver<'a, R: KeyRegistry> {
    /// The backing registry.
    pub registry: &'a R,
}

impl<R: KeyRegistry> KeyResolver for RegistryResolver<'_, R> {
    async fn resolve(&self, input: &SignatureInput) -> Result<ResolvedKey, VerifyError> {
        let Some(kid) = input.keyid() else {
            return Err(VerifyError::KeyNotFound);
        };
        let record =
            self.registry.lookup_by_kid(kid).await.map_err(|_| VerifyError::KeyNotFound)?;
        let key = record.pub_jwk.verifying_key().map_err(|_| VerifyError::KeyMismatch)?;

        Ok(ResolvedKey { key, rs_id: record.rs_id() })
    }
}
