//! # Issuer
//!
//! Minting of opaque access tokens for an approved grant: one token per
//! approved access token request. The token value is 256 bits from the OS
//! CSPRNG; only its SHA-256 hash is persisted, together with audience,
//! subject, validity window, and the client's key binding.

use chrono::Utc;
use tracing::instrument;

use crate::core::generate;
use crate::gnap::provider::{Provider, TokenStore};
use crate::gnap::state::Grant;
use crate::gnap::types::{
    BoundKey, Config, IssuedTokens, LabeledToken, TokenRecord, token_hash,
};
use crate::gnap::{Error, Result};

/// Issue the tokens an approved grant calls for and persist their records.
/// Returns the token value(s) for the continuation response; the values
/// are never stored.
///
/// # Errors
///
/// Returns an error if a token record cannot be persisted.
#[instrument(level = "debug", skip(provider, grant, config))]
pub async fn issue(
    provider: &impl Provider, grant: &Grant, config: &Config,
) -> Result<IssuedTokens> {
    let now = Utc::now().timestamp();
    let exp = now + config.token_ttl_seconds;

    let bound_key = if grant.client.key.proof.is_empty() {
        None
    } else {
        Some(BoundKey {
            proof: grant.client.key.proof.clone(),
            jwk: Some(grant.client.key.jwk.clone()),
            key_ref: None,
        })
    };

    let mut issued = vec![];
    for token_request in grant.granted_access() {
        let value = generate::token();

        let record = TokenRecord {
            hash_b64: token_hash(&value),
            iss: config.issuer.clone(),
            access: token_request.access.clone(),
            aud: config.audience.clone(),
            sub: grant.subject.clone(),
            instance_id: grant.id.clone(),
            iat: now,
            nbf: now,
            exp,
            revoked: false,
            bound_key: bound_key.clone(),
        };

        TokenStore::put(provider, record)
            .await
            .map_err(|e| Error::ServerError(format!("issue saving token record: {e}")))?;

        issued.push(LabeledToken {
            label: token_request.label.clone(),
            value,
            access: token_request.access.clone(),
        });
    }

    if issued.len() == 1 {
        Ok(IssuedTokens::One(issued.remove(0).value))
    } else {
        Ok(IssuedTokens::Many(issued))
    }
}
