//! # Resource server key types
//!
//! Registry records and the admin endpoint contract for managing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jose::PublicKeyJwk;

/// A registered resource-server public key. Addressed by
/// `(tenant, thumb256)`; at most one record exists per address.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RsKeyRecord {
    /// Owning tenant.
    pub tenant: String,

    /// RFC 7638 SHA-256 thumbprint of `pub_jwk`, base64url.
    pub thumb256: String,

    /// Key identifier used in HTTP signature `keyid` parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// The public key. Public parameters only.
    pub pub_jwk: PublicKeyJwk,

    /// Whether the key is accepted for verification. Rotation deactivates
    /// rather than deletes.
    pub active: bool,

    /// First registration time.
    pub created_at: DateTime<Utc>,

    /// Deactivation time, once rotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,

    /// Display name / canonical identifier of the resource server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_rs: Option<String>,
}

impl RsKeyRecord {
    /// The canonical resource server identity this key authenticates:
    /// `display_rs`, falling back to `kid`, then the thumbprint.
    #[must_use]
    pub fn rs_id(&self) -> String {
        self.display_rs
            .clone()
            .or_else(|| self.kid.clone())
            .unwrap_or_else(|| self.thumb256.clone())
    }
}

/// Register (or re-activate) a resource server key:
/// `POST /admin/tenants/{tenant}/rs/keys`.
///
/// The tenant comes from the path; the HTTP boundary injects it after
/// authenticating the admin caller.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegisterKeyRequest {
    /// Owning tenant, from the request path.
    #[serde(skip)]
    pub tenant: String,

    /// The public key to register.
    pub jwk: PublicKeyJwk,

    /// Key identifier for signature `keyid` resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Canonical resource server identifier for display and introspection
    /// audience matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_rs: Option<String>,
}

/// Response to key registration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegisterKeyResponse {
    /// The key's content address.
    pub thumb256: String,

    /// The registered key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// The registered display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_rs: Option<String>,
}

/// List a tenant's keys: `GET /admin/tenants/{tenant}/rs/keys`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListKeysRequest {
    /// Owning tenant, from the request path.
    #[serde(skip)]
    pub tenant: String,
}

/// A tenant's registered keys.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListKeysResponse {
    /// The records, active and rotated alike.
    pub keys: Vec<RsKeyRecord>,
}

/// Fetch one key: `GET /admin/tenants/{tenant}/rs/keys/{thumb256}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GetKeyRequest {
    /// Owning tenant, from the request path.
    #[serde(skip)]
    pub tenant: String,

    /// The key's content address, from the request path.
    #[serde(skip)]
    pub thumb256: String,
}

/// Deactivate a key: `DELETE /admin/tenants/{tenant}/rs/keys/{thumb256}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeactivateKeyRequest {
    /// Owning tenant, from the request path.
    #[serde(skip)]
    pub tenant: String,

    /// The key's content address, from the request path.
    #[serde(skip)]
    pub thumb256: String,
}
