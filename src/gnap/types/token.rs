//! # Token records
//!
//! The persisted form of an issued access token. Records are addressed by
//! the SHA-256 hash of the token value; the value itself is a capability
//! only the client holds and is never stored.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::gnap::types::access::AccessItem;
use crate::jose::PublicKeyJwk;

/// The content address of a token value: base64url (unpadded) of
/// SHA-256 over the value's bytes.
#[must_use]
pub fn token_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// A stored token record.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// The record's address: `token_hash` of the issued value.
    pub hash_b64: String,

    /// The issuing server.
    pub iss: String,

    /// The access the token carries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<AccessItem>,

    /// Resource servers admitted to use the token. Empty means
    /// audience-unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aud: Vec<String>,

    /// The approved subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// The grant the token was issued under.
    pub instance_id: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Not-before, unix seconds. Zero means unset.
    pub nbf: i64,

    /// Expiry, unix seconds. Zero means unset.
    pub exp: i64,

    /// Whether the token has been revoked.
    #[serde(default)]
    pub revoked: bool,

    /// The key the token is bound to, if the client advertised a proof
    /// method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_key: Option<BoundKey>,
}

/// A token's key binding: the proof method plus the key by value or by
/// reference.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BoundKey {
    /// The bound proof method, e.g. `"httpsig"`.
    pub proof: String,

    /// The bound key, by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<PublicKeyJwk>,

    /// The bound key, by reference.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub key_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_value_free() {
        let value = "2YotnFZFEjr1zCsicMWpAA";
        let hash = token_hash(value);

        assert_eq!(hash, token_hash(value));
        assert_ne!(hash, token_hash("2YotnFZFEjr1zCsicMWpAB"));
        assert!(!hash.contains(value));
        assert_eq!(hash.len(), 43);
    }

    #[test]
    fn record_never_serializes_a_value_field() {
        let record = TokenRecord {
            hash_b64: token_hash("secret"),
            iss: "https://as.example".into(),
            instance_id: "g-1".into(),
            iat: 1,
            nbf: 1,
            exp: 300,
            ..TokenRecord::default()
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("secret"));
    }
}
