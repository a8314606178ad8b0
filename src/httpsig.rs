//! # HTTP Message Signatures
//!
//! Verification of HTTP Message Signatures ([RFC9421]). The verifier
//! authenticates resource servers calling the introspection endpoint and
//! validates client key proofs on grant requests: parse the
//! `Signature-Input` and `Signature` headers, reconstruct the signature
//! base, resolve the signer's public key, and check the signature.
//!
//! The verifier is transport-agnostic: the embedding HTTP server hands it a
//! [`RequestParts`] view of the inbound request.
//!
//! [RFC9421]: https://www.rfc-editor.org/rfc/rfc9421

pub mod base;
pub mod parse;
pub mod verify;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::base::signature_base;
pub use self::parse::{ParamValue, SignatureInput};
pub use self::verify::{KeyResolver, ResolvedKey, VerifierConfig, verify, verify_signature};

/// The signature label the server produces and consumes.
pub const SIGNATURE_LABEL: &str = "sig1";

/// Signature algorithms accepted by the verifier. The hash is implied by
/// the algorithm name; ECDSA signatures are ASN.1 DER encoded.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Algorithm {
    /// EdDSA over edwards25519.
    #[serde(rename = "ed25519")]
    Ed25519,

    /// ECDSA over P-256 with SHA-256.
    #[serde(rename = "ecdsa-p256-sha256")]
    EcdsaP256Sha256,

    /// ECDSA over P-384 with SHA-384.
    #[serde(rename = "ecdsa-p384-sha384")]
    EcdsaP384Sha384,
}

impl Algorithm {
    /// The RFC 9421 registry name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::EcdsaP256Sha256 => "ecdsa-p256-sha256",
            Self::EcdsaP384Sha384 => "ecdsa-p384-sha384",
        }
    }

    /// Parse a (case-insensitive) algorithm name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ed25519" => Some(Self::Ed25519),
            "ecdsa-p256-sha256" => Some(Self::EcdsaP256Sha256),
            "ecdsa-p384-sha384" => Some(Self::EcdsaP384Sha384),
            _ => None,
        }
    }
}

/// The identity of a resource server whose request signature verified.
/// Attached to the request context by the HTTP boundary and consumed by the
/// introspection handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsIdentity {
    /// Canonical resource server identifier.
    pub id: String,

    /// The `keyid` the signature named.
    pub key_id: String,

    /// The algorithm the signature used.
    pub alg: Algorithm,
}

/// A transport-agnostic view of an inbound HTTP request, sufficient to
/// reconstruct the signature base.
#[derive(Clone, Debug, Default)]
pub struct RequestParts {
    /// HTTP method, as received.
    pub method: String,

    /// Request scheme, from TLS state or `X-Forwarded-Proto`.
    pub scheme: String,

    /// Host authority.
    pub authority: String,

    /// Path and query, e.g. `/introspect?verbose=1`.
    pub path_and_query: String,

    /// Header fields in received order. Names are matched
    /// case-insensitively.
    pub headers: Vec<(String, String)>,
}

impl RequestParts {
    /// All values for the named header field, in order.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The named header field's value, multiple values joined with `", "`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let values = self.header_values(name);
        if values.is_empty() {
            return None;
        }
        Some(values.join(", "))
    }

    /// The request's target URI: `<scheme>://<authority><path-and-query>`.
    #[must_use]
    pub fn target_uri(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.path_and_query)
    }
}

/// Signature verification failures. All of these surface to the HTTP
/// boundary as 401; the variants are kept distinct for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// `Signature-Input` or `Signature` header absent.
    #[error("missing HTTP Signature headers")]
    MissingHeaders,

    /// A header could not be parsed.
    #[error("invalid Signature-Input: {0}")]
    Malformed(String),

    /// A component the verifier requires was not covered.
    #[error("missing required component {0:?}")]
    MissingComponent(String),

    /// A covered derived component outside the supported vocabulary.
    #[error("unsupported derived component {0:?}")]
    UnsupportedComponent(String),

    /// A covered header field is not present on the request.
    #[error("missing covered header {0:?}")]
    MissingCoveredField(String),

    /// The declared algorithm is not in the configured allow-set.
    #[error("unsupported alg {0:?}")]
    DisallowedAlgorithm(String),

    /// The `created` parameter is outside the allowed clock skew.
    #[error("signature outside time window")]
    TimeWindow,

    /// No key could be resolved for the signature's `keyid`.
    #[error("signer key not found")]
    KeyNotFound,

    /// The resolved key's type does not match the declared algorithm.
    #[error("key type mismatch")]
    KeyMismatch,

    /// The signature failed cryptographic verification.
    #[error("invalid http signature")]
    BadSignature,
}
