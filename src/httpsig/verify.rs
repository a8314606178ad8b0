//! # Verification
//!
//! The top-level verification flow: policy checks on the parsed
//! `Signature-Input`, key resolution, and the signature math itself.

use std::future::Future;

use chrono::Utc;
use ecdsa::signature::Verifier as _;

use crate::httpsig::parse::{self, SignatureInput};
use crate::httpsig::{Algorithm, RequestParts, RsIdentity, SIGNATURE_LABEL, VerifyError};
use crate::jose::PublicKey;

/// Verifier policy: which algorithms are admissible, which components must
/// be covered, and how much clock skew the `created` parameter may carry.
#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Admissible signature algorithms.
    pub allowed_algs: Vec<Algorithm>,

    /// Components that must be covered by every signature.
    pub required_components: Vec<String>,

    /// Maximum skew, in seconds, between `created` and the receiver's
    /// clock. A `created` exactly at the boundary is accepted.
    pub max_skew_seconds: i64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            allowed_algs: vec![
                Algorithm::Ed25519,
                Algorithm::EcdsaP256Sha256,
                Algorithm::EcdsaP384Sha384,
            ],
            required_components: vec!["@method".into(), "@target-uri".into()],
            max_skew_seconds: 300,
        }
    }
}

/// A public key resolved for a signature, together with the canonical
/// identifier of the resource server it belongs to.
#[derive(Clone, Debug)]
pub struct ResolvedKey {
    /// The verifying key.
    pub key: PublicKey,

    /// Canonical resource server identifier.
    pub rs_id: String,
}

/// Maps a signature's parameters (typically the `keyid`) to a public key.
///
/// "Key not found" is deliberately a distinct error class from "signature
/// invalid": resolution failures never reach the cryptographic check.
pub trait KeyResolver: Send + Sync {
    /// Resolve the signer's public key.
    fn resolve(
        &self, input: &SignatureInput,
    ) -> impl Future<Output = Result<ResolvedKey, VerifyError>> + Send;
}

/// Verify the HTTP Message Signature on a request.
///
/// Policy checks run before any cryptographic work: required components,
/// time window, and the algorithm allow-set all reject up front.
///
/// # Errors
///
/// Returns a [`VerifyError`] describing the first check that failed. All
/// variants map to HTTP 401.
pub async fn verify(
    parts: &RequestParts, config: &VerifierConfig, resolver: &impl KeyResolver,
) -> Result<RsIdentity, VerifyError> {
    let (Some(input_header), Some(sig_header)) =
        (parts.header("signature-input"), parts.header("signature"))
    else {
        return Err(VerifyError::MissingHeaders);
    };

    let input = parse::signature_input(&input_header, SIGNATURE_LABEL)?;

    for required in &config.required_components {
        if !input.components.iter().any(|c| c.eq_ignore_ascii_case(required)) {
            return Err(VerifyError::MissingComponent(required.clone()));
        }
    }

    if let Some(created) = input.created()? {
        if !within_skew(created, Utc::now().timestamp(), config.max_skew_seconds) {
            return Err(VerifyError::TimeWindow);
        }
    }

    let alg_name = input.alg().unwrap_or_default();
    let alg = Algorithm::from_name(alg_name)
        .ok_or_else(|| VerifyError::DisallowedAlgorithm(alg_name.to_string()))?;
    if !config.allowed_algs.contains(&alg) {
        return Err(VerifyError::DisallowedAlgorithm(alg_name.to_string()));
    }

    let resolved = resolver.resolve(&input).await?;

    let base = super::signature_base(parts, &input)?;
    let raw_sig = parse::signature(&sig_header, SIGNATURE_LABEL)?;

    verify_signature(alg, &resolved.key, &base, &raw_sig)?;

    Ok(RsIdentity {
        id: resolved.rs_id,
        key_id: input.keyid().unwrap_or_default().to_string(),
        alg,
    })
}

// A `created` exactly at the boundary is accepted.
fn within_skew(created: i64, now: i64, max_skew: i64) -> bool {
    created <= now + max_skew && created >= now - max_skew
}

/// Verify `sig` over `base` with the given algorithm and key.
///
/// # Errors
///
/// Returns [`VerifyError::KeyMismatch`] if the key's type does not match
/// the algorithm, or [`VerifyError::BadSignature`] if verification fails.
pub fn verify_signature(
    alg: Algorithm, key: &PublicKey, base: &[u8], sig: &[u8],
) -> Result<(), VerifyError> {
    match (alg, key) {
        (Algorithm::Ed25519, PublicKey::Ed25519(vk)) => {
            let signature = ed25519_dalek::Signature::from_slice(sig)
                .map_err(|_| VerifyError::BadSignature)?;
            vk.verify(base, &signature).map_err(|_| VerifyError::BadSignature)
        }
        (Algorithm::EcdsaP256Sha256, PublicKey::P256(vk)) => {
            let signature =
                p256::ecdsa::Signature::from_der(sig).map_err(|_| VerifyError::BadSignature)?;
            vk.verify(base, &signature).map_err(|_| VerifyError::BadSignature)
        }
        (Algorithm::EcdsaP384Sha384, PublicKey::P384(vk)) => {
            let signature =
                p384::ecdsa::Signature::from_der(sig).map_err(|_| VerifyError::BadSignature)?;
            vk.verify(base, &signature).map_err(|_| VerifyError::BadSignature)
        }
        _ => Err(VerifyError::KeyMismatch),
    }
}
