//! # JSON Web Key (JWK)
//!
//! A JWK ([RFC7517]) is a JSON representation of a cryptographic key.
//! Additionally, a JWK Set (JWKS) is used to represent a set of JWKs.
//!
//! JWK Thumbprint [RFC7638]
//! A key's thumbprint is its content address:
//!  - create SHA-256 hash of UTF-8 representation of JSON from {crv,kty,x,y}
//!
//! For example:
//!  - JSON: `{"crv":"Ed25519","kty":"OKP","x":"
//!    11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}`
//!  - base64url JWK Thumbprint: `kPrK_qmxVWaYVA9wwBF6Iuo3vVzz7TxHCTwXBygrS4k`
//!
//! [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Simplified JSON Web Key (JWK) key structure. Holds public parameters
/// only: private key material is unrepresentable by construction.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct PublicKeyJwk {
    /// Key identifier.
    /// For example, "_Qq0UL2Fq651Q0Fjd6TvnYE-faHiOpRlPVQcY_-tA4A".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Key type.
    pub kty: KeyType,

    /// Cryptographic curve type.
    pub crv: Curve,

    /// X coordinate.
    pub x: String,

    /// Y coordinate. Not used for `EdDSA` verification keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Use of the key.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,
}

impl PublicKeyJwk {
    /// The JWK Thumbprint ([RFC7638]) of the key: SHA-256 over the canonical
    /// JSON of the required public members, base64url encoded without
    /// padding. Identical public keys produce identical thumbprints.
    ///
    /// # Errors
    ///
    /// Will return an error if the key's parameters are inconsistent with
    /// its type (an EC key without a `y` coordinate).
    ///
    /// [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638
    pub fn thumbprint(&self) -> anyhow::Result<String> {
        // members in lexicographic order, no whitespace
        let canonical = match self.kty {
            KeyType::Okp => {
                format!(r#"{{"crv":"{}","kty":"OKP","x":"{}"}}"#, self.crv.as_str(), self.x)
            }
            KeyType::Ec => {
                let y = self.y.as_ref().ok_or_else(|| anyhow!("EC key requires 'y'"))?;
                format!(
                    r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                    self.crv.as_str(),
                    self.x,
                    y
                )
            }
        };

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Base64UrlUnpadded::encode_string(&digest))
    }

    /// Coerce the JWK to a concrete verifying key.
    ///
    /// # Errors
    ///
    /// Will return an error if the key type and curve are inconsistent, the
    /// coordinates do not decode, or they do not describe a valid point.
    pub fn verifying_key(&self) -> anyhow::Result<PublicKey> {
        match (&self.kty, &self.crv) {
            (KeyType::Okp, Curve::Ed25519) => {
                let x_bytes = Base64UrlUnpadded::decode_vec(&self.x)
                    .map_err(|e| anyhow!("unable to base64 decode JWK 'x': {e}"))?;
                let bytes =
                    &x_bytes.try_into().map_err(|_| anyhow!("invalid public key length"))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
                    .map_err(|e| anyhow!("unable to build verifying key: {e}"))?;
                Ok(PublicKey::Ed25519(key))
            }
            (KeyType::Ec, Curve::P256) => {
                let sec1 = self.sec1_bytes()?;
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|e| anyhow!("unable to build verifying key: {e}"))?;
                Ok(PublicKey::P256(key))
            }
            (KeyType::Ec, Curve::P384) => {
                let sec1 = self.sec1_bytes()?;
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|e| anyhow!("unable to build verifying key: {e}"))?;
                Ok(PublicKey::P384(key))
            }
            _ => bail!("key type and curve are inconsistent"),
        }
    }

    // Uncompressed SEC1 point from the JWK coordinates.
    fn sec1_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let y = self.y.as_ref().ok_or_else(|| anyhow!("EC key requires 'y'"))?;
        let mut sec1 = vec![0x04];
        sec1.append(
            &mut Base64UrlUnpadded::decode_vec(&self.x)
                .map_err(|e| anyhow!("unable to base64 decode JWK 'x': {e}"))?,
        );
        sec1.append(
            &mut Base64UrlUnpadded::decode_vec(y)
                .map_err(|e| anyhow!("unable to base64 decode JWK 'y': {e}"))?,
        );
        Ok(sec1)
    }
}

/// Cryptographic key type.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyType {
    /// Octet key pair (Edwards curve)
    #[default]
    #[serde(rename = "OKP")]
    Okp,

    /// Elliptic curve key pair
    #[serde(rename = "EC")]
    Ec,
}

/// Cryptographic curve type.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum Curve {
    /// Ed25519 curve
    #[default]
    Ed25519,

    /// NIST P-256 curve
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384 curve
    #[serde(rename = "P-384")]
    P384,
}

impl Curve {
    /// The curve's JOSE registry name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        }
    }
}

/// The intended usage of the public `KeyType`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyUse {
    /// Public key is to be used for signature verification
    #[default]
    #[serde(rename = "sig")]
    Signature,

    /// Public key is to be used for encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// A set of JWKs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// The set of public key JWKs
    pub keys: Vec<PublicKeyJwk>,
}

/// A verifying key coerced from a JWK's public parameters.
#[derive(Clone, Debug)]
pub enum PublicKey {
    /// Ed25519 verifying key.
    Ed25519(ed25519_dalek::VerifyingKey),

    /// ECDSA P-256 verifying key.
    P256(p256::ecdsa::VerifyingKey),

    /// ECDSA P-384 verifying key.
    P384(p384::ecdsa::VerifyingKey),
}
