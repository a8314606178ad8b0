//! # Server configuration and discovery

use serde::{Deserialize, Serialize};

use crate::jose::Jwks;

/// The server's configuration object. The host environment supplies only
/// the data-directory root; everything else the engine needs lives here
/// and is handed to the stores and handlers through the
/// [`crate::gnap::provider::Metadata`] trait.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// The server's base URL. Used as token `iss` and to build
    /// continuation and device URIs.
    pub issuer: String,

    /// Default audience stamped on issued tokens. Empty issues
    /// audience-unrestricted tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience: Vec<String>,

    /// Grant lifetime, in seconds.
    pub grant_ttl_seconds: i64,

    /// Access token lifetime, in seconds.
    pub token_ttl_seconds: i64,

    /// Poll interval suggested to continuation clients, in seconds.
    pub wait_seconds: u64,

    /// Minimum accepted interval between continuation polls; faster polls
    /// draw `too_fast`.
    pub min_poll_seconds: i64,

    /// Advertised interaction start modes.
    pub interaction_start_modes: Vec<String>,

    /// Advertised interaction finish methods.
    pub interaction_finish_methods: Vec<String>,

    /// Advertised key proof methods. Only `httpsig` is validated.
    pub key_proofs: Vec<String>,

    /// Advertised subject identifier formats.
    pub sub_id_formats: Vec<String>,

    /// Advertised assertion formats.
    pub assertion_formats: Vec<String>,

    /// Whether key rotation is supported.
    pub key_rotation_supported: bool,

    /// The server's public keys, served at `/.well-known/jwks.json`.
    #[serde(default)]
    pub jwks: Jwks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".into(),
            audience: vec![],
            grant_ttl_seconds: 600,
            token_ttl_seconds: 300,
            wait_seconds: 5,
            min_poll_seconds: 1,
            interaction_start_modes: vec!["user_code".into()],
            interaction_finish_methods: vec![],
            key_proofs: vec!["httpsig".into()],
            sub_id_formats: vec!["opaque".into()],
            assertion_formats: vec![],
            key_rotation_supported: true,
            jwks: Jwks::default(),
        }
    }
}

/// A discovery query: `OPTIONS /grants`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DiscoveryRequest {}

/// The GNAP AS discovery document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// The grant request endpoint. Always an absolute `https` URL.
    pub grant_request_endpoint: String,

    /// Interaction start modes.
    pub interaction_start_modes_supported: Vec<String>,

    /// Interaction finish methods.
    pub interaction_finish_methods_supported: Vec<String>,

    /// Key proof methods.
    pub key_proofs_supported: Vec<String>,

    /// Subject identifier formats.
    pub sub_id_formats_supported: Vec<String>,

    /// Assertion formats.
    pub assertion_formats_supported: Vec<String>,

    /// Whether key rotation is supported.
    pub key_rotation_supported: bool,
}

/// A JWKS query: `GET /.well-known/jwks.json`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct JwksRequest {}
