//! # Introspection types
//!
//! The RS-to-AS token introspection contract (RFC 9767 style). The inactive
//! response form is exactly `{"active": false}` with no other members.

use serde::{Deserialize, Serialize};

use crate::gnap::types::access::AccessItem;
use crate::gnap::types::token::{BoundKey, TokenRecord};
use crate::httpsig::RsIdentity;
use crate::jose::PublicKeyJwk;

/// An introspection query from a resource server.
///
/// The `rs` field does not come from the body: the HTTP boundary populates
/// it with the identity established by HTTP Message Signature verification
/// before calling the handler.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IntrospectionRequest {
    /// The token value under query.
    pub access_token: String,

    /// The proof method the RS observed the client using. Recommended;
    /// required to match for bound tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,

    /// The calling resource server.
    pub resource_server: ResourceServer,

    /// Access the RS requires the token to satisfy. Optional filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<AccessItem>,

    /// The authenticated caller, attached by the HTTP boundary after
    /// signature verification.
    #[serde(skip)]
    pub rs: Option<RsIdentity>,
}

/// The `resource_server` member of an introspection request: either the
/// caller's canonical identifier, or an object carrying its key for the
/// server to resolve by thumbprint. Required on every query — there is no
/// default caller.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResourceServer {
    /// Canonical resource server identifier.
    Id(String),

    /// A resource server described by reference object.
    ByRef(ResourceServerRef),
}

/// A resource server reference object.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResourceServerRef {
    /// The resource server's key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PublicKeyJwk>,
}

/// An introspection response. The error form is `{"active": false}`
/// exactly; every other member is populated only on the active form.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Whether the token is active for the calling resource server.
    pub active: bool,

    /// The issuing server. Present when active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// The token's access, filtered for the caller. Present when active,
    /// may be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Vec<AccessItem>>,

    /// The token's key binding, if bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<BoundKey>,

    /// Token flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,

    /// Expiry, unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at, unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before, unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// The token's audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Vec<String>>,

    /// The approved subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// The grant the token was issued under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl IntrospectionResponse {
    /// The opaque inactive form. Serializes to exactly
    /// `{"active": false}`.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// The active form for a token record, with access already filtered
    /// for the calling resource server.
    #[must_use]
    pub fn active(record: TokenRecord, filtered_access: Vec<AccessItem>) -> Self {
        Self {
            active: true,
            iss: Some(record.iss),
            access: Some(filtered_access),
            key: record.bound_key,
            flags: None,
            exp: (record.exp != 0).then_some(record.exp),
            iat: (record.iat != 0).then_some(record.iat),
            nbf: (record.nbf != 0).then_some(record.nbf),
            aud: (!record.aud.is_empty()).then_some(record.aud),
            sub: record.sub,
            instance_id: Some(record.instance_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // `resource_server` arrives as an identifier string or a reference
    // object.
    #[test]
    fn resource_server_shapes() {
        let id: ResourceServer = serde_json::from_value(json!("rs:photos")).unwrap();
        assert_eq!(id, ResourceServer::Id("rs:photos".into()));

        let by_ref: ResourceServer = serde_json::from_value(json!({
            "key": {"kty": "OKP", "crv": "Ed25519",
                    "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}
        }))
        .unwrap();
        assert!(matches!(by_ref, ResourceServer::ByRef(ref r) if r.key.is_some()));
    }

    // The inactive form must carry no members besides `active`.
    #[test]
    fn inactive_is_opaque() {
        let value = serde_json::to_value(IntrospectionResponse::inactive()).unwrap();
        assert_eq!(value, json!({"active": false}));
    }

    #[test]
    fn active_omits_unset_members() {
        let record = TokenRecord {
            hash_b64: "h".into(),
            iss: "https://as.example".into(),
            instance_id: "g-1".into(),
            iat: 100,
            nbf: 100,
            exp: 400,
            ..TokenRecord::default()
        };

        let value = serde_json::to_value(IntrospectionResponse::active(record, vec![])).unwrap();
        assert_eq!(
            value,
            json!({
                "active": true,
                "iss": "https://as.example",
                "access": [],
                "exp": 400,
                "iat": 100,
                "nbf": 100,
                "instance_id": "g-1"
            })
        );
    }
}
