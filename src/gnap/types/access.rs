//! # Access
//!
//! The access-rights vocabulary shared by grant requests, token records,
//! and introspection: what a client is asking to do, expressed as typed
//! access items grouped into labeled access token requests.

use serde::{Deserialize, Serialize};

use crate::jose::PublicKeyJwk;

/// The client making a grant request, described by its key.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Client {
    /// The client's key material and proofing method.
    pub key: ClientKey,
}

/// A client key: the proof method the client will use to demonstrate
/// possession, and the public key itself.
///
/// `"httpsig"` is the only method the server validates; other registered
/// method names are carried as opaque tags.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientKey {
    /// Registered proof method name, e.g. `"httpsig"`.
    pub proof: String,

    /// The client's public key.
    pub jwk: PublicKeyJwk,
}

/// How the client can start the interaction that gathers user consent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Interact {
    /// Interaction start modes, e.g. `["user_code"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub start: Vec<String>,
}

/// The `access_token` member of a grant request: a client asking for a
/// single token sends one request object, a client asking for several
/// sends an array of labeled ones. Responses mirror the shape of the
/// request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TokenRequests {
    /// A single requested access token.
    One(AccessTokenRequest),

    /// Several requested access tokens, distinguished by label.
    Many(Vec<AccessTokenRequest>),
}

impl TokenRequests {
    /// The number of tokens the grant asks for.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(many) => many.len(),
        }
    }

    /// Whether the grant asks for no tokens at all (an empty array).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(many) if many.is_empty())
    }

    /// The requested token(s) as a slice, regardless of wire shape.
    #[must_use]
    pub fn as_slice(&self) -> &[AccessTokenRequest] {
        match self {
            Self::One(one) => std::slice::from_ref(one),
            Self::Many(many) => many.as_slice(),
        }
    }
}

/// One requested access token: a label and the access items it should
/// carry.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessTokenRequest {
    /// Distinguishes this token request when a grant carries several.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// The access the token should grant.
    pub access: Vec<AccessItem>,

    /// Requested token flags, carried opaquely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

/// A single right being requested or granted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessItem {
    /// The kind of resource the right applies to.
    #[serde(rename = "type")]
    pub type_: String,

    /// Specific resource instance, when the right is narrower than the
    /// type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Actions permitted on the resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,

    /// Locations (URIs) the right applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,

    /// Kinds of data available from the resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datatypes: Vec<String>,

    /// Opaque constraint object, interpreted by the resource server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn access_item_round_trip() {
        let value = json!({
            "type": "photo-api",
            "identifier": "album-7",
            "actions": ["read", "list"],
            "constraints": {"max_size": 1024}
        });

        let item: AccessItem = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(item.type_, "photo-api");
        assert_eq!(item.actions, ["read", "list"]);
        assert_eq!(serde_json::to_value(&item).unwrap(), value);
    }

    #[test]
    fn empty_collections_omitted() {
        let item = AccessItem { type_: "photo-api".into(), ..AccessItem::default() };
        assert_eq!(serde_json::to_value(&item).unwrap(), json!({"type": "photo-api"}));
    }

    // `access_token` is an object for one token, an array for several.
    #[test]
    fn token_requests_one_or_many() {
        let one: TokenRequests =
            serde_json::from_value(json!({"access": [{"type": "photo-api"}]})).unwrap();
        assert_eq!(one.len(), 1);
        assert!(!one.is_empty());

        let many: TokenRequests = serde_json::from_value(json!([
            {"label": "photos", "access": [{"type": "photo-api"}]},
            {"label": "prints", "access": [{"type": "print-api"}]}
        ]))
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many.as_slice()[1].label.as_deref(), Some("prints"));

        let none: TokenRequests = serde_json::from_value(json!([])).unwrap();
        assert!(none.is_empty());
    }
}
