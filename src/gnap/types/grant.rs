//! # Grant request and continuation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gnap::types::access::{AccessItem, Client, Interact, TokenRequests};

/// A grant request as submitted to `POST /grants`. The HTTP boundary has
/// already verified the client's key proof over the raw request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GrantRequest {
    /// The requesting client, described by key.
    pub client: Client,

    /// One or more requested access tokens.
    pub access_token: TokenRequests,

    /// Requested interaction capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interact: Option<Interact>,
}

/// Response to a grant request: the continuation handle and the user-code
/// interaction block.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GrantResponse {
    /// How to continue the grant.
    #[serde(rename = "continue")]
    pub continue_: ContinueInfo,

    /// The pending interaction.
    pub interact: InteractResponse,
}

/// Continuation handle returned with a pending grant.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContinueInfo {
    /// The continuation token, presented as `Authorization: GNAP <token>`.
    pub access_token: String,

    /// The continuation endpoint for this grant.
    pub uri: String,

    /// Seconds the client should wait between polls.
    pub wait: u64,
}

/// The interaction block of a grant response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InteractResponse {
    /// When the pending grant expires.
    pub expires: DateTime<Utc>,

    /// The user code the end user must enter.
    pub user_code: UserCodeInfo,
}

/// A user code and where to enter it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserCodeInfo {
    /// The code, formatted `XXXX-XXXX`.
    pub code: String,

    /// The verification surface URI.
    pub uri: String,
}

/// A continuation poll: `POST /continue/{grant_id}` with
/// `Authorization: GNAP <token>`. Built by the HTTP boundary from the path
/// and the `Authorization` header.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContinuationRequest {
    /// The grant being continued.
    pub grant_id: String,

    /// The bearer from the `Authorization` header, if one was presented.
    pub token: Option<String>,
}

/// Response to a continuation poll. A still-pending grant echoes the
/// continuation handle; an approved grant carries the issued token(s).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContinueResponse {
    /// Present while the grant is pending: poll again.
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_: Option<ContinueInfo>,

    /// The issued token(s), once the grant is approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<IssuedTokens>,

    /// The grant id, for subsequent token management.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    /// The approved subject, when one was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectIds>,
}

/// Issued token value(s): a bare value for a single token request, labeled
/// values when the grant carried several.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IssuedTokens {
    /// A single token value.
    One(String),

    /// One labeled token per access token request.
    Many(Vec<LabeledToken>),
}

/// A labeled token value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LabeledToken {
    /// The label from the corresponding access token request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// The token value.
    pub value: String,

    /// The access the token carries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<AccessItem>,
}

/// Subject identifiers recorded at approval.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubjectIds {
    /// Principal identifiers, e.g. `["user:alice"]`.
    pub sub_ids: Vec<String>,
}

/// Extract the bearer from a `Authorization: GNAP <token>` header value.
#[must_use]
pub fn extract_gnap_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("GNAP ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn gnap_token_extraction() {
        assert_eq!(extract_gnap_token("GNAP abc123"), Some("abc123"));
        assert_eq!(extract_gnap_token("Bearer abc123"), None);
        assert_eq!(extract_gnap_token("GNAP "), None);
        assert_eq!(extract_gnap_token(""), None);
    }

    #[test]
    fn single_access_token_request() {
        let request: GrantRequest = serde_json::from_value(json!({
            "client": {"key": {"proof": "httpsig", "jwk": {
                "kty": "OKP", "crv": "Ed25519",
                "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"
            }}},
            "access_token": {"access": [{"type": "photo-api"}]}
        }))
        .unwrap();

        assert_eq!(request.access_token.len(), 1);
        assert_eq!(request.client.key.proof, "httpsig");
    }

    #[test]
    fn issued_tokens_shapes() {
        assert_eq!(serde_json::to_value(IssuedTokens::One("tok".into())).unwrap(), json!("tok"));

        let many = IssuedTokens::Many(vec![LabeledToken {
            label: Some("photos".into()),
            value: "tok".into(),
            access: vec![],
        }]);
        assert_eq!(
            serde_json::to_value(many).unwrap(),
            json!([{"label": "photos", "value": "tok"}])
        );
    }
}
