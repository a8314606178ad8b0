//! Introspection behavior: the active-predicate, audience and binding
//! checks, the access filter, and the exact shape of the inactive
//! response.

use chrono::Utc;
use gnap_as::gnap::provider::TokenStore;
use gnap_as::gnap::types::{Config, IntrospectionRequest, TokenRecord, token_hash};
use gnap_as::httpsig::{Algorithm, RsIdentity};
use gnap_as::store::MemoryProvider;
use serde_json::json;

const ISSUER: &str = "https://as.example";
const RS_ID: &str = "rs:photos";

fn provider() -> MemoryProvider {
    MemoryProvider::new(Config { issuer: ISSUER.into(), ..Config::default() })
}

fn rs_identity() -> RsIdentity {
    RsIdentity { id: RS_ID.into(), key_id: "rs-1".into(), alg: Algorithm::Ed25519 }
}

fn record(token: &str) -> TokenRecord {
    let now = Utc::now().timestamp();
    TokenRecord {
        hash_b64: token_hash(token),
        iss: ISSUER.into(),
        access: serde_json::from_value(json!([{"type": "photo-api", "actions": ["read"]}]))
            .unwrap(),
        aud: vec![],
        sub: Some("user:alice".into()),
        instance_id: "grant-1".into(),
        iat: now,
        nbf: now,
        exp: now + 300,
        revoked: false,
        bound_key: None,
    }
}

fn request(token: &str) -> IntrospectionRequest {
    let mut request: IntrospectionRequest = serde_json::from_value(json!({
        "access_token": token,
        "resource_server": RS_ID,
    }))
    .unwrap();
    request.rs = Some(rs_identity());
    request
}

async fn seed(provider: &MemoryProvider, record: TokenRecord) {
    TokenStore::put(provider, record).await.expect("should store");
}

// A revoked token's response is exactly {"active": false}, no siblings.
#[tokio::test]
async fn revoked_token_is_opaquely_inactive() {
    let provider = provider();
    let token = "opaque-token-value";
    seed(&provider, record(token)).await;

    TokenStore::revoke(&provider, &token_hash(token)).await.expect("should revoke");

    let response =
        gnap_as::gnap::introspect(provider.clone(), request(token)).await.expect("should shape");

    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"active": false}));
}

// An empty audience admits any RS; a mismatched audience admits none.
#[tokio::test]
async fn audience_semantics() {
    let provider = provider();

    let token = "unrestricted";
    seed(&provider, record(token)).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(response.active, "empty aud is unrestricted");

    let token = "restricted";
    let mut restricted = record(token);
    restricted.aud = vec!["rs:other".into()];
    seed(&provider, restricted).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"active": false}));
}

// Unknown token, wrong issuer, future nbf: all inactive.
#[tokio::test]
async fn validity_window_and_issuer() {
    let provider = provider();

    let response =
        gnap_as::gnap::introspect(provider.clone(), request("never-issued")).await.unwrap();
    assert!(!response.active);

    let token = "foreign";
    let mut foreign = record(token);
    foreign.iss = "https://other.example".into();
    seed(&provider, foreign).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(!response.active);

    let token = "not-yet";
    let mut early = record(token);
    early.nbf = Utc::now().timestamp() + 60;
    seed(&provider, early).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(!response.active);

    let token = "stale";
    let mut stale = record(token);
    stale.exp = Utc::now().timestamp() - 1;
    seed(&provider, stale).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(!response.active);
}

// A bound token requires the matching proof tag.
#[tokio::test]
async fn bound_token_requires_proof() {
    let provider = provider();

    let token = "bound";
    let mut bound = record(token);
    bound.bound_key = serde_json::from_value(json!({
        "proof": "httpsig",
        "jwk": {"kty": "OKP", "crv": "Ed25519",
                "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}
    }))
    .unwrap();
    seed(&provider, bound).await;

    // no proof in the query
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(!response.active);

    // wrong proof
    let mut wrong = request(token);
    wrong.proof = Some("dpop".into());
    let response = gnap_as::gnap::introspect(provider.clone(), wrong).await.unwrap();
    assert!(!response.active);

    // matching proof: active, and the binding is echoed
    let mut matching = request(token);
    matching.proof = Some("httpsig".into());
    let response = gnap_as::gnap::introspect(provider.clone(), matching).await.unwrap();
    assert!(response.active);
    assert_eq!(response.key.as_ref().map(|k| k.proof.as_str()), Some("httpsig"));
}

// The access filter is an element-wise subset by (type, identifier).
#[tokio::test]
async fn access_filter_subset() {
    let provider = provider();
    let token = "filtered";
    seed(&provider, record(token)).await;

    // filter equal to the token's access admits
    let mut equal = request(token);
    equal.access = serde_json::from_value(json!([{"type": "photo-api"}])).unwrap();
    let response = gnap_as::gnap::introspect(provider.clone(), equal).await.unwrap();
    assert!(response.active);

    // a strictly larger filter rejects
    let mut larger = request(token);
    larger.access =
        serde_json::from_value(json!([{"type": "photo-api"}, {"type": "print-api"}])).unwrap();
    let response = gnap_as::gnap::introspect(provider.clone(), larger).await.unwrap();
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"active": false}));
}

// The body's resource_server must match the authenticated identity, and a
// missing identity shapes inactive.
#[tokio::test]
async fn caller_identity_checks() {
    let provider = provider();
    let token = "identity";
    seed(&provider, record(token)).await;

    // no authenticated identity
    let mut unauthenticated = request(token);
    unauthenticated.rs = None;
    let response = gnap_as::gnap::introspect(provider.clone(), unauthenticated).await.unwrap();
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"active": false}));

    // body names a different RS than the signature proved
    let mut mismatched = request(token);
    mismatched.resource_server = gnap_as::gnap::ResourceServer::Id("rs:other".into());
    let response = gnap_as::gnap::introspect(provider.clone(), mismatched).await.unwrap();
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"active": false}));
}

// Token TTL boundary: active strictly before exp, inactive at and after.
#[tokio::test]
async fn expiry_boundary() {
    let provider = provider();
    let now = Utc::now().timestamp();

    let token = "boundary";
    let mut at_boundary = record(token);
    at_boundary.exp = now;
    seed(&provider, at_boundary).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(!response.active, "exp <= now is inactive");

    let token = "alive";
    let mut alive = record(token);
    alive.exp = now + 2;
    seed(&provider, alive).await;
    let response = gnap_as::gnap::introspect(provider.clone(), request(token)).await.unwrap();
    assert!(response.active, "now < exp is active");
}
