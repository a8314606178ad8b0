//! Key registry behavior: admin registration, thumbprint addressing,
//! trust-on-first-use policy, rotation, and resolution of signed requests
//! through the registry.

use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use ecdsa::signature::Signer as _;
use gnap_as::gnap::provider::{KeyRegistry, RegistryResolver, UnknownKey};
use gnap_as::gnap::types::{Config, GetKeyRequest, ListKeysRequest, RegisterKeyRequest};
use gnap_as::httpsig::{self, RequestParts, VerifierConfig, VerifyError};
use gnap_as::jose::PublicKeyJwk;
use gnap_as::store::MemoryProvider;
use serde_json::json;

fn provider() -> MemoryProvider {
    MemoryProvider::new(Config::default())
}

fn rs_jwk(signing_key: &ed25519_dalek::SigningKey, kid: &str) -> PublicKeyJwk {
    serde_json::from_value(json!({
        "kid": kid,
        "kty": "OKP",
        "crv": "Ed25519",
        "x": Base64UrlUnpadded::encode_string(signing_key.verifying_key().as_bytes()),
    }))
    .expect("should deserialize")
}

#[tokio::test]
async fn register_then_fetch_round_trips() {
    let provider = provider();
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[11u8; 32]);
    let jwk = rs_jwk(&signing_key, "rs-1");
    let thumb = jwk.thumbprint().unwrap();

    let registered = gnap_as::gnap::register_key(
        provider.clone(),
        RegisterKeyRequest {
            tenant: "acme".into(),
            jwk: jwk.clone(),
            kid: Some("rs-1".into()),
            alg: Some("ed25519".into()),
            display_rs: Some("rs:photos".into()),
        },
    )
    .await
    .expect("should register");

    assert_eq!(registered.thumb256, thumb);

    let fetched = gnap_as::gnap::get_key(
        provider.clone(),
        GetKeyRequest { tenant: "acme".into(), thumb256: thumb.clone() },
    )
    .await
    .expect("should fetch");

    assert_eq!(fetched.pub_jwk, jwk);
    assert!(fetched.active);
    assert_eq!(fetched.rs_id(), "rs:photos");

    let listed = gnap_as::gnap::list_keys(
        provider.clone(),
        ListKeysRequest { tenant: "acme".into() },
    )
    .await
    .expect("should list");
    assert_eq!(listed.keys.len(), 1);
}

// With TOFU disabled, an unseen key is rejected and the registry is
// unchanged.
#[tokio::test]
async fn tofu_disabled_rejects_unknown_key() {
    let provider = provider();
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[12u8; 32]);
    let jwk = rs_jwk(&signing_key, "rs-1");

    let err = KeyRegistry::upsert(
        &provider,
        "acme",
        jwk,
        Some("rs-1".into()),
        None,
        None,
        false,
    )
    .await
    .expect_err("should reject");
    assert!(err.downcast_ref::<UnknownKey>().is_some());

    let listed = gnap_as::gnap::list_keys(
        provider.clone(),
        ListKeysRequest { tenant: "acme".into() },
    )
    .await
    .expect("should list");
    assert!(listed.keys.is_empty(), "registry must be unchanged");
}

// Re-registering the same key updates metadata under the same address,
// and deactivation stamps rotation without deleting.
#[tokio::test]
async fn rotation_preserves_records() {
    let provider = provider();
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[13u8; 32]);
    let jwk = rs_jwk(&signing_key, "rs-1");
    let thumb = jwk.thumbprint().unwrap();

    let request = RegisterKeyRequest {
        tenant: "acme".into(),
        jwk: jwk.clone(),
        kid: Some("rs-1".into()),
        alg: None,
        display_rs: None,
    };
    gnap_as::gnap::register_key(provider.clone(), request.clone()).await.unwrap();

    // same key, new metadata: same address
    let renamed =
        RegisterKeyRequest { display_rs: Some("rs:photos".into()), ..request.clone() };
    let updated = gnap_as::gnap::register_key(provider.clone(), renamed).await.unwrap();
    assert_eq!(updated.thumb256, thumb);

    gnap_as::gnap::deactivate_key(
        provider.clone(),
        gnap_as::gnap::DeactivateKeyRequest { tenant: "acme".into(), thumb256: thumb.clone() },
    )
    .await
    .expect("should deactivate");

    let fetched = gnap_as::gnap::get_key(
        provider.clone(),
        GetKeyRequest { tenant: "acme".into(), thumb256: thumb.clone() },
    )
    .await
    .expect("record survives rotation");
    assert!(!fetched.active);
    assert!(fetched.rotated_at.is_some());

    // an inactive key no longer resolves by kid
    assert!(KeyRegistry::lookup_by_kid(&provider, "rs-1").await.is_err());
}

#[tokio::test]
async fn deactivate_unknown_key_is_not_found() {
    let provider = provider();

    let err = gnap_as::gnap::deactivate_key(
        provider.clone(),
        gnap_as::gnap::DeactivateKeyRequest { tenant: "acme".into(), thumb256: "zzzz".into() },
    )
    .await
    .expect_err("should fail");
    assert!(matches!(err, gnap_as::gnap::Error::NotFound(_)));
    assert_eq!(err.status(), 404);
}

// A resource server signs a request; the verifier resolves its key through
// the registry by `keyid` and yields the registered identity.
#[tokio::test]
async fn signed_request_resolves_through_registry() {
    let provider = provider();
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[14u8; 32]);

    gnap_as::gnap::register_key(
        provider.clone(),
        RegisterKeyRequest {
            tenant: "acme".into(),
            jwk: rs_jwk(&signing_key, "rs-1"),
            kid: Some("rs-1".into()),
            alg: Some("ed25519".into()),
            display_rs: Some("rs:photos".into()),
        },
    )
    .await
    .expect("should register");

    let created = chrono::Utc::now().timestamp();
    let input_header = format!(
        r#"sig1=("@method" "@target-uri");created={created};keyid="rs-1";alg="ed25519""#
    );
    let mut parts = RequestParts {
        method: "POST".into(),
        scheme: "https".into(),
        authority: "as.example".into(),
        path_and_query: "/introspect".into(),
        headers: vec![("Signature-Input".into(), input_header.clone())],
    };

    let input = httpsig::parse::signature_input(&input_header, httpsig::SIGNATURE_LABEL).unwrap();
    let base = httpsig::signature_base(&parts, &input).unwrap();
    let signature: ed25519_dalek::Signature = signing_key.sign(&base);
    parts.headers.push((
        "Signature".into(),
        format!("sig1=:{}:", Base64::encode_string(&signature.to_bytes())),
    ));

    let resolver = RegistryResolver { registry: &provider };
    let identity = httpsig::verify(&parts, &VerifierConfig::default(), &resolver)
        .await
        .expect("should verify");

    assert_eq!(identity.id, "rs:photos");
    assert_eq!(identity.key_id, "rs-1");

    // an unknown keyid is a resolution failure, not a signature failure
    let mut unknown = parts.clone();
    for (name, value) in &mut unknown.headers {
        if name == "Signature-Input" {
            *value = value.replace("rs-1", "rs-9");
        }
    }
    let err = httpsig::verify(&unknown, &VerifierConfig::default(), &resolver)
        .await
        .expect_err("should fail resolution");
    assert_eq!(err, VerifyError::KeyNotFound);
}
