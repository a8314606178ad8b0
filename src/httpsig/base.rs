//! # Signature base
//!
//! Deterministic, byte-exact reconstruction of the signature base
//! ([RFC9421], section 2.5) from a request and a parsed `Signature-Input`
//! entry. Both signer and verifier must produce identical bytes.
//!
//! [RFC9421]: https://www.rfc-editor.org/rfc/rfc9421

use std::fmt::Write as _;

use crate::httpsig::parse::{ParamValue, SignatureInput};
use crate::httpsig::{RequestParts, VerifyError};

/// Construct the signature base for the covered components of `input`.
///
/// One line per covered component, `"<lowercased-name>": <value>\n`,
/// followed by the `"@signature-params"` line carrying the component list
/// and the signature parameters in their original order.
///
/// # Errors
///
/// Will return an error if a derived component is outside the supported
/// vocabulary or a covered header field is missing from the request.
pub fn signature_base(
    parts: &RequestParts, input: &SignatureInput,
) -> Result<Vec<u8>, VerifyError> {
    let mut base = String::new();

    for component in &input.components {
        let name = component.to_lowercase();
        if let Some(derived) = name.strip_prefix('@') {
            let value = match derived {
                "method" => parts.method.to_lowercase(),
                "target-uri" => parts.target_uri(),
                "authority" => parts.authority.to_lowercase(),
                _ => return Err(VerifyError::UnsupportedComponent(component.clone())),
            };
            let _ = writeln!(base, "\"@{derived}\": {value}");
        } else {
            let values = parts.header_values(&name);
            if values.is_empty() {
                return Err(VerifyError::MissingCoveredField(component.clone()));
            }
            let _ = writeln!(base, "\"{name}\": {}", values.join(", "));
        }
    }

    let components =
        input.components.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(" ");

    let mut params = vec![];
    for (key, value) in &input.params {
        match value {
            ParamValue::Int(int) => params.push(format!("{key}={int}")),
            // `alg` names are compared case-insensitively; canonicalize
            ParamValue::Str(s) if key == "alg" => {
                params.push(format!("{key}=\"{}\"", s.to_lowercase()));
            }
            ParamValue::Str(s) => params.push(format!("{key}=\"{s}\"")),
        }
    }

    let _ = writeln!(base, "\"@signature-params\": ({components});{}", params.join(";"));

    Ok(base.into_bytes())
}

#[cfg(test)]
mod tests {
    use crate::httpsig::parse::signature_input;

    use super::*;

    fn request() -> RequestParts {
        RequestParts {
            method: "POST".into(),
            scheme: "https".into(),
            authority: "as.example".into(),
            path_and_query: "/introspect".into(),
            headers: vec![(
                "Content-Digest".into(),
                "sha-256=:RBNvo1WzZ4oRRq0W9+hknpT7T8If536DEMBg9hyq/4o=:".into(),
            )],
        }
    }

    // The base must match this fixture byte for byte.
    #[test]
    fn base_is_byte_exact() {
        let header = r#"sig1=("@method" "@target-uri" "content-digest");created=1700000000;keyid="k1";alg="ed25519""#;
        let input = signature_input(header, "sig1").unwrap();

        let base = signature_base(&request(), &input).unwrap();

        let expected = "\"@method\": post\n\
            \"@target-uri\": https://as.example/introspect\n\
            \"content-digest\": sha-256=:RBNvo1WzZ4oRRq0W9+hknpT7T8If536DEMBg9hyq/4o=:\n\
            \"@signature-params\": (\"@method\" \"@target-uri\" \"content-digest\");created=1700000000;keyid=\"k1\";alg=\"ed25519\"\n";
        assert_eq!(base, expected.as_bytes());
    }

    #[test]
    fn authority_is_lowercased() {
        let header = r#"sig1=("@authority");keyid="k1""#;
        let input = signature_input(header, "sig1").unwrap();

        let mut parts = request();
        parts.authority = "AS.Example".into();

        let base = signature_base(&parts, &input).unwrap();
        let text = String::from_utf8(base).unwrap();
        assert!(text.starts_with("\"@authority\": as.example\n"));
    }

    #[test]
    fn unknown_derived_component_fails() {
        let header = r#"sig1=("@query");keyid="k1""#;
        let input = signature_input(header, "sig1").unwrap();

        let err = signature_base(&request(), &input).unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedComponent(_)));
    }

    #[test]
    fn missing_covered_header_fails() {
        let header = r#"sig1=("authorization");keyid="k1""#;
        let input = signature_input(header, "sig1").unwrap();

        let err = signature_base(&request(), &input).unwrap_err();
        assert!(matches!(err, VerifyError::MissingCoveredField(_)));
    }

    #[test]
    fn repeated_header_values_joined() {
        let header = r#"sig1=("x-forwarded-for");keyid="k1""#;
        let input = signature_input(header, "sig1").unwrap();

        let mut parts = request();
        parts.headers.push(("X-Forwarded-For".into(), "10.0.0.1".into()));
        parts.headers.push(("X-Forwarded-For".into(), "10.0.0.2".into()));

        let base = signature_base(&parts, &input).unwrap();
        let text = String::from_utf8(base).unwrap();
        assert!(text.starts_with("\"x-forwarded-for\": 10.0.0.1, 10.0.0.2\n"));
    }
}
