//! # Signature header parsing
//!
//! Parsing of the `Signature-Input` and `Signature` headers ([RFC9421],
//! section 4). Only the subset of Structured Fields the signature headers
//! use is implemented: inner lists of quoted strings with parameters, and
//! binary items between colons.
//!
//! [RFC9421]: https://www.rfc-editor.org/rfc/rfc9421

use base64ct::{Base64, Encoding};

use crate::httpsig::VerifyError;

/// A `Signature-Input` parameter value: a bare integer or a (possibly
/// quoted) string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    /// Bare integer, e.g. `created=1697044520`.
    Int(i64),

    /// String, e.g. `keyid="rs-kid"`.
    Str(String),
}

/// One labeled entry of a `Signature-Input` header: the ordered covered
/// components and the signature parameters in insertion order. Unrecognized
/// parameters are retained so the signature base can reproduce them
/// verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureInput {
    /// Covered components, in signing order.
    pub components: Vec<String>,

    /// Signature parameters, in insertion order.
    pub params: Vec<(String, ParamValue)>,
}

impl SignatureInput {
    /// The named parameter, if present.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The `created` timestamp (unix seconds).
    ///
    /// # Errors
    ///
    /// Will return an error if the parameter is present but not an integer.
    pub fn created(&self) -> Result<Option<i64>, VerifyError> {
        match self.param("created") {
            None => Ok(None),
            Some(ParamValue::Int(sec)) => Ok(Some(*sec)),
            Some(ParamValue::Str(_)) => Err(VerifyError::Malformed("bad created param".into())),
        }
    }

    /// The `keyid` parameter.
    #[must_use]
    pub fn keyid(&self) -> Option<&str> {
        match self.param("keyid") {
            Some(ParamValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The `alg` parameter.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        match self.param("alg") {
            Some(ParamValue::Str(s)) => Some(s),
            _ => None,
        }
    }
}

/// Parse the entry for `label` out of a `Signature-Input` header value.
///
/// Expected shape:
/// `sig1=("@method" "@target-uri");created=1697044520;keyid="rs-kid";alg="ed25519"`
///
/// # Errors
///
/// Will return an error if the label is absent or its entry is malformed.
pub fn signature_input(header: &str, label: &str) -> Result<SignatureInput, VerifyError> {
    for part in split_top_level(header, ',') {
        let part = part.trim();
        let Some(rest) = part.strip_prefix(label).and_then(|r| r.strip_prefix('=')) else {
            continue;
        };

        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix('(') else {
            return Err(VerifyError::Malformed("missing components".into()));
        };
        let Some(close) = rest.find(')') else {
            return Err(VerifyError::Malformed("unterminated components".into()));
        };

        let components = rest[..close]
            .split_whitespace()
            .map(|c| c.trim_matches('"').to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut params = vec![];
        for param in split_top_level(rest[close + 1..].trim_start(), ';') {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let Some((key, value)) = param.split_once('=') else {
                return Err(VerifyError::Malformed(format!("bare parameter {param:?}")));
            };

            let key = key.trim().to_lowercase();
            let value = value.trim();
            let value = if let Some(quoted) = value.strip_prefix('"') {
                let Some(inner) = quoted.strip_suffix('"') else {
                    return Err(VerifyError::Malformed("unterminated string".into()));
                };
                ParamValue::Str(inner.to_string())
            } else if let Ok(int) = value.parse::<i64>() {
                ParamValue::Int(int)
            } else {
                ParamValue::Str(value.to_string())
            };

            params.push((key, value));
        }

        return Ok(SignatureInput { components, params });
    }

    Err(VerifyError::Malformed("label not found".into()))
}

/// Extract the raw signature bytes for `label` from a `Signature` header
/// value. The value is a Structured Fields binary item: standard base64
/// between single colons, `sig1=:MEUCIQ…:`.
///
/// # Errors
///
/// Will return an error if the label is absent, the item is not sf-binary,
/// or the base64 does not decode.
pub fn signature(header: &str, label: &str) -> Result<Vec<u8>, VerifyError> {
    for part in split_top_level(header, ',') {
        let part = part.trim();
        let prefix = format!("{label}=");
        if !part.to_lowercase().starts_with(&prefix.to_lowercase()) {
            continue;
        }

        let value = part[prefix.len()..].trim();
        let Some(b64) = value.strip_prefix(':').and_then(|v| v.strip_suffix(':')) else {
            return Err(VerifyError::Malformed("signature not sf-binary".into()));
        };
        return Base64::decode_vec(b64)
            .map_err(|e| VerifyError::Malformed(format!("signature base64: {e}")));
    }

    Err(VerifyError::Malformed("label not found".into()))
}

// Split on `sep`, ignoring separators inside quotes or parentheses.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut out = vec![];
    let mut buf = String::new();
    let mut depth = 0u32;
    let mut in_quotes = false;

    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                buf.push(c);
            }
            '(' if !in_quotes => {
                depth += 1;
                buf.push(c);
            }
            ')' if !in_quotes => {
                depth = depth.saturating_sub(1);
                buf.push(c);
            }
            _ if c == sep && depth == 0 && !in_quotes => {
                out.push(std::mem::take(&mut buf));
            }
            _ => buf.push(c),
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"sig1=("@method" "@target-uri" "content-digest");created=1697044520;keyid="rs-kid";alg="ed25519""#;

    #[test]
    fn parses_components_and_params() {
        let entry = signature_input(INPUT, "sig1").unwrap();

        assert_eq!(entry.components, ["@method", "@target-uri", "content-digest"]);
        assert_eq!(entry.created().unwrap(), Some(1_697_044_520));
        assert_eq!(entry.keyid(), Some("rs-kid"));
        assert_eq!(entry.alg(), Some("ed25519"));
    }

    #[test]
    fn retains_unknown_params_in_order() {
        let header = r#"sig1=("@method");created=1;keyid="k";custom="x";alg="ed25519""#;
        let entry = signature_input(header, "sig1").unwrap();

        let names: Vec<&str> = entry.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["created", "keyid", "custom", "alg"]);
    }

    #[test]
    fn missing_label() {
        let err = signature_input(INPUT, "sig2").unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn second_label_found() {
        let header = format!(r#"sig0=("@authority");keyid="other", {INPUT}"#);
        let entry = signature_input(&header, "sig1").unwrap();
        assert_eq!(entry.keyid(), Some("rs-kid"));
    }

    #[test]
    fn signature_sf_binary() {
        let raw = signature("sig1=:aGVsbG8=:", "sig1").unwrap();
        assert_eq!(raw, b"hello");
    }

    #[test]
    fn signature_rejects_bare_value() {
        let err = signature("sig1=aGVsbG8=", "sig1").unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }
}
