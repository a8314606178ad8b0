//! # Generate
//!
//! Generate random values for access tokens, continuation tokens, and user
//! codes. All generation draws from the operating system CSPRNG.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use rand::rngs::OsRng;

const USER_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates an opaque access token value: 256 random bits, base64url
/// encoded without padding.
#[must_use]
pub fn token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    Base64UrlUnpadded::encode_string(&raw)
}

/// Generates a continuation token: 128 random bits as lowercase hex
/// (32 characters).
#[must_use]
pub fn continuation_token() -> String {
    let mut raw = [0u8; 16];
    OsRng.fill_bytes(&mut raw);
    raw.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates a user code for the device flow: 8 characters from `A-Z0-9`,
/// formatted `XXXX-XXXX`.
#[must_use]
pub fn user_code() -> String {
    let mut raw = [0u8; 8];
    OsRng.fill_bytes(&mut raw);

    let chars: Vec<char> = raw
        .iter()
        .map(|b| USER_CODE_CHARS[*b as usize % USER_CODE_CHARS.len()] as char)
        .collect();

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[4..].iter().collect();
    format!("{head}-{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_unpadded_base64url() {
        let t = token();
        assert_eq!(t.len(), 43);
        assert!(!t.contains('='));
        assert!(Base64UrlUnpadded::decode_vec(&t).is_ok());
    }

    #[test]
    fn continuation_token_is_hex() {
        let t = continuation_token();
        assert_eq!(t.len(), 32);
        assert!(t.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn user_code_shape() {
        let code = user_code();
        assert_eq!(code.len(), 9);
        let (head, tail) = code.split_at(4);
        assert!(head.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(&tail[..1], "-");
        assert!(tail[1..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
