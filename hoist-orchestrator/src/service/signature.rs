//! Webhook signature verification
//!
//! Event sources sign the raw request body with HMAC-SHA256 keyed by a shared
//! secret and send `sha256=<lowercase hex digest>` in the
//! `X-Hub-Signature-256` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Prefix of the signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Length of a hex-encoded SHA-256 digest
const HEX_DIGEST_LEN: usize = 64;

/// Computes the signature header value for `body`
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Checks that `signature_header` is a valid signature of `raw_body`
///
/// Fails closed: a missing header, an empty body, a wrong prefix, non-hex or
/// uppercase digits, or a digest of the wrong length all return `false`.
/// The digest comparison itself is constant-time and only runs on inputs of
/// the expected length.
pub fn verify(raw_body: &[u8], signature_header: Option<&str>, secret: &[u8]) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    if raw_body.is_empty() {
        return false;
    }

    let Some(digest_hex) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    if digest_hex.len() != HEX_DIGEST_LEN || !is_lower_hex(digest_hex) {
        return false;
    }
    let Ok(provided) = hex::decode(digest_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&provided).is_ok()
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Whether inbound webhooks must carry a valid signature
///
/// Disabling verification is an explicit deployment decision, never the
/// fallback when a secret is missing.
#[derive(Clone)]
pub enum SignaturePolicy {
    Required { secret: Vec<u8> },
    Disabled,
}

impl SignaturePolicy {
    pub fn required(secret: impl Into<Vec<u8>>) -> Self {
        SignaturePolicy::Required {
            secret: secret.into(),
        }
    }

    /// Returns whether the request may proceed
    pub fn check(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool {
        match self {
            SignaturePolicy::Required { secret } => verify(raw_body, signature_header, secret),
            SignaturePolicy::Disabled => true,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, SignaturePolicy::Required { .. })
    }
}

impl std::fmt::Debug for SignaturePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignaturePolicy::Required { .. } => write!(f, "Required {{ secret: <redacted> }}"),
            SignaturePolicy::Disabled => write!(f, "Disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    #[test]
    fn test_known_vector() {
        // Published example for GitHub webhook signatures
        assert_eq!(
            sign(SECRET, BODY),
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn test_valid_signature_accepted() {
        let signature = sign(SECRET, BODY);
        assert!(verify(BODY, Some(&signature), SECRET));
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(!verify(BODY, None, SECRET));
    }

    #[test]
    fn test_empty_body_rejected() {
        let signature = sign(SECRET, b"");
        assert!(!verify(b"", Some(&signature), SECRET));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signature = sign(b"other-secret", BODY);
        assert!(!verify(BODY, Some(&signature), SECRET));
    }

    #[test]
    fn test_every_single_byte_mutation_rejected() {
        let signature = sign(SECRET, BODY);
        let bytes = signature.as_bytes();

        for i in 0..bytes.len() {
            for replacement in [b'0', b'f', b'A', b'=', b' ', b'x'] {
                if bytes[i] == replacement {
                    continue;
                }
                let mut mutated = bytes.to_vec();
                mutated[i] = replacement;
                let mutated = String::from_utf8(mutated).unwrap();
                assert!(
                    !verify(BODY, Some(&mutated), SECRET),
                    "mutation at {} accepted: {}",
                    i,
                    mutated
                );
            }
        }
    }

    #[test]
    fn test_length_mismatch_returns_false() {
        let signature = sign(SECRET, BODY);
        assert!(!verify(BODY, Some(&signature[..signature.len() - 2]), SECRET));
        assert!(!verify(BODY, Some(&format!("{}00", signature)), SECRET));
        assert!(!verify(BODY, Some("sha256="), SECRET));
        assert!(!verify(BODY, Some(""), SECRET));
    }

    #[test]
    fn test_malformed_header_returns_false() {
        let digest = sign(SECRET, BODY).trim_start_matches(SIGNATURE_PREFIX).to_string();
        assert!(!verify(BODY, Some(&digest), SECRET));
        assert!(!verify(BODY, Some(&format!("sha1={}", digest)), SECRET));
        assert!(!verify(BODY, Some(&format!("sha256={}", "z".repeat(64))), SECRET));
        assert!(!verify(BODY, Some(&format!("sha256={}", digest.to_uppercase())), SECRET));
    }

    #[test]
    fn test_disabled_policy_allows_unsigned() {
        assert!(SignaturePolicy::Disabled.check(BODY, None));
        assert!(!SignaturePolicy::required(SECRET).check(BODY, None));
    }

    #[test]
    fn test_policy_debug_redacts_secret() {
        let debug = format!("{:?}", SignaturePolicy::required("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
