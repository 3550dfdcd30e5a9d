//! `X-Hub-Signature-256` verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ListenerError;

/// Header carrying the delivery's HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Checks `header` (`sha256=<hex>`) against the HMAC of `body` under `secret`.
///
/// The comparison is constant-time.
pub fn verify_signature(secret: &[u8], body: &[u8], header: Option<&str>) -> Result<(), ListenerError> {
    let header = header.ok_or(ListenerError::MissingSignature)?;
    let expected = header
        .strip_prefix(PREFIX)
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(ListenerError::InvalidSignature)?;

    let mut mac = keyed(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ListenerError::InvalidSignature)
}

/// Computes the header value GitHub sends for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, ListenerError> {
    let mut mac = keyed(secret)?;
    mac.update(body);
    Ok(format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes())))
}

fn keyed(secret: &[u8]) -> Result<HmacSha256, ListenerError> {
    HmacSha256::new_from_slice(secret).map_err(|_| ListenerError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from GitHub's webhook validation documentation.
    const SECRET: &[u8] = b"It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";
    const SIGNATURE: &str =
        "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

    #[test]
    fn test_documented_signature_verifies() {
        assert_eq!(sign(SECRET, BODY).unwrap(), SIGNATURE);
        verify_signature(SECRET, BODY, Some(SIGNATURE)).unwrap();
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let err = verify_signature(SECRET, b"Hello, World?", Some(SIGNATURE)).unwrap_err();
        assert!(matches!(err, ListenerError::InvalidSignature));
    }

    #[test]
    fn test_missing_or_malformed_header_is_rejected() {
        assert!(matches!(
            verify_signature(SECRET, BODY, None),
            Err(ListenerError::MissingSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, BODY, Some("sha1=abcd")),
            Err(ListenerError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, BODY, Some("sha256=not-hex")),
            Err(ListenerError::InvalidSignature)
        ));
    }
}
