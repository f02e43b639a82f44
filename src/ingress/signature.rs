//! Verification of the `X-Hub-Signature-256` header GitHub attaches to webhook deliveries.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "sha256=";

/// Checks a `sha256=<hex>` header against the HMAC-SHA256 of `payload` under `secret`.
///
/// Malformed headers are rejected. The digest comparison runs in constant time.
pub fn verify_signature(payload: &[u8], header: &str, secret: &[u8]) -> bool {
    let Some(expected) = header
        .strip_prefix(PREFIX)
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Produces the header value GitHub would send for `payload`.
#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).unwrap();
    mac.update(payload);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vector() {
        // https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert!(verify_signature(
            b"Hello, World!",
            header,
            b"It's a Secret to Everybody"
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign(b"payload", b"right");
        assert!(!verify_signature(b"payload", &header, b"wrong"));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(!verify_signature(b"payload", "", b"secret"));
        assert!(!verify_signature(b"payload", "sha1=abcd", b"secret"));
        assert!(!verify_signature(b"payload", "sha256=not-hex", b"secret"));
        assert!(!verify_signature(b"payload", "sha256=abcd", b"secret"));
    }

    proptest! {
        #[test]
        fn signed_payloads_verify(
            payload in prop::collection::vec(any::<u8>(), 0..256),
            secret in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let header = sign(&payload, &secret);
            prop_assert!(verify_signature(&payload, &header, &secret));
        }

        #[test]
        fn tampered_payloads_fail(
            payload in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
        ) {
            let header = sign(&payload, b"secret");
            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 0x01;
            prop_assert!(!verify_signature(&tampered, &header, b"secret"));
        }
    }
}
