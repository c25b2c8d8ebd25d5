//! Login challenge codec.
//!
//! A browser login binds the polled token to the CLI session through an RSA
//! public key handed to the login page.  The key travels as a base64
//! encoded JSON document whose modulus is a bare decimal number:
//!
//! ```text
//! base64( {"N": 2519...8821, "E": 65537} )
//! ```
//!
//! Once the operator has logged in, the server seals the token with that key
//! (RSA-OAEP, SHA-256) and publishes it base64-encoded.  Only the holder of
//! the private key can open it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use serde::Deserialize;
use serde_json::value::RawValue;
use sha2::Sha256;

use crate::error::ModelError;

/// Characters a login request id is drawn from (no look-alike characters).
pub const REQUEST_ID_ALPHABET: &[u8] = b"abcdfghjklmnpqrstvwxz12456789";

/// Length of a login request id.
pub const REQUEST_ID_LEN: usize = 32;

/// `responseType` marker sent to the login page.
pub const RESPONSE_TYPE: &str = "json";

#[derive(Deserialize)]
struct PublicKeyDocument {
    #[serde(rename = "N")]
    n: Box<RawValue>,
    #[serde(rename = "E")]
    e: u64,
}

/// Encode a public key as the base64 JSON document the login page expects.
pub fn encode_public_key(key: &RsaPublicKey) -> String {
    let document = format!(r#"{{"N":{},"E":{}}}"#, key.n(), key.e());
    STANDARD.encode(document)
}

/// Decode a public key produced by [`encode_public_key`].
pub fn decode_public_key(encoded: &str) -> Result<RsaPublicKey, ModelError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ModelError::public_key(format!("not base64: {e}")))?;
    let document: PublicKeyDocument = serde_json::from_slice(&bytes)
        .map_err(|e| ModelError::public_key(format!("not a key document: {e}")))?;
    let n = BigUint::parse_bytes(document.n.get().as_bytes(), 10)
        .ok_or_else(|| ModelError::public_key("modulus is not a decimal integer"))?;
    RsaPublicKey::new(n, BigUint::from(document.e)).map_err(|e| ModelError::public_key(e.to_string()))
}

/// Seal `plaintext` for the holder of `key`'s private half.
pub fn seal_token(key: &RsaPublicKey, plaintext: &str) -> Result<String, ModelError> {
    let mut rng = rand::thread_rng();
    let sealed = key
        .encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| ModelError::sealed_token(e.to_string()))?;
    Ok(STANDARD.encode(sealed))
}

/// Open a token produced by [`seal_token`].
pub fn open_token(key: &RsaPrivateKey, sealed: &str) -> Result<String, ModelError> {
    let ciphertext = STANDARD
        .decode(sealed)
        .map_err(|e| ModelError::sealed_token(format!("not base64: {e}")))?;
    let plaintext = key
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|e| ModelError::sealed_token(e.to_string()))?;
    String::from_utf8(plaintext).map_err(|e| ModelError::sealed_token(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    #[test]
    fn public_key_document_shape() {
        let key = test_key();
        let encoded = encode_public_key(&key.to_public_key());
        let json = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();

        assert!(json.starts_with(r#"{"N":"#));
        assert!(json.ends_with(r#","E":65537}"#));
        // Modulus is a bare number, not a quoted string.
        assert!(!json.contains(r#""N":""#));
    }

    #[test]
    fn decode_recovers_encoded_key() {
        let key = test_key().to_public_key();
        let decoded = decode_public_key(&encode_public_key(&key)).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_public_key("%%%"),
            Err(ModelError::InvalidPublicKey { .. })
        ));
        let quoted = STANDARD.encode(r#"{"N":"123","E":65537}"#);
        assert!(decode_public_key(&quoted).is_err());
    }

    #[test]
    fn sealed_token_opens_with_matching_key() {
        let key = test_key();
        let sealed = seal_token(&key.to_public_key(), "token-abc12:s3cret").unwrap();
        assert_ne!(sealed, "token-abc12:s3cret");
        assert_eq!(open_token(&key, &sealed).unwrap(), "token-abc12:s3cret");
    }

    #[test]
    fn sealed_token_does_not_open_with_other_key() {
        let sealed = seal_token(&test_key().to_public_key(), "token-abc12:s3cret").unwrap();
        assert!(open_token(&test_key(), &sealed).is_err());
    }

    #[test]
    fn alphabet_has_no_lookalikes() {
        for c in [b'0', b'o', b'3', b'i', b'e', b'u', b'y'] {
            assert!(!REQUEST_ID_ALPHABET.contains(&c), "unexpected {}", c as char);
        }
        assert_eq!(REQUEST_ID_ALPHABET.len(), 29);
    }
}
