//! Sealing issued claims to the caller's Ed25519 key.
//!
//! The sender generates an ephemeral X25519 key, agrees a secret with the
//! recipient's Ed25519 key in Montgomery form, derives a ChaCha20-Poly1305
//! key with HKDF-SHA256 and encrypts. The sealed form is
//! `ephemeral_public (32) || nonce (12) || ciphertext`.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use curve25519_dalek::montgomery::MontgomeryPoint;
use hkdf::Hkdf;
use sha2::Sha256;
use wonka::{SigningKey, VerifyingKey};

use crate::error::{AuthError, TokenError};

const SALT: &[u8] = b"wonka-claim-seal-v2";
const POINT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

fn derive_key(
    shared: &MontgomeryPoint,
    ephemeral: &MontgomeryPoint,
    recipient: &MontgomeryPoint,
) -> Result<[u8; 32], hkdf::InvalidLength> {
    let mut info = [0u8; 2 * POINT_LEN];
    info[..POINT_LEN].copy_from_slice(ephemeral.as_bytes());
    info[POINT_LEN..].copy_from_slice(recipient.as_bytes());

    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(SALT), shared.as_bytes())
        .expand(&info, &mut key)?;
    Ok(key)
}

/// Encrypts `plaintext` so only the holder of `recipient`'s private key can
/// read it.
///
/// # Errors
///
/// Returns `AuthError::Signing` if key derivation or encryption fails.
pub fn seal(recipient: &VerifyingKey, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
    let recipient = recipient.as_dalek().to_montgomery();
    let secret: [u8; 32] = rand::random();
    let ephemeral = MontgomeryPoint::mul_base_clamped(secret);
    let shared = recipient.mul_clamped(secret);

    let key = derive_key(&shared, &ephemeral, &recipient).map_err(AuthError::signing)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(AuthError::signing)?;

    let mut sealed = Vec::with_capacity(POINT_LEN + NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(ephemeral.as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypts a sealed payload with the recipient's private key.
///
/// # Errors
///
/// Returns `TokenError::Open` if the payload is truncated, was sealed to
/// another key, or was modified.
pub fn open(recipient: &SigningKey, sealed: &[u8]) -> Result<Vec<u8>, TokenError> {
    if sealed.len() < POINT_LEN + NONCE_LEN {
        return Err(TokenError::Open {
            reason: format!("sealed payload is only {} bytes", sealed.len()),
        });
    }
    let (point, rest) = sealed.split_at(POINT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let mut ephemeral = [0u8; POINT_LEN];
    ephemeral.copy_from_slice(point);
    let ephemeral = MontgomeryPoint(ephemeral);

    let scalar = recipient.as_dalek().to_scalar_bytes();
    let shared = ephemeral.mul_clamped(scalar);
    let own = recipient.verifying_key().as_dalek().to_montgomery();

    let key = derive_key(&shared, &ephemeral, &own).map_err(|e| TokenError::Open {
        reason: e.to_string(),
    })?;
    ChaCha20Poly1305::new(Key::from_slice(&key))
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| TokenError::Open {
            reason: "authentication tag mismatch".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_can_open() {
        let recipient = SigningKey::generate();
        let sealed = seal(&recipient.verifying_key(), b"claim body").unwrap();

        assert_eq!(open(&recipient, &sealed).unwrap(), b"claim body");
    }

    #[test]
    fn other_keys_cannot_open() {
        let recipient = SigningKey::generate();
        let sealed = seal(&recipient.verifying_key(), b"claim body").unwrap();

        assert!(open(&SigningKey::generate(), &sealed).is_err());
    }

    #[test]
    fn tampering_is_detected() {
        let recipient = SigningKey::generate();
        let mut sealed = seal(&recipient.verifying_key(), b"claim body").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(matches!(open(&recipient, &sealed), Err(TokenError::Open { .. })));
    }

    #[test]
    fn each_seal_is_fresh() {
        let recipient = SigningKey::generate().verifying_key();
        assert_ne!(seal(&recipient, b"x").unwrap(), seal(&recipient, b"x").unwrap());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert!(open(&SigningKey::generate(), &[0u8; 20]).is_err());
    }
}
