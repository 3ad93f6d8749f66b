//! Ed25519 keys for signing and verifying certificates, requests and claims.

use ed25519_dalek::{
    Signature, Signer, SigningKey as DalekSigningKey, VerifyingKey as DalekVerifyingKey,
};

use crate::error::ModelError;

/// Length in bytes of an encoded public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length in bytes of a detached signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// A private key held by an entity or by the issuing authority.
///
/// # Example
///
/// ```
/// use wonka::SigningKey;
///
/// let key = SigningKey::generate();
/// let sig = key.sign(b"payload");
/// assert!(key.verifying_key().verify(b"payload", &sig));
/// ```
#[derive(Clone)]
pub struct SigningKey {
    inner: DalekSigningKey,
}

impl SigningKey {
    /// Creates a new random signing key.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            inner: DalekSigningKey::generate(&mut rng),
        }
    }

    /// Creates a signing key from its 32-byte seed.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: DalekSigningKey::from_bytes(bytes),
        }
    }

    /// Returns the 32-byte seed.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Returns the corresponding public key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Signs `data`, returning the detached 64-byte signature.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.inner.sign(data).to_bytes().to_vec()
    }

    /// Returns the underlying dalek key.
    #[must_use]
    pub fn as_dalek(&self) -> &DalekSigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.verifying_key())
            .finish_non_exhaustive()
    }
}

/// A public key that verifies signatures made by a [`SigningKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerifyingKey {
    inner: DalekVerifyingKey,
}

impl VerifyingKey {
    /// Creates a verifying key from its 32-byte encoding.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if the bytes are not a valid curve point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, ModelError> {
        DalekVerifyingKey::from_bytes(bytes)
            .map(|inner| Self { inner })
            .map_err(ModelError::invalid_key)
    }

    /// Creates a verifying key from a byte slice of any length.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if the slice is not exactly 32 bytes
    /// or is not a valid curve point.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let array: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| ModelError::invalid_key(format!("wrong length {}", bytes.len())))?;
        Self::from_bytes(&array)
    }

    /// Parses the lowercase hex form stored in an entity record.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if the text is not hex of a valid key.
    pub fn from_hex(text: &str) -> Result<Self, ModelError> {
        let bytes = hex::decode(text.trim()).map_err(ModelError::invalid_key)?;
        Self::from_slice(&bytes)
    }

    /// Returns the 32-byte encoding.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Returns the lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.to_bytes())
    }

    /// Returns true if `signature` is a valid signature of `data` by this key.
    ///
    /// Malformed signatures verify as false; this never panics.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.inner.verify_strict(data, &signature).is_ok()
    }

    /// Returns the underlying dalek key.
    #[must_use]
    pub fn as_dalek(&self) -> &DalekVerifyingKey {
        &self.inner
    }
}

impl From<DalekVerifyingKey> for VerifyingKey {
    fn from(inner: DalekVerifyingKey) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(
            f,
            "VerifyingKey({:02x}{:02x}{:02x}{:02x}...)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

/// Returns true if any key in `keys` verifies `signature` over `data`.
///
/// Used where more than one authority key is trusted at once, such as
/// during root key rotation.
#[must_use]
pub fn verify_any(keys: &[VerifyingKey], data: &[u8], signature: &[u8]) -> bool {
    keys.iter().any(|key| key.verify(data, signature))
}
