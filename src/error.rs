//! Error types for the identity model.

use thiserror::Error;

/// Errors raised while encoding, decoding or signing model types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// JSON or base64 input could not be decoded.
    #[error("failed to decode {what}: {reason}")]
    Decode {
        /// The kind of value being decoded
        what: &'static str,
        /// Description of the decoding error
        reason: String,
    },
    /// A value could not be serialized for signing or transport.
    #[error("failed to encode {what}: {reason}")]
    Encode {
        /// The kind of value being encoded
        what: &'static str,
        /// Description of the encoding error
        reason: String,
    },
    /// Key material is malformed.
    #[error("invalid key format: {reason}; expected 32 bytes of Ed25519 key material")]
    InvalidKey {
        /// Description of the key error
        reason: String,
    },
    /// A signing key does not belong to the certificate it signs for.
    #[error("signing key does not match the public key in certificate for '{entity}'")]
    KeyMismatch {
        /// Entity named by the certificate
        entity: String,
    },
}

impl ModelError {
    /// Creates a `Decode` error.
    #[must_use]
    pub fn decode(what: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    /// Creates an `Encode` error.
    #[must_use]
    pub fn encode(what: &'static str, reason: impl ToString) -> Self {
        Self::Encode {
            what,
            reason: reason.to_string(),
        }
    }

    /// Creates an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(reason: impl ToString) -> Self {
        Self::InvalidKey {
            reason: reason.to_string(),
        }
    }

    /// Returns true if this is a decoding error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Reasons a certificate or certificate signature fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    /// The authority signature on the certificate does not verify.
    #[error("certificate for '{entity}' is not signed by a trusted authority key")]
    UntrustedSignature {
        /// Entity named by the certificate
        entity: String,
    },
    /// The certificate validity window has not started.
    #[error("certificate for '{entity}' is not valid until {valid_after}")]
    NotYetValid {
        /// Entity named by the certificate
        entity: String,
        /// Start of the validity window, unix seconds
        valid_after: u64,
    },
    /// The certificate validity window has ended.
    #[error("certificate for '{entity}' expired at {valid_before}; request a new certificate")]
    Expired {
        /// Entity named by the certificate
        entity: String,
        /// End of the validity window, unix seconds
        valid_before: u64,
    },
    /// The certificate's own key did not sign the attached data.
    #[error("data signature does not verify with the key in certificate for '{entity}'")]
    DataSignature {
        /// Entity named by the certificate
        entity: String,
    },
    /// The certificate carries an unusable public key.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CertificateError {
    /// Returns true if only the validity window failed.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_value() {
        let err = ModelError::decode("certificate", "eof");
        assert_eq!(err.to_string(), "failed to decode certificate: eof");
        assert!(err.is_decode());

        let err = ModelError::encode("claim", "bad map key");
        assert!(err.to_string().contains("claim"));
        assert!(!err.is_decode());
    }

    #[test]
    fn key_errors_are_actionable() {
        let err = ModelError::invalid_key("wrong length 31");
        assert!(err.to_string().contains("32 bytes"));
    }
}
