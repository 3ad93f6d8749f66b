//! Short-lived identity certificates and the signatures they make.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{TAG_LAUNCH_REQUEST, TAG_USSH_CERT};
use crate::encoding::{base64_bytes, from_base64, to_base64};
use crate::entity::EntityType;
use crate::error::{CertificateError, ModelError};
use crate::keys::{SigningKey, VerifyingKey, verify_any};

/// A signed identity assertion.
///
/// The authority signs the JSON form of the certificate with `signature`
/// cleared. Tags are kept in a sorted map so the signed form is canonical.
///
/// # Example
///
/// ```
/// use wonka::{Certificate, EntityType, SigningKey};
///
/// let authority = SigningKey::generate();
/// let holder = SigningKey::generate();
///
/// let mut cert = Certificate::new(
///     "svc-a", EntityType::Service, "h1", &holder.verifying_key(), 1_000, 2_000,
/// );
/// cert.sign(&authority).unwrap();
///
/// assert!(cert.check(&[authority.verifying_key()], 1_500, 60).is_ok());
/// assert!(cert.check(&[authority.verifying_key()], 9_000, 60).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Certificate {
    /// Name of the service, person or host.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_name: String,
    /// Kind of entity.
    #[serde(default, skip_serializing_if = "EntityType::is_invalid")]
    pub entity_type: EntityType,
    /// Machine the entity runs on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Holder's 32-byte public key.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<u8>,
    /// Random serial for tracking.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub serial: u64,
    /// Start of validity, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub valid_after: u64,
    /// End of validity, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub valid_before: u64,
    /// Free-form metadata. Some keys are reserved, see [`crate::constants`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Signature over every other field.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Converts a unix timestamp carried as `u64` to the signed form used by clocks.
#[must_use]
pub fn unix_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Certificate {
    /// Creates an unsigned certificate with a random serial.
    #[must_use]
    pub fn new(
        entity_name: impl Into<String>,
        entity_type: EntityType,
        host: impl Into<String>,
        key: &VerifyingKey,
        valid_after: u64,
        valid_before: u64,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_type,
            host: host.into(),
            key: key.to_bytes().to_vec(),
            serial: rand::random::<u64>() >> 1,
            valid_after,
            valid_before,
            tags: BTreeMap::new(),
            signature: Vec::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Serializes to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|e| ModelError::encode("certificate", e))
    }

    /// Parses JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the bytes are not a certificate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(|e| ModelError::decode("certificate", e))
    }

    /// Returns the bytes the authority signs: the JSON form with no signature.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        unsigned.to_bytes()
    }

    /// Signs the certificate in place.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign(&mut self, signer: &SigningKey) -> Result<(), ModelError> {
        let bytes = self.signing_bytes()?;
        self.signature = signer.sign(&bytes);
        Ok(())
    }

    /// Returns the holder's public key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if the key field is malformed.
    pub fn public_key(&self) -> Result<VerifyingKey, ModelError> {
        VerifyingKey::from_slice(&self.key)
    }

    /// Returns true if the holder's key verifies `signature` over `data`.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        self.public_key()
            .is_ok_and(|key| key.verify(data, signature))
    }

    /// Returns true if the validity window ended before `now`.
    #[must_use]
    pub fn expired(&self, now: i64) -> bool {
        now > unix_i64(self.valid_before)
    }

    /// Returns true if the validity window starts after `now`.
    #[must_use]
    pub fn not_yet_valid(&self, now: i64) -> bool {
        now < unix_i64(self.valid_after)
    }

    /// Checks the authority signature against any of `roots`.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::UntrustedSignature` if no root verifies it.
    pub fn validate_signature(&self, roots: &[VerifyingKey]) -> Result<(), CertificateError> {
        let bytes = self.signing_bytes()?;
        if verify_any(roots, &bytes, &self.signature) {
            Ok(())
        } else {
            Err(CertificateError::UntrustedSignature {
                entity: self.entity_name.clone(),
            })
        }
    }

    /// Checks that `now` lies in `[valid_after - skew, valid_before + skew]`.
    ///
    /// # Errors
    ///
    /// Returns `NotYetValid` or `Expired`.
    pub fn check_window(&self, now: i64, skew: i64) -> Result<(), CertificateError> {
        if self.not_yet_valid(now.saturating_add(skew)) {
            return Err(CertificateError::NotYetValid {
                entity: self.entity_name.clone(),
                valid_after: self.valid_after,
            });
        }
        if self.expired(now.saturating_sub(skew)) {
            return Err(CertificateError::Expired {
                entity: self.entity_name.clone(),
                valid_before: self.valid_before,
            });
        }
        Ok(())
    }

    /// Full validation: trusted signature, then validity window.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CertificateError`].
    pub fn check(
        &self,
        roots: &[VerifyingKey],
        now: i64,
        skew: i64,
    ) -> Result<(), CertificateError> {
        self.validate_signature(roots)?;
        self.check_window(now, skew)
    }

    /// Returns true if the certificate may vouch for other certificates:
    /// it carries both an SSH host certificate and a launch request.
    #[must_use]
    pub fn is_cert_granting(&self) -> bool {
        self.tags.contains_key(TAG_USSH_CERT) && self.tags.contains_key(TAG_LAUNCH_REQUEST)
    }

    /// Returns the embedded SSH host certificate text, if tagged.
    #[must_use]
    pub fn ussh_certificate_tag(&self) -> Option<&str> {
        self.tags.get(TAG_USSH_CERT).map(String::as_str)
    }

    /// Returns the embedded base64 launch request, if tagged.
    #[must_use]
    pub fn launch_request_tag(&self) -> Option<&str> {
        self.tags.get(TAG_LAUNCH_REQUEST).map(String::as_str)
    }
}

/// Data signed by the holder of a certificate, carrying the certificate.
///
/// Verifying one checks the holder's signature over the data and then the
/// certificate itself against the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSignature {
    /// The signer's certificate.
    pub certificate: Certificate,
    /// When the signature was made, unix seconds.
    pub timestamp: i64,
    /// The signed payload.
    #[serde(with = "base64_bytes", default)]
    pub data: Vec<u8>,
    /// Holder signature over this struct with `signature` cleared.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

impl CertificateSignature {
    /// Signs `data` with the key belonging to `certificate`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::KeyMismatch` if `key` is not the certificate's key.
    pub fn new(
        certificate: Certificate,
        key: &SigningKey,
        data: Vec<u8>,
        timestamp: i64,
    ) -> Result<Self, ModelError> {
        if certificate.public_key()? != key.verifying_key() {
            return Err(ModelError::KeyMismatch {
                entity: certificate.entity_name,
            });
        }

        let mut signed = Self {
            certificate,
            timestamp,
            data,
            signature: Vec::new(),
        };
        let bytes = signed.signing_bytes()?;
        signed.signature = key.sign(&bytes);
        Ok(signed)
    }

    fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        serde_json::to_vec(&unsigned).map_err(|e| ModelError::encode("certificate signature", e))
    }

    /// Checks the holder's signature over the data.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::DataSignature` if it does not verify.
    pub fn verify_data(&self) -> Result<(), CertificateError> {
        let bytes = self.signing_bytes()?;
        if self.certificate.verify(&bytes, &self.signature) {
            Ok(())
        } else {
            Err(CertificateError::DataSignature {
                entity: self.certificate.entity_name.clone(),
            })
        }
    }

    /// Checks the data signature, then the embedded certificate.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CertificateError`].
    pub fn verify(
        &self,
        roots: &[VerifyingKey],
        now: i64,
        skew: i64,
    ) -> Result<(), CertificateError> {
        self.verify_data()?;
        self.certificate.check(roots, now, skew)
    }

    /// Encodes as base64 of the JSON form, as carried in a certificate tag.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, ModelError> {
        let bytes = self.to_json()?;
        Ok(to_base64(&bytes))
    }

    /// Serializes to JSON bytes, as carried in a CSR `launch_request` field.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|e| ModelError::encode("certificate signature", e))
    }

    /// Decodes the base64 tag form.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` for bad base64 or JSON.
    pub fn decode(text: &str) -> Result<Self, ModelError> {
        let bytes = from_base64(text).map_err(|e| ModelError::decode("launch request", e))?;
        Self::from_json(&bytes)
    }

    /// Parses the JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the bytes are not a certificate signature.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(|e| ModelError::decode("certificate signature", e))
    }

    /// Parses the signed data as a launch request.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the data is not a launch request.
    pub fn launch_request(&self) -> Result<LaunchRequest, ModelError> {
        serde_json::from_slice(&self.data).map_err(|e| ModelError::decode("launch request", e))
    }
}

/// Provenance record binding a service launch to a host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Host the task was launched on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    /// Service being launched.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub svc_id: String,
    /// Scheduler task id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_id: String,
    /// Launch time, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub timestamp: i64,
    /// Container instance id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub inst_id: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

impl LaunchRequest {
    /// Creates a launch request for a service on a host.
    #[must_use]
    pub fn new(hostname: impl Into<String>, svc_id: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            svc_id: svc_id.into(),
            ..Self::default()
        }
    }

    /// Signs this launch request with a launcher's certificate and key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if encoding fails or the key does not match.
    pub fn sign(
        &self,
        launcher: Certificate,
        key: &SigningKey,
        timestamp: i64,
    ) -> Result<CertificateSignature, ModelError> {
        let data =
            serde_json::to_vec(self).map_err(|e| ModelError::encode("launch request", e))?;
        CertificateSignature::new(launcher, key, data, timestamp)
    }
}
