//! Certificate signing requests.

use serde::{Deserialize, Serialize};

use crate::certificate::{Certificate, CertificateSignature};
use crate::constants::{ED25519_SIGTYPE, SSH_ED25519_SIGTYPE};
use crate::encoding::base64_bytes;
use crate::error::ModelError;
use crate::keys::SigningKey;

/// A request to have a certificate signed by the authority.
///
/// Exactly one authorization path is used, chosen by which optional fields
/// are present: `signing_certificate`, then `ussh_certificate`, then the
/// pre-enrolled key of the named entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertificateSigningRequest {
    /// JSON of the certificate to sign.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<u8>,
    /// JSON of a [`CertificateSignature`] carrying a launch request.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub launch_request: Vec<u8>,
    /// JSON of an already-valid certificate authorizing this request.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub signing_certificate: Vec<u8>,
    /// OpenSSH text of an SSH certificate authorizing this request.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub ussh_certificate: Vec<u8>,
    /// Signature over the request with `signature`, `signature_type` and
    /// `result` cleared.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
    /// Signature algorithm label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature_type: String,
    /// Result code, set on responses.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
}

impl CertificateSigningRequest {
    fn unsigned(certificate: &Certificate) -> Result<Self, ModelError> {
        Ok(Self {
            certificate: certificate.to_bytes()?,
            ..Self::default()
        })
    }

    /// Returns the bytes every authorization path signs.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        unsigned.signature_type.clear();
        unsigned.result.clear();
        serde_json::to_vec(&unsigned).map_err(|e| ModelError::encode("csr", e))
    }

    fn signed_by(mut self, key: &SigningKey, sig_type: &str) -> Result<Self, ModelError> {
        let bytes = self.signing_bytes()?;
        self.signature = key.sign(&bytes);
        self.signature_type = sig_type.to_string();
        Ok(self)
    }

    /// Builds a request authorized by an existing certificate and its key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign_with_certificate(
        certificate: &Certificate,
        signing_certificate: &Certificate,
        key: &SigningKey,
    ) -> Result<Self, ModelError> {
        let mut csr = Self::unsigned(certificate)?;
        csr.signing_certificate = signing_certificate.to_bytes()?;
        csr.signed_by(key, ED25519_SIGTYPE)
    }

    /// Builds a request authorized by the entity's pre-enrolled key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign_with_enrolled_key(
        certificate: &Certificate,
        key: &SigningKey,
    ) -> Result<Self, ModelError> {
        Self::unsigned(certificate)?.signed_by(key, ED25519_SIGTYPE)
    }

    /// Builds a request authorized by an SSH certificate, signed with the
    /// SSH certificate's private key. A launch request may ride along.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign_with_ssh(
        certificate: &Certificate,
        ussh_certificate: &str,
        ssh_key: &SigningKey,
        launch_request: Option<&CertificateSignature>,
    ) -> Result<Self, ModelError> {
        let mut csr = Self::unsigned(certificate)?;
        csr.ussh_certificate = ussh_certificate.as_bytes().to_vec();
        if let Some(launch) = launch_request {
            csr.launch_request = launch.to_json()?;
        }
        csr.signed_by(ssh_key, SSH_ED25519_SIGTYPE)
    }

    /// Parses the certificate to sign.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the field is not a certificate.
    pub fn certificate_to_sign(&self) -> Result<Certificate, ModelError> {
        Certificate::from_bytes(&self.certificate)
    }

    /// Parses the signing certificate, if present.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the field is present but malformed.
    pub fn signing_certificate(&self) -> Result<Option<Certificate>, ModelError> {
        if self.signing_certificate.is_empty() {
            return Ok(None);
        }
        Certificate::from_bytes(&self.signing_certificate).map(Some)
    }

    /// Returns the SSH certificate text, if present.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the field is not UTF-8.
    pub fn ussh_certificate(&self) -> Result<Option<&str>, ModelError> {
        if self.ussh_certificate.is_empty() {
            return Ok(None);
        }
        std::str::from_utf8(&self.ussh_certificate)
            .map(Some)
            .map_err(|e| ModelError::decode("ssh certificate", e))
    }

    /// Parses the attached launch request, if present.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the field is present but malformed.
    pub fn launch_request(&self) -> Result<Option<CertificateSignature>, ModelError> {
        if self.launch_request.is_empty() {
            return Ok(None);
        }
        CertificateSignature::from_json(&self.launch_request).map(Some)
    }
}
