//! Claim requests, issued claims and the response envelopes around them.

use serde::{Deserialize, Serialize};

use crate::certificate::Certificate;
use crate::constants::{
    CLAIM_TYPE, ED25519_SIGTYPE, SIGN_EVERYTHING_VERSION, SSH_ED25519_SIGTYPE,
};
use crate::encoding::{base64_bytes, from_base64, to_base64};
use crate::error::ModelError;
use crate::keys::{SigningKey, VerifyingKey, verify_any};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A caller's request for a set of claims against a destination.
///
/// # Example
///
/// ```
/// use wonka::{ClaimRequest, SigningKey};
///
/// let key = SigningKey::generate();
/// let mut req = ClaimRequest::new("svc-a", "EVERYONE,svc-a", "svc-b", 1_000, 2_000);
/// req.sign(&key).unwrap();
///
/// let sig = req.entity_signature_bytes().unwrap();
/// assert!(key.verifying_key().verify(&req.signing_bytes().unwrap(), &sig));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Request format version; [`SIGN_EVERYTHING_VERSION`] signs the JSON body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Claimed caller identity.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_name: String,
    /// Entity an allow-listed caller acts on behalf of.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub impersonated_entity: String,
    /// Comma-separated requested capabilities.
    #[serde(rename = "claim_request", default, skip_serializing_if = "String::is_empty")]
    pub claim: String,
    /// Create time, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ctime: i64,
    /// Requested expire time, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub etime: i64,
    /// Entity the claim will be presented to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination: String,
    /// Base64 signature by the caller's key.
    #[serde(rename = "entity_signature", default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    /// Signature algorithm label.
    #[serde(rename = "entity_sigtype", default, skip_serializing_if = "String::is_empty")]
    pub sig_type: String,
    /// Hex session key used with SSH authentication.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_pubkey: String,
    /// OpenSSH text of the caller's SSH certificate.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ussh_certificate: String,
    /// Base64 signature by the SSH certificate's key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ussh_signature: String,
    /// SSH signature algorithm label.
    #[serde(rename = "ussh_sigtype", default, skip_serializing_if = "String::is_empty")]
    pub ussh_signature_type: String,
    /// JSON of the caller's certificate.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<u8>,
}

impl ClaimRequest {
    /// Creates an unsigned request in the current format.
    #[must_use]
    pub fn new(
        entity_name: impl Into<String>,
        claim: impl Into<String>,
        destination: impl Into<String>,
        ctime: i64,
        etime: i64,
    ) -> Self {
        Self {
            version: SIGN_EVERYTHING_VERSION.to_string(),
            entity_name: entity_name.into(),
            claim: claim.into(),
            destination: destination.into(),
            ctime,
            etime,
            ..Self::default()
        }
    }

    /// Attaches the caller's certificate.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if the certificate cannot be serialized.
    pub fn with_certificate(mut self, certificate: &Certificate) -> Result<Self, ModelError> {
        self.certificate = certificate.to_bytes()?;
        Ok(self)
    }

    /// Returns the bytes the caller's entity signature covers.
    ///
    /// Current-format requests sign the JSON body with every signature and
    /// SSH field cleared; older requests sign
    /// `entity<ctime|etime>claim|destination`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        if self.version != SIGN_EVERYTHING_VERSION {
            return Ok(format!(
                "{}<{}|{}>{}|{}",
                self.entity_name, self.ctime, self.etime, self.claim, self.destination
            )
            .into_bytes());
        }
        let mut unsigned = self.ussh_unsigned();
        unsigned.signature.clear();
        unsigned.session_pubkey.clear();
        unsigned.ussh_certificate.clear();
        serde_json::to_vec(&unsigned).map_err(|e| ModelError::encode("claim request", e))
    }

    fn ussh_unsigned(&self) -> Self {
        let mut unsigned = self.clone();
        unsigned.ussh_signature.clear();
        unsigned.ussh_signature_type.clear();
        unsigned
    }

    /// Returns the bytes the SSH signature covers: everything except the
    /// SSH signature fields.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn ussh_signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(&self.ussh_unsigned())
            .map_err(|e| ModelError::encode("claim request", e))
    }

    /// Signs with the caller's key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign(&mut self, key: &SigningKey) -> Result<(), ModelError> {
        let bytes = self.signing_bytes()?;
        self.signature = to_base64(&key.sign(&bytes));
        self.sig_type = ED25519_SIGTYPE.to_string();
        Ok(())
    }

    /// Signs for SSH authentication: the session key signs the request
    /// body and the SSH certificate's key signs the result.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign_ussh(
        &mut self,
        ussh_certificate: &str,
        ssh_key: &SigningKey,
        session_key: &SigningKey,
    ) -> Result<(), ModelError> {
        self.session_pubkey = session_key.verifying_key().to_hex();
        self.ussh_certificate = ussh_certificate.to_string();
        self.sign(session_key)?;

        let bytes = self.ussh_signing_bytes()?;
        self.ussh_signature = to_base64(&ssh_key.sign(&bytes));
        self.ussh_signature_type = SSH_ED25519_SIGTYPE.to_string();
        Ok(())
    }

    /// Decodes the entity signature.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if it is not base64.
    pub fn entity_signature_bytes(&self) -> Result<Vec<u8>, ModelError> {
        from_base64(&self.signature).map_err(|e| ModelError::decode("entity signature", e))
    }

    /// Decodes the SSH signature.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if it is not base64.
    pub fn ussh_signature_bytes(&self) -> Result<Vec<u8>, ModelError> {
        from_base64(&self.ussh_signature).map_err(|e| ModelError::decode("ssh signature", e))
    }

    /// Parses the session key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if it is missing or malformed.
    pub fn session_key(&self) -> Result<VerifyingKey, ModelError> {
        VerifyingKey::from_hex(&self.session_pubkey)
    }

    /// Parses the attached certificate.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if it is not a certificate.
    pub fn certificate(&self) -> Result<Certificate, ModelError> {
        Certificate::from_bytes(&self.certificate)
    }
}

/// An issued claim: the capabilities granted to an entity for a destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Claim {
    /// Always [`CLAIM_TYPE`].
    #[serde(rename = "ct")]
    pub claim_type: String,
    /// Start of validity, unix seconds.
    #[serde(rename = "va")]
    pub valid_after: i64,
    /// End of validity, unix seconds.
    #[serde(rename = "vb")]
    pub valid_before: i64,
    /// Holder of the claim.
    #[serde(rename = "e")]
    pub entity_name: String,
    /// Granted capabilities.
    #[serde(rename = "c")]
    pub claims: Vec<String>,
    /// Entity the claim is for.
    #[serde(rename = "d")]
    pub destination: String,
    /// Authority signature with this field cleared.
    #[serde(rename = "s", with = "base64_bytes", default)]
    pub signature: Vec<u8>,
}

impl Claim {
    /// Creates an unsigned claim from a comma-joined grant.
    #[must_use]
    pub fn new(
        entity_name: impl Into<String>,
        granted: &str,
        destination: impl Into<String>,
        valid_after: i64,
        valid_before: i64,
    ) -> Self {
        Self {
            claim_type: CLAIM_TYPE.to_string(),
            valid_after,
            valid_before,
            entity_name: entity_name.into(),
            claims: granted.split(',').map(str::to_string).collect(),
            destination: destination.into(),
            signature: Vec::new(),
        }
    }

    /// Returns the signed bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        unsigned.to_json()
    }

    /// Signs in place with the authority key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign(&mut self, key: &SigningKey) -> Result<(), ModelError> {
        let bytes = self.signing_bytes()?;
        self.signature = key.sign(&bytes);
        Ok(())
    }

    /// Returns true if any of `roots` signed this claim.
    #[must_use]
    pub fn verify(&self, roots: &[VerifyingKey]) -> bool {
        self.signing_bytes()
            .is_ok_and(|bytes| verify_any(roots, &bytes, &self.signature))
    }

    /// Returns true if `capability` was granted (case-insensitive).
    #[must_use]
    pub fn grants(&self, capability: &str) -> bool {
        self.claims.iter().any(|c| c.eq_ignore_ascii_case(capability))
    }

    /// Serializes to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|e| ModelError::encode("claim", e))
    }

    /// Parses JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Decode` if the bytes are not a claim.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(|e| ModelError::decode("claim", e))
    }
}

/// Response to a claim or resolve request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Result code.
    pub result: String,
    /// Opaque token; empty on failure.
    #[serde(rename = "claim_token")]
    pub token: String,
}

/// Response carrying only a result code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenericResponse {
    /// Result code.
    pub result: String,
}

/// A third party's request for claims towards a destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Caller identity.
    pub entity_name: String,
    /// Destination whose `requires` list is folded into the request.
    pub requested_entity: String,
    /// Extra comma-separated capabilities.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub claims: String,
    /// JSON of the caller's certificate.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<u8>,
    /// Hex session key the token is sealed to on the SSH path.
    #[serde(rename = "publickey", default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
    /// Requested expire time; zero means the default lifetime.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub etime: i64,
    /// SSH signature algorithm label.
    #[serde(rename = "ussh_sigtype", default, skip_serializing_if = "String::is_empty")]
    pub ussh_signature_type: String,
    /// OpenSSH text of the caller's SSH certificate.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub ussh_certificate: Vec<u8>,
    /// Signature with `signature` and `ussh_sigtype` cleared.
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

impl ResolveRequest {
    /// Creates an unsigned resolve request.
    #[must_use]
    pub fn new(entity_name: impl Into<String>, requested_entity: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            requested_entity: requested_entity.into(),
            ..Self::default()
        }
    }

    /// Returns the signed bytes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut unsigned = self.clone();
        unsigned.signature.clear();
        unsigned.ussh_signature_type.clear();
        serde_json::to_vec(&unsigned).map_err(|e| ModelError::encode("resolve request", e))
    }

    /// Signs with the caller's enrolled or certificate key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign(&mut self, key: &SigningKey) -> Result<(), ModelError> {
        let bytes = self.signing_bytes()?;
        self.signature = key.sign(&bytes);
        Ok(())
    }

    /// Signs with an SSH certificate's key, naming the session key the
    /// token should be sealed to.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Encode` if serialization fails.
    pub fn sign_ussh(
        &mut self,
        ussh_certificate: &str,
        ssh_key: &SigningKey,
        session_key: &VerifyingKey,
    ) -> Result<(), ModelError> {
        self.ussh_certificate = ussh_certificate.as_bytes().to_vec();
        self.public_key = session_key.to_hex();
        self.sign(ssh_key)?;
        self.ussh_signature_type = SSH_ED25519_SIGTYPE.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_signing_string() {
        let mut req = ClaimRequest::new("svc-a", "EVERYONE", "svc-b", 10, 20);
        req.version = "1.0.0".into();
        assert_eq!(req.signing_bytes().unwrap(), b"svc-a<10|20>EVERYONE|svc-b");
    }

    #[test]
    fn current_signing_ignores_transport_fields() {
        let key = SigningKey::generate();
        let mut req = ClaimRequest::new("svc-a", "EVERYONE", "svc-b", 10, 20);
        req.sign(&key).unwrap();

        let before = req.signing_bytes().unwrap();
        req.session_pubkey = "ab".into();
        req.ussh_signature = "cd".into();
        assert_eq!(req.signing_bytes().unwrap(), before);

        req.claim = "EVERYONE,AD:ops".into();
        assert_ne!(req.signing_bytes().unwrap(), before);
    }

    #[test]
    fn ussh_signature_covers_entity_signature() {
        let ssh = SigningKey::generate();
        let session = SigningKey::generate();
        let mut req = ClaimRequest::new("alice@uber.com", "EVERYONE", "", 10, 20);
        req.sign_ussh("cert-text", &ssh, &session).unwrap();

        let inner = req.entity_signature_bytes().unwrap();
        assert!(session.verifying_key().verify(&req.signing_bytes().unwrap(), &inner));

        let outer = req.ussh_signature_bytes().unwrap();
        assert!(ssh.verifying_key().verify(&req.ussh_signing_bytes().unwrap(), &outer));

        req.signature = to_base64(&[0u8; 64]);
        assert!(!ssh.verifying_key().verify(&req.ussh_signing_bytes().unwrap(), &outer));
    }

    #[test]
    fn claim_json_uses_short_names() {
        let claim = Claim::new("svc-a", "EVERYONE,svc-a", "svc-b", 1, 2);
        let json = serde_json::to_value(&claim).unwrap();

        assert_eq!(json["ct"], CLAIM_TYPE);
        assert_eq!(json["c"][1], "svc-a");
        assert_eq!(json["d"], "svc-b");
        assert!(claim.grants("everyone"));
    }

    #[test]
    fn claim_signature_roundtrip() {
        let authority = SigningKey::generate();
        let mut claim = Claim::new("svc-a", "EVERYONE,svc-a", "svc-b", 1, 2);
        claim.sign(&authority).unwrap();

        let parsed = Claim::from_json(&claim.to_json().unwrap()).unwrap();
        assert!(parsed.verify(&[authority.verifying_key()]));

        let mut forged = parsed;
        forged.claims.push("AD:admins".into());
        assert!(!forged.verify(&[authority.verifying_key()]));
    }

    #[test]
    fn resolve_signature_ignores_sigtype() {
        let key = SigningKey::generate();
        let session = SigningKey::generate().verifying_key();
        let mut req = ResolveRequest::new("alice@uber.com", "svc-b");
        req.sign_ussh("cert-text", &key, &session).unwrap();

        assert!(key.verifying_key().verify(&req.signing_bytes().unwrap(), &req.signature));
        assert_eq!(req.public_key, session.to_hex());
    }
}
