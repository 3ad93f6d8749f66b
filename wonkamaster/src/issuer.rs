//! Signing of issued certificates and claim tokens.

use chrono::DateTime;
use rusty_paseto::prelude::*;
use tracing::debug;
use wonka::{Certificate, Claim, SigningKey, VerifyingKey, to_base64};

use crate::error::AuthError;
use crate::seal::seal;

/// Issuer name carried in v1 tokens.
pub const TOKEN_ISSUER: &str = "wonkamaster";

/// Wire format of an issued claim token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClaimProtocol {
    /// PASETO v4.public: signed, readable by anyone.
    V1,
    /// The signed claim JSON sealed to the caller's key, base64.
    #[default]
    V2,
}

impl ClaimProtocol {
    /// Selects the protocol from a request path such as `/claim/v1`.
    /// Anything other than a `v1` suffix is the current protocol.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path.trim_end_matches('/').to_ascii_lowercase().ends_with("/v1") {
            Self::V1
        } else {
            Self::V2
        }
    }
}

fn paseto_time(secs: i64, what: &str) -> Result<String, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .ok_or_else(|| AuthError::signing(format!("{what} {secs} is out of range")))
}

/// Signs certificates and claims with the authority key.
///
/// ```
/// use wonka::{Claim, SigningKey};
/// use wonkamaster::{ClaimProtocol, Issuer};
///
/// let authority = SigningKey::generate();
/// let issuer = Issuer::new(authority);
///
/// let now = chrono::Utc::now().timestamp();
/// let claim = Claim::new("svc-a", "EVERYONE,svc-a", "svc-b", now, now + 60);
/// let token = issuer
///     .issue(claim, ClaimProtocol::V1, &SigningKey::generate().verifying_key())
///     .unwrap();
/// assert!(token.starts_with("v4.public."));
/// ```
#[derive(Debug, Clone)]
pub struct Issuer {
    authority: SigningKey,
}

impl Issuer {
    /// Creates an issuer for the authority key.
    #[must_use]
    pub const fn new(authority: SigningKey) -> Self {
        Self { authority }
    }

    /// Returns the authority's public key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.authority.verifying_key()
    }

    /// Signs a certificate, clearing any signature it carried.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedCsr` if the certificate cannot be
    /// serialized.
    pub fn sign_certificate(&self, mut certificate: Certificate) -> Result<Certificate, AuthError> {
        certificate.signature.clear();
        certificate
            .sign(&self.authority)
            .map_err(|e| AuthError::MalformedCsr {
                reason: e.to_string(),
            })?;
        debug!(
            entity = %certificate.entity_name,
            host = %certificate.host,
            serial = certificate.serial,
            valid_before = certificate.valid_before,
            "certificate signed"
        );
        Ok(certificate)
    }

    /// Signs a claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the claim cannot be serialized.
    pub fn sign_claim(&self, mut claim: Claim) -> Result<Claim, AuthError> {
        claim.sign(&self.authority).map_err(AuthError::signing)?;
        Ok(claim)
    }

    /// Issues a claim token in the given protocol. `recipient` is the
    /// caller's key; only v2 tokens use it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if signing or sealing fails.
    pub fn issue(
        &self,
        claim: Claim,
        protocol: ClaimProtocol,
        recipient: &VerifyingKey,
    ) -> Result<String, AuthError> {
        match protocol {
            ClaimProtocol::V1 => self.issue_paseto(&claim),
            ClaimProtocol::V2 => self.issue_sealed(claim, recipient),
        }
    }

    fn issue_sealed(&self, claim: Claim, recipient: &VerifyingKey) -> Result<String, AuthError> {
        let signed = self.sign_claim(claim)?;
        let json = signed.to_json().map_err(AuthError::signing)?;
        Ok(to_base64(&seal(recipient, &json)?))
    }

    fn issue_paseto(&self, claim: &Claim) -> Result<String, AuthError> {
        let key_bytes = self.authority.as_dalek().to_keypair_bytes();
        let key_wrapper = Key::<64>::from(&key_bytes);
        let paseto_key = PasetoAsymmetricPrivateKey::<V4, Public>::from(&key_wrapper);

        let exp = paseto_time(claim.valid_before, "valid_before")?;
        let iat = paseto_time(claim.valid_after, "valid_after")?;
        let exp_claim = ExpirationClaim::try_from(exp.as_str())
            .map_err(|e| AuthError::signing(format!("invalid expiration: {e}")))?;
        let iat_claim = IssuedAtClaim::try_from(iat.as_str())
            .map_err(|e| AuthError::signing(format!("invalid issued at: {e}")))?;

        let custom = |name: &str, value: serde_json::Value| {
            CustomClaim::try_from((name, value))
                .map_err(|e| AuthError::signing(format!("invalid {name} claim: {e}")))
        };

        let mut builder = PasetoBuilder::<V4, Public>::default();
        builder
            .set_claim(exp_claim)
            .set_claim(iat_claim)
            .set_claim(IssuerClaim::from(TOKEN_ISSUER))
            .set_claim(custom("ct", claim.claim_type.clone().into())?)
            .set_claim(custom("e", claim.entity_name.clone().into())?)
            .set_claim(custom("c", claim.claims.clone().into())?)
            .set_claim(custom("d", claim.destination.clone().into())?)
            .set_claim(custom("va", claim.valid_after.into())?)
            .set_claim(custom("vb", claim.valid_before.into())?);

        builder.build(&paseto_key).map_err(AuthError::signing)
    }
}

#[cfg(test)]
mod tests {
    use wonka::{EntityType, from_base64};

    use super::*;
    use crate::seal::open;

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn protocol_from_path() {
        assert_eq!(ClaimProtocol::from_path("/claim/v1"), ClaimProtocol::V1);
        assert_eq!(ClaimProtocol::from_path("/claim/V1/"), ClaimProtocol::V1);
        assert_eq!(ClaimProtocol::from_path("/claim/v2"), ClaimProtocol::V2);
        assert_eq!(ClaimProtocol::from_path("/claim"), ClaimProtocol::V2);
    }

    #[test]
    fn certificate_signature_replaces_old_one() {
        let authority = SigningKey::generate();
        let issuer = Issuer::new(authority.clone());
        let holder = SigningKey::generate().verifying_key();
        let mut cert = Certificate::new("svc-a", EntityType::Service, "h1", &holder, 1, 2);
        cert.signature = vec![0xAA; 64];

        let signed = issuer.sign_certificate(cert).unwrap();
        assert!(signed.validate_signature(&[authority.verifying_key()]).is_ok());
    }

    #[test]
    fn sealed_token_opens_to_signed_claim() {
        let authority = SigningKey::generate();
        let issuer = Issuer::new(authority.clone());
        let caller = SigningKey::generate();
        let claim = Claim::new("svc-a", "EVERYONE,svc-a", "svc-b", now(), now() + 60);

        let token = issuer
            .issue(claim, ClaimProtocol::V2, &caller.verifying_key())
            .unwrap();
        let json = open(&caller, &from_base64(&token).unwrap()).unwrap();
        let opened = Claim::from_json(&json).unwrap();

        assert!(opened.verify(&[authority.verifying_key()]));
        assert_eq!(opened.claims, vec!["EVERYONE", "svc-a"]);
    }

    #[test]
    fn paseto_token_is_public() {
        let issuer = Issuer::new(SigningKey::generate());
        let claim = Claim::new("svc-a", "EVERYONE", "svc-b", now(), now() + 60);

        let token = issuer
            .issue(claim, ClaimProtocol::V1, &SigningKey::generate().verifying_key())
            .unwrap();
        assert!(token.starts_with("v4.public."));
    }
}
