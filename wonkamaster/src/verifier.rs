//! Verification of issued claim tokens, as done by downstream services.

use rusty_paseto::prelude::*;
use wonka::{Claim, SigningKey, VerifyingKey, from_base64};

use crate::error::TokenError;
use crate::seal::open;

const PASETO_PREFIX: &str = "v4.public.";

/// Checks claim tokens against the authority's root keys.
///
/// ```
/// use wonka::{Claim, SigningKey};
/// use wonkamaster::{ClaimProtocol, ClaimVerifier, Issuer};
///
/// let authority = SigningKey::generate();
/// let caller = SigningKey::generate();
/// let now = chrono::Utc::now().timestamp();
///
/// let token = Issuer::new(authority.clone())
///     .issue(
///         Claim::new("svc-a", "EVERYONE,svc-a", "svc-b", now, now + 60),
///         ClaimProtocol::V2,
///         &caller.verifying_key(),
///     )
///     .unwrap();
///
/// let verifier = ClaimVerifier::new(vec![authority.verifying_key()]);
/// let claim = verifier.verify(&token, Some(&caller), now).unwrap();
/// assert!(claim.grants("everyone"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClaimVerifier {
    roots: Vec<VerifyingKey>,
}

impl ClaimVerifier {
    /// Creates a verifier trusting `roots`.
    #[must_use]
    pub const fn new(roots: Vec<VerifyingKey>) -> Self {
        Self { roots }
    }

    /// Trusts another root key.
    #[must_use]
    pub fn with_root(mut self, key: VerifyingKey) -> Self {
        self.roots.push(key);
        self
    }

    /// Verifies a token of either protocol. Sealed tokens need the
    /// recipient's key.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token cannot be opened, is not signed by
    /// a root, or is outside its validity window at `now`.
    pub fn verify(
        &self,
        token: &str,
        recipient: Option<&SigningKey>,
        now: i64,
    ) -> Result<Claim, TokenError> {
        if token.starts_with(PASETO_PREFIX) {
            return self.verify_public(token, now);
        }
        let recipient = recipient.ok_or_else(|| TokenError::Open {
            reason: "sealed token needs the recipient key".to_string(),
        })?;
        self.open_sealed(token, recipient, now)
    }

    /// Verifies a token and checks it was issued for `destination`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::WrongDestination` on a mismatch, or any error
    /// from [`verify`](Self::verify).
    pub fn verify_for_destination(
        &self,
        token: &str,
        recipient: Option<&SigningKey>,
        destination: &str,
        now: i64,
    ) -> Result<Claim, TokenError> {
        let claim = self.verify(token, recipient, now)?;
        if !claim.destination.eq_ignore_ascii_case(destination) {
            return Err(TokenError::WrongDestination {
                actual: claim.destination,
                expected: destination.to_string(),
            });
        }
        Ok(claim)
    }

    /// Verifies a v1 PASETO token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if no root verifies it or its claims are bad.
    pub fn verify_public(&self, token: &str, now: i64) -> Result<Claim, TokenError> {
        let mut last_error = TokenError::InvalidSignature;
        for root in &self.roots {
            match parse_with_key(token, root) {
                Ok(claim) => return check_window(claim, now),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    /// Opens and verifies a v2 sealed token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if it cannot be opened, parsed or verified.
    pub fn open_sealed(
        &self,
        token: &str,
        recipient: &SigningKey,
        now: i64,
    ) -> Result<Claim, TokenError> {
        let sealed = from_base64(token.trim()).map_err(|e| TokenError::Format {
            reason: e.to_string(),
        })?;
        let json = open(recipient, &sealed)?;
        let claim = Claim::from_json(&json).map_err(|e| TokenError::Claims {
            reason: e.to_string(),
        })?;
        if !claim.verify(&self.roots) {
            return Err(TokenError::InvalidSignature);
        }
        check_window(claim, now)
    }
}

fn check_window(claim: Claim, now: i64) -> Result<Claim, TokenError> {
    if now < claim.valid_after {
        return Err(TokenError::NotYetValid {
            valid_after: claim.valid_after,
        });
    }
    if now > claim.valid_before {
        return Err(TokenError::Expired {
            valid_before: claim.valid_before,
        });
    }
    Ok(claim)
}

fn parse_with_key(token: &str, root: &VerifyingKey) -> Result<Claim, TokenError> {
    let key_bytes = root.to_bytes();
    let key_wrapper = Key::<32>::from(&key_bytes);
    let paseto_key = PasetoAsymmetricPublicKey::<V4, Public>::from(&key_wrapper);

    let json = PasetoParser::<V4, Public>::default()
        .parse(token, &paseto_key)
        .map_err(|e| {
            let message = e.to_string();
            let lower = message.to_lowercase();
            if lower.contains("signature") {
                TokenError::InvalidSignature
            } else if lower.contains("expired") {
                TokenError::Expired { valid_before: 0 }
            } else {
                TokenError::Format { reason: message }
            }
        })?;

    extract_claim(&json)
}

fn extract_claim(json: &serde_json::Value) -> Result<Claim, TokenError> {
    let text = |name: &str| {
        json[name]
            .as_str()
            .map(String::from)
            .ok_or_else(|| TokenError::Claims {
                reason: format!("missing {name} claim"),
            })
    };
    let number = |name: &str| {
        json[name].as_i64().ok_or_else(|| TokenError::Claims {
            reason: format!("missing {name} claim"),
        })
    };

    let claims: Vec<String> = json
        .get("c")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .ok_or_else(|| TokenError::Claims {
            reason: "missing c claim".to_string(),
        })?;

    Ok(Claim {
        claim_type: text("ct")?,
        valid_after: number("va")?,
        valid_before: number("vb")?,
        entity_name: text("e")?,
        claims,
        destination: text("d")?,
        signature: Vec::new(),
    })
}
