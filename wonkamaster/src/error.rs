//! Error types for the authorization engine.
//!
//! Every engine failure is an [`AuthError`]. Its [`result_code`] is the
//! machine-readable string clients branch on and its [`status`] is the HTTP
//! status the transport should send. Internal detail such as which link of a
//! trust chain failed stays in the error for logs and never reaches the
//! result code.
//!
//! [`result_code`]: AuthError::result_code
//! [`status`]: AuthError::status

use std::fmt;

use thiserror::Error;
use wonka::constants::result;

/// The endpoint a request arrived on. Time-window failures map to
/// different codes and statuses per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Certificate signing.
    Csr,
    /// Claim issuance.
    Claim,
    /// Claim resolution for a destination.
    Resolve,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csr => "csr",
            Self::Claim => "claim",
            Self::Resolve => "resolve",
        })
    }
}

/// A named link in CSR authorization. Each authorization path is an
/// ordered list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainCheck {
    /// The signing certificate parses and, when refreshing, is
    /// authority-signed and inside its validity window.
    SigningCertificate,
    /// The CSR signature verifies with the authorizing key.
    CsrSignature,
    /// The signing certificate embeds a parseable SSH host certificate.
    EmbeddedHostCert,
    /// The embedded SSH host certificate is trusted for the target host.
    HostCertTrusted,
    /// The signing certificate was signed by the SSH host key.
    SignedByHostKey,
    /// The embedded launch request decodes and verifies.
    LaunchRequest,
    /// Launch hostname matches the target host and the SSH principal.
    LaunchHostBinding,
    /// Launch service id matches the target entity.
    LaunchServiceBinding,
    /// Refreshed certificate keeps the entity name.
    RefreshEntity,
    /// Refreshed certificate keeps the host.
    RefreshHost,
    /// The SSH certificate parses.
    SshCertificate,
    /// The SSH certificate is trusted by the configured CA material.
    SshTrusted,
    /// The target entity type may be issued over an SSH host certificate.
    EntityType,
    /// The target entity name is not personnel- or group-shaped.
    EntityShape,
    /// An attached launch request names the SSH principal's host.
    LaunchPrincipal,
    /// The entity name splits into `local@domain`.
    PersonnelName,
    /// The entity is enrolled with a usable key.
    EnrolledKey,
}

impl fmt::Display for ChainCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SigningCertificate => "signing-certificate",
            Self::CsrSignature => "csr-signature",
            Self::EmbeddedHostCert => "embedded-host-cert",
            Self::HostCertTrusted => "host-cert-trusted",
            Self::SignedByHostKey => "signed-by-host-key",
            Self::LaunchRequest => "launch-request",
            Self::LaunchHostBinding => "launch-host-binding",
            Self::LaunchServiceBinding => "launch-service-binding",
            Self::RefreshEntity => "refresh-entity",
            Self::RefreshHost => "refresh-host",
            Self::SshCertificate => "ssh-certificate",
            Self::SshTrusted => "ssh-trusted",
            Self::EntityType => "entity-type",
            Self::EntityShape => "entity-shape",
            Self::LaunchPrincipal => "launch-principal",
            Self::PersonnelName => "personnel-name",
            Self::EnrolledKey => "enrolled-key",
        };
        f.write_str(name)
    }
}

/// Every failure the engine can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The request body could not be decoded.
    #[error("failed to decode request: {reason}")]
    Decode {
        /// Description of the decoding error
        reason: String,
    },
    /// A CSR authorization link failed.
    #[error("certificate signing request rejected at {check}: {reason}")]
    BadCsr {
        /// The failing link
        check: ChainCheck,
        /// Internal detail for logs
        reason: String,
    },
    /// The certificate in a CSR is unreadable or could not be signed.
    #[error("certificate signing request is malformed: {reason}")]
    MalformedCsr {
        /// Internal detail for logs
        reason: String,
    },
    /// A create time is outside the allowed clock skew.
    #[error("{kind} create time {ctime} is outside the allowed clock skew of {skew}s")]
    OutsideTimeWindow {
        /// Endpoint the request arrived on
        kind: RequestKind,
        /// Offending create time, unix seconds
        ctime: i64,
        /// Allowed skew, seconds
        skew: i64,
    },
    /// An expire time has already passed.
    #[error("{kind} expired at {etime}")]
    Expired {
        /// Endpoint the request arrived on
        kind: RequestKind,
        /// Offending expire time, unix seconds
        etime: i64,
    },
    /// Claim-request authentication failed.
    #[error("claim request rejected: {reason}")]
    Rejected {
        /// Internal detail for logs
        reason: String,
    },
    /// Resolve-request authentication failed.
    #[error("resolve request failed verification: {reason}")]
    VerifyFailed {
        /// Internal detail for logs
        reason: String,
    },
    /// The caller may not impersonate the named entity.
    #[error("'{caller}' may not impersonate '{target}'")]
    InvalidImpersonator {
        /// Authenticated caller
        caller: String,
        /// Entity the caller asked to act as
        target: String,
    },
    /// The caller authenticated but holds none of the requested claims.
    #[error("no allowed claims found for '{entity}': {reason}")]
    NoAccess {
        /// Effective requester
        entity: String,
        /// Why the computation came up empty
        reason: String,
    },
    /// The issued claim could not be signed or sealed.
    #[error("failed to sign claim: {reason}")]
    Signing {
        /// Description of the failure
        reason: String,
    },
    /// The entity store or group directory failed.
    #[error("lookup failed: {reason}")]
    Lookup {
        /// Description of the collaborator failure
        reason: String,
    },
}

impl AuthError {
    /// Creates a `BadCsr` error.
    #[must_use]
    pub fn bad_csr(check: ChainCheck, reason: impl ToString) -> Self {
        Self::BadCsr {
            check,
            reason: reason.to_string(),
        }
    }

    /// Creates a `Rejected` error.
    #[must_use]
    pub fn rejected(reason: impl ToString) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    /// Creates a `Lookup` error.
    #[must_use]
    pub fn lookup(reason: impl ToString) -> Self {
        Self::Lookup {
            reason: reason.to_string(),
        }
    }

    /// Creates a `NoAccess` error.
    #[must_use]
    pub fn no_access(entity: impl Into<String>, reason: impl ToString) -> Self {
        Self::NoAccess {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Signing` error.
    #[must_use]
    pub fn signing(reason: impl ToString) -> Self {
        Self::Signing {
            reason: reason.to_string(),
        }
    }

    /// Returns the machine-readable result code.
    #[must_use]
    pub const fn result_code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => result::DECODE_ERROR,
            Self::BadCsr { .. } | Self::MalformedCsr { .. } => result::BAD_CSR,
            Self::OutsideTimeWindow { .. } => result::OUTSIDE_TIME_WINDOW,
            Self::Expired {
                kind: RequestKind::Csr,
                ..
            } => result::CSR_EXPIRED,
            Self::Expired { .. } => result::CLAIM_REQUEST_EXPIRED,
            Self::Rejected { .. } => result::REJECTED,
            Self::VerifyFailed { .. } => result::VERIFY_ERROR,
            Self::InvalidImpersonator { .. } => result::INVALID_IMPERSONATOR,
            Self::NoAccess { .. } => result::CLAIM_NO_ACCESS,
            Self::Signing { .. } => result::CLAIM_SIGNING_ERROR,
            Self::Lookup { .. } => result::LOOKUP_SERVER_ERROR,
        }
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Decode { .. }
            | Self::MalformedCsr { .. }
            | Self::VerifyFailed { .. }
            | Self::InvalidImpersonator { .. }
            | Self::OutsideTimeWindow {
                kind: RequestKind::Csr,
                ..
            }
            | Self::Expired {
                kind: RequestKind::Csr,
                ..
            } => 400,
            Self::BadCsr { .. }
            | Self::OutsideTimeWindow { .. }
            | Self::Expired { .. }
            | Self::Rejected { .. }
            | Self::NoAccess { .. } => 403,
            Self::Signing { .. } | Self::Lookup { .. } => 500,
        }
    }

    /// Returns the failing CSR link, if this is a CSR rejection.
    #[must_use]
    pub const fn chain_check(&self) -> Option<ChainCheck> {
        match self {
            Self::BadCsr { check, .. } => Some(*check),
            _ => None,
        }
    }

    /// Returns true for collaborator and signing failures.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

/// Errors from the SSH trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SshError {
    /// The text is not an OpenSSH certificate.
    #[error("failed to parse ssh certificate: {reason}")]
    Parse {
        /// Description of the parse error
        reason: String,
    },
    /// The certified key is not Ed25519.
    #[error("ssh certificate key algorithm '{algorithm}' is not supported; use ssh-ed25519")]
    UnsupportedKey {
        /// Algorithm found
        algorithm: String,
    },
    /// The certificate is not signed by trusted CA material or is outside
    /// its validity window.
    #[error("ssh certificate is not trusted: {reason}")]
    Untrusted {
        /// Description of the failure
        reason: String,
    },
    /// The certificate does not name the expected principal.
    #[error("ssh certificate is not valid for principal '{principal}'")]
    Principal {
        /// The required principal
        principal: String,
    },
    /// The certificate is the wrong kind for the check.
    #[error("expected an ssh {expected} certificate")]
    WrongType {
        /// `user` or `host`
        expected: &'static str,
    },
    /// A CA key in configuration could not be parsed.
    #[error("invalid ssh ca key: {reason}")]
    InvalidCaKey {
        /// Description of the parse error
        reason: String,
    },
}

/// Errors raised while building policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The policy file is not valid JSON for the expected shape.
    #[error("failed to parse policy file: {reason}")]
    Parse {
        /// Description of the parse error
        reason: String,
    },
    /// A key in the policy file is malformed.
    #[error("invalid {what} in policy file: {reason}")]
    InvalidKey {
        /// Which key list
        what: &'static str,
        /// Description of the key error
        reason: String,
    },
    /// The grace override window is inverted.
    #[error("certificate grace override has signed_after >= signed_before")]
    InvertedOverride,
}

/// Errors raised while verifying issued claim tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No trusted authority key verifies the token.
    #[error("claim token signature verification failed; token may have been tampered with")]
    InvalidSignature,
    /// The token is outside its validity window.
    #[error("claim token expired at {valid_before}; request a new claim")]
    Expired {
        /// End of validity, unix seconds
        valid_before: i64,
    },
    /// The token is not yet valid.
    #[error("claim token not valid until {valid_after}")]
    NotYetValid {
        /// Start of validity, unix seconds
        valid_after: i64,
    },
    /// The token cannot be decoded.
    #[error("invalid claim token format: {reason}")]
    Format {
        /// Description of the format error
        reason: String,
    },
    /// A sealed token could not be opened with the given key.
    #[error("failed to open sealed claim token: {reason}")]
    Open {
        /// Description of the failure
        reason: String,
    },
    /// The token's claims are missing or malformed.
    #[error("failed to parse claims: {reason}")]
    Claims {
        /// Description of the parsing error
        reason: String,
    },
    /// The claim was issued for another destination.
    #[error("claim is for '{actual}' but '{expected}' was expected")]
    WrongDestination {
        /// Destination in the claim
        actual: String,
        /// Destination the verifier expected
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_rejections_share_one_code() {
        let signature = AuthError::bad_csr(ChainCheck::CsrSignature, "bad sig");
        let binding = AuthError::bad_csr(ChainCheck::LaunchHostBinding, "h1 != h2");

        assert_eq!(signature.result_code(), binding.result_code());
        assert_eq!(signature.status(), 403);
        assert_eq!(binding.chain_check(), Some(ChainCheck::LaunchHostBinding));
        assert!(binding.to_string().contains("launch-host-binding"));
    }

    #[test]
    fn time_errors_depend_on_endpoint() {
        let csr = AuthError::Expired {
            kind: RequestKind::Csr,
            etime: 1,
        };
        let claim = AuthError::Expired {
            kind: RequestKind::Claim,
            etime: 1,
        };
        assert_eq!(csr.result_code(), result::CSR_EXPIRED);
        assert_eq!(csr.status(), 400);
        assert_eq!(claim.result_code(), result::CLAIM_REQUEST_EXPIRED);
        assert_eq!(claim.status(), 403);

        let window = AuthError::OutsideTimeWindow {
            kind: RequestKind::Claim,
            ctime: 0,
            skew: 120,
        };
        assert_eq!(window.status(), 403);
        assert_eq!(window.result_code(), result::OUTSIDE_TIME_WINDOW);
    }

    #[test]
    fn collaborator_failures_are_server_errors() {
        let err = AuthError::lookup("store down");
        assert_eq!(err.status(), 500);
        assert!(err.is_server_error());
        assert_eq!(err.result_code(), result::LOOKUP_SERVER_ERROR);
        assert!(!AuthError::rejected("bad sig").is_server_error());
    }

    #[test]
    fn no_access_is_distinct_from_rejection() {
        let err = AuthError::no_access("svc-a", "empty");
        assert_eq!(err.result_code(), result::CLAIM_NO_ACCESS);
        assert_ne!(err.result_code(), AuthError::rejected("x").result_code());
    }

    #[test]
    fn impersonation_is_client_error() {
        let err = AuthError::InvalidImpersonator {
            caller: "svc-a".into(),
            target: "alice@uber.com".into(),
        };
        assert_eq!(err.status(), 400);
        assert_eq!(err.result_code(), result::INVALID_IMPERSONATOR);
    }
}
