//! SSH certificate trust boundary.
//!
//! The engines see SSH certificates only through [`SshTrust`]. The
//! [`OpenSshTrust`] adapter checks OpenSSH certificates against CA keys by
//! SHA-256 fingerprint using the `ssh-key` crate.

use ssh_key::certificate::CertType;
use ssh_key::{Fingerprint, HashAlg, PublicKey};
use tracing::debug;
use wonka::VerifyingKey;

use crate::error::SshError;

/// Whether an SSH certificate identifies a user or a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshCertKind {
    /// Issued to a person; principals are login names.
    User,
    /// Issued to a machine; principals are host names.
    Host,
}

impl SshCertKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Host => "host",
        }
    }
}

/// A parsed SSH certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCertificate {
    /// User or host.
    pub kind: SshCertKind,
    /// Names the certificate is valid for.
    pub principals: Vec<String>,
    /// CA-assigned identifier.
    pub key_id: String,
    /// CA-assigned serial.
    pub serial: u64,
    /// Start of validity, unix seconds.
    pub valid_after: u64,
    /// End of validity, unix seconds.
    pub valid_before: u64,
    /// The certified Ed25519 key.
    pub public_key: VerifyingKey,
    /// Original OpenSSH text.
    pub openssh: String,
}

impl SshCertificate {
    /// Returns the first principal, if any.
    #[must_use]
    pub fn primary_principal(&self) -> Option<&str> {
        self.principals.first().map(String::as_str)
    }

    /// Returns true if `name` is a principal, ignoring ASCII case.
    #[must_use]
    pub fn has_principal_ignore_case(&self, name: &str) -> bool {
        self.principals.iter().any(|p| p.eq_ignore_ascii_case(name))
    }

    fn expect_kind(&self, kind: SshCertKind) -> Result<(), SshError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(SshError::WrongType {
                expected: kind.as_str(),
            })
        }
    }
}

/// Parses and verifies SSH certificates.
///
/// Implementations must be safe to share between concurrent requests.
pub trait SshTrust: Send + Sync {
    /// Parses OpenSSH certificate text.
    ///
    /// # Errors
    ///
    /// Returns `SshError::Parse` or `UnsupportedKey`.
    fn parse(&self, text: &str) -> Result<SshCertificate, SshError>;

    /// Verifies a host certificate for `host` (already qualified).
    ///
    /// # Errors
    ///
    /// Returns `SshError` describing why the certificate is not trusted.
    fn verify_host(&self, cert: &SshCertificate, host: &str, now: i64) -> Result<(), SshError>;

    /// Verifies a user certificate for login `principal`.
    ///
    /// # Errors
    ///
    /// Returns `SshError` describing why the certificate is not trusted.
    fn verify_user(&self, cert: &SshCertificate, principal: &str, now: i64)
    -> Result<(), SshError>;
}

/// Parses OpenSSH certificate text into the boundary type.
///
/// # Errors
///
/// Returns `SshError::Parse` for malformed text and `UnsupportedKey` for
/// non-Ed25519 subject keys.
pub fn parse_openssh_certificate(text: &str) -> Result<SshCertificate, SshError> {
    let cert = ssh_key::Certificate::from_openssh(text.trim()).map_err(|e| SshError::Parse {
        reason: e.to_string(),
    })?;

    let key = cert
        .public_key()
        .ed25519()
        .ok_or_else(|| SshError::UnsupportedKey {
            algorithm: cert.public_key().algorithm().as_str().to_string(),
        })?;
    let public_key = VerifyingKey::from_bytes(&key.0).map_err(|e| SshError::Parse {
        reason: e.to_string(),
    })?;

    let kind = match cert.cert_type() {
        CertType::User => SshCertKind::User,
        CertType::Host => SshCertKind::Host,
    };

    Ok(SshCertificate {
        kind,
        principals: cert.valid_principals().to_vec(),
        key_id: cert.key_id().to_string(),
        serial: cert.serial(),
        valid_after: cert.valid_after(),
        valid_before: cert.valid_before(),
        public_key,
        openssh: text.trim().to_string(),
    })
}

fn ca_fingerprint(line: &str) -> Result<Fingerprint, SshError> {
    PublicKey::from_openssh(line.trim())
        .map(|key| key.fingerprint(HashAlg::Sha256))
        .map_err(|e| SshError::InvalidCaKey {
            reason: e.to_string(),
        })
}

/// Trust adapter backed by OpenSSH CA public keys.
///
/// ```no_run
/// use wonkamaster::{OpenSshTrust, SshTrust};
///
/// let trust = OpenSshTrust::new()
///     .with_host_ca("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAI... host-ca")?;
/// let cert = trust.parse("ssh-ed25519-cert-v01@openssh.com AAAA...")?;
/// trust.verify_host(&cert, "h1.prod.example", 1_700_000_000)?;
/// # Ok::<(), wonkamaster::SshError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenSshTrust {
    user_cas: Vec<Fingerprint>,
    host_cas: Vec<Fingerprint>,
}

impl OpenSshTrust {
    /// Creates an adapter that trusts nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an adapter from OpenSSH public key lines.
    ///
    /// # Errors
    ///
    /// Returns `SshError::InvalidCaKey` for the first line that does not parse.
    pub fn from_openssh_keys(user_cas: &[String], host_cas: &[String]) -> Result<Self, SshError> {
        let trust = Self {
            user_cas: user_cas.iter().map(|l| ca_fingerprint(l)).collect::<Result<_, _>>()?,
            host_cas: host_cas.iter().map(|l| ca_fingerprint(l)).collect::<Result<_, _>>()?,
        };
        debug!(
            user_cas = trust.user_cas.len(),
            host_cas = trust.host_cas.len(),
            "ssh trust loaded"
        );
        Ok(trust)
    }

    /// Trusts a user CA given as an OpenSSH public key line.
    ///
    /// # Errors
    ///
    /// Returns `SshError::InvalidCaKey` if the line does not parse.
    pub fn with_user_ca(mut self, line: &str) -> Result<Self, SshError> {
        self.user_cas.push(ca_fingerprint(line)?);
        Ok(self)
    }

    /// Trusts a host CA given as an OpenSSH public key line.
    ///
    /// # Errors
    ///
    /// Returns `SshError::InvalidCaKey` if the line does not parse.
    pub fn with_host_ca(mut self, line: &str) -> Result<Self, SshError> {
        self.host_cas.push(ca_fingerprint(line)?);
        Ok(self)
    }

    fn validate(cas: &[Fingerprint], cert: &SshCertificate, now: i64) -> Result<(), SshError> {
        let parsed = ssh_key::Certificate::from_openssh(&cert.openssh).map_err(|e| {
            SshError::Parse {
                reason: e.to_string(),
            }
        })?;
        let now = u64::try_from(now).unwrap_or(0);
        parsed
            .validate_at(now, cas)
            .map_err(|e| SshError::Untrusted {
                reason: e.to_string(),
            })
    }
}

impl SshTrust for OpenSshTrust {
    fn parse(&self, text: &str) -> Result<SshCertificate, SshError> {
        parse_openssh_certificate(text)
    }

    fn verify_host(&self, cert: &SshCertificate, host: &str, now: i64) -> Result<(), SshError> {
        cert.expect_kind(SshCertKind::Host)?;
        Self::validate(&self.host_cas, cert, now)?;
        if cert.has_principal_ignore_case(host) {
            Ok(())
        } else {
            Err(SshError::Principal {
                principal: host.to_string(),
            })
        }
    }

    fn verify_user(
        &self,
        cert: &SshCertificate,
        principal: &str,
        now: i64,
    ) -> Result<(), SshError> {
        cert.expect_kind(SshCertKind::User)?;
        Self::validate(&self.user_cas, cert, now)?;
        if cert.principals.iter().any(|p| p == principal) {
            Ok(())
        } else {
            Err(SshError::Principal {
                principal: principal.to_string(),
            })
        }
    }
}
