//! Caller authentication for claim and resolve requests.
//!
//! Each request carries exactly one kind of authentication material. It is
//! classified once into an [`AuthMethod`] and resolved into a [`Caller`]:
//! the key the issued token is bound to plus the [`CallerClass`] that
//! decides which capabilities may be granted.

use std::fmt;

use tracing::{debug, info};
use wonka::{
    CERTIFICATE_SKEW_SECS, Certificate, CertificateError, ClaimRequest, EntityType,
    ResolveRequest, VerifyingKey, personnel_local_part, qualify_host,
};
use wonka_directory::EntityStore;

use crate::config::PolicyConfig;
use crate::error::AuthError;
use crate::ssh::{SshCertKind, SshCertificate, SshTrust};

/// Placeholder name hosts use before they know their own name.
const BOOTSTRAP_HOST: &str = "localhost";

/// Derived category of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerClass {
    /// A person, via an SSH user certificate or a user certificate.
    User,
    /// A service, via a certificate or its enrolled key.
    Service,
    /// A machine, via an SSH host certificate.
    Host,
    /// Could not be classified.
    Invalid,
}

impl fmt::Display for CallerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Service => "service",
            Self::Host => "host",
            Self::Invalid => "invalid",
        })
    }
}

/// Which trust chain authenticated the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    /// A certificate signed by the authority.
    Certificate,
    /// An SSH user certificate.
    SshUser,
    /// An SSH host certificate.
    SshHost,
    /// The entity's enrolled key.
    Enrolled,
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Certificate => "WonkaCertificate",
            Self::SshUser => "USSHUserCert",
            Self::SshHost => "USSHHostCert",
            Self::Enrolled => "enrolled",
        })
    }
}

/// The authentication material carried by a request, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// The caller presented a certificate.
    Certificate(Certificate),
    /// The caller presented an SSH certificate.
    Ssh(SshCertificate),
    /// Neither; the caller's enrolled key is used.
    Enrolled,
}

impl AuthMethod {
    /// Classifies a claim request: certificate, then SSH signature, then
    /// enrolled key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` if the present material does not parse.
    pub fn for_claim(req: &ClaimRequest, ssh: &dyn SshTrust) -> Result<Self, AuthError> {
        if !req.certificate.is_empty() {
            return req
                .certificate()
                .map(Self::Certificate)
                .map_err(AuthError::rejected);
        }
        if !req.ussh_signature.is_empty() {
            return ssh
                .parse(&req.ussh_certificate)
                .map(Self::Ssh)
                .map_err(AuthError::rejected);
        }
        Ok(Self::Enrolled)
    }

    /// Classifies a resolve request: SSH certificate, then certificate, then
    /// enrolled key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::VerifyFailed` if the present material does not parse.
    pub fn for_resolve(req: &ResolveRequest, ssh: &dyn SshTrust) -> Result<Self, AuthError> {
        if !req.ussh_certificate.is_empty() {
            let text = std::str::from_utf8(&req.ussh_certificate).map_err(verify_failed)?;
            return ssh.parse(text).map(Self::Ssh).map_err(verify_failed);
        }
        if !req.certificate.is_empty() {
            return Certificate::from_bytes(&req.certificate)
                .map(Self::Certificate)
                .map_err(verify_failed);
        }
        Ok(Self::Enrolled)
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Entity name the caller authenticated as.
    pub name: String,
    /// Key issued tokens are bound to.
    pub public_key: VerifyingKey,
    /// Derived class.
    pub class: CallerClass,
    /// Chain used.
    pub auth: AuthKind,
    /// End of the SSH user certificate's validity, for expiry defaulting.
    pub ssh_valid_before: Option<u64>,
}

impl Caller {
    fn new(name: &str, public_key: VerifyingKey, class: CallerClass, auth: AuthKind) -> Self {
        Self {
            name: name.to_string(),
            public_key,
            class,
            auth,
            ssh_valid_before: None,
        }
    }
}

/// The collaborators authentication needs.
#[derive(Clone, Copy)]
pub struct AuthContext<'a> {
    /// Policy.
    pub config: &'a PolicyConfig,
    /// Enrolled entities.
    pub store: &'a dyn EntityStore,
    /// SSH trust.
    pub ssh: &'a dyn SshTrust,
    /// Current unix time.
    pub now: i64,
}

fn verify_failed(reason: impl ToString) -> AuthError {
    AuthError::VerifyFailed {
        reason: reason.to_string(),
    }
}

fn as_verify_failed(err: AuthError) -> AuthError {
    match err {
        AuthError::Rejected { reason } => AuthError::VerifyFailed { reason },
        other => other,
    }
}

/// Checks a presented certificate against the roots and its validity
/// window. An expired certificate is accepted if the grace override
/// covers it; the signature is always checked.
///
/// # Errors
///
/// Returns `AuthError::Rejected` with the reason.
pub fn check_presented_certificate(
    cert: &Certificate,
    config: &PolicyConfig,
    now: i64,
) -> Result<(), AuthError> {
    cert.validate_signature(config.root_keys())
        .map_err(AuthError::rejected)?;

    match cert.check_window(now, CERTIFICATE_SKEW_SECS) {
        Ok(()) => Ok(()),
        Err(CertificateError::Expired { .. })
            if config
                .cert_override()
                .is_some_and(|grant| grant.permits(cert.valid_after, now)) =>
        {
            info!(
                entity = %cert.entity_name,
                serial = cert.serial,
                valid_after = cert.valid_after,
                valid_before = cert.valid_before,
                "accepting expired certificate under grace override"
            );
            Ok(())
        }
        Err(e) => Err(AuthError::rejected(e)),
    }
}

fn enrolled_key(store: &dyn EntityStore, name: &str) -> Result<VerifyingKey, AuthError> {
    let entity = store.get(name).map_err(|e| {
        if e.is_not_found() {
            AuthError::rejected(e)
        } else {
            AuthError::lookup(e)
        }
    })?;
    entity.verifying_key().map_err(AuthError::rejected)
}

/// Authenticates a claim request.
///
/// # Errors
///
/// Returns `AuthError::Rejected` for any authentication failure and
/// `AuthError::Lookup` if the entity store fails.
pub fn authenticate_claim_request(
    req: &ClaimRequest,
    ctx: &AuthContext<'_>,
) -> Result<Caller, AuthError> {
    let method = AuthMethod::for_claim(req, ctx.ssh)?;
    let signed = req.signing_bytes().map_err(AuthError::rejected)?;
    let signature = req.entity_signature_bytes().map_err(AuthError::rejected)?;

    let caller = match method {
        AuthMethod::Certificate(cert) => {
            check_presented_certificate(&cert, ctx.config, ctx.now)?;
            if !cert.entity_name.eq_ignore_ascii_case(&req.entity_name) {
                return Err(AuthError::rejected(format!(
                    "claim request for '{}' carries a certificate for '{}'",
                    req.entity_name, cert.entity_name
                )));
            }
            let key = cert.public_key().map_err(AuthError::rejected)?;
            if !key.verify(&signed, &signature) {
                return Err(AuthError::rejected("claim request signature does not verify"));
            }
            let class = if cert.entity_type == EntityType::User {
                CallerClass::User
            } else {
                CallerClass::Service
            };
            Caller::new(&req.entity_name, key, class, AuthKind::Certificate)
        }
        AuthMethod::Ssh(cert) => authenticate_ssh_claim(req, &cert, &signed, &signature, ctx)?,
        AuthMethod::Enrolled => {
            let key = enrolled_key(ctx.store, &req.entity_name)?;
            if !key.verify(&signed, &signature) {
                return Err(AuthError::rejected("claim request signature does not verify"));
            }
            Caller::new(&req.entity_name, key, CallerClass::Service, AuthKind::Enrolled)
        }
    };

    debug!(
        entity = %caller.name,
        authtype = %caller.auth,
        class = %caller.class,
        "claim request authenticated"
    );
    Ok(caller)
}

fn authenticate_ssh_claim(
    req: &ClaimRequest,
    cert: &SshCertificate,
    signed: &[u8],
    signature: &[u8],
    ctx: &AuthContext<'_>,
) -> Result<Caller, AuthError> {
    let session = req.session_key().map_err(AuthError::rejected)?;
    if !session.verify(signed, signature) {
        return Err(AuthError::rejected("inner claim request signature does not verify"));
    }

    let ussh_signed = req.ussh_signing_bytes().map_err(AuthError::rejected)?;
    let ussh_signature = req.ussh_signature_bytes().map_err(AuthError::rejected)?;

    match cert.kind {
        SshCertKind::User => {
            let local = personnel_local_part(&req.entity_name).ok_or_else(|| {
                AuthError::rejected(format!(
                    "'{}' is not a personnel entity name",
                    req.entity_name
                ))
            })?;
            ctx.ssh
                .verify_user(cert, local, ctx.now)
                .map_err(AuthError::rejected)?;
            if !cert.public_key.verify(&ussh_signed, &ussh_signature) {
                return Err(AuthError::rejected("ssh signature does not verify"));
            }
            let mut caller =
                Caller::new(&req.entity_name, session, CallerClass::User, AuthKind::SshUser);
            caller.ssh_valid_before = Some(cert.valid_before);
            Ok(caller)
        }
        SshCertKind::Host => {
            if req.entity_name.eq_ignore_ascii_case(BOOTSTRAP_HOST) {
                return Err(AuthError::rejected("host entity name is the bootstrap placeholder"));
            }
            let host = qualify_host(&req.entity_name, ctx.config.host_suffix());
            ctx.ssh
                .verify_host(cert, &host, ctx.now)
                .map_err(AuthError::rejected)?;
            if !cert.public_key.verify(&ussh_signed, &ussh_signature) {
                return Err(AuthError::rejected("ssh signature does not verify"));
            }
            Ok(Caller::new(&req.entity_name, session, CallerClass::Host, AuthKind::SshHost))
        }
    }
}

/// Authenticates a resolve request.
///
/// # Errors
///
/// Returns `AuthError::VerifyFailed` for any authentication failure and
/// `AuthError::Lookup` if the entity store fails.
pub fn authenticate_resolve_request(
    req: &ResolveRequest,
    ctx: &AuthContext<'_>,
) -> Result<Caller, AuthError> {
    let method = AuthMethod::for_resolve(req, ctx.ssh)?;
    let signed = req.signing_bytes().map_err(verify_failed)?;

    let caller = match method {
        AuthMethod::Ssh(cert) => {
            if cert.kind != SshCertKind::User {
                return Err(verify_failed("resolve accepts only ssh user certificates"));
            }
            let local = personnel_local_part(&req.entity_name).ok_or_else(|| {
                verify_failed(format!("'{}' is not a personnel entity name", req.entity_name))
            })?;
            ctx.ssh
                .verify_user(&cert, local, ctx.now)
                .map_err(verify_failed)?;
            if !cert.public_key.verify(&signed, &req.signature) {
                return Err(verify_failed("ssh signature does not verify"));
            }
            let session = VerifyingKey::from_hex(&req.public_key).map_err(verify_failed)?;
            let mut caller =
                Caller::new(&req.entity_name, session, CallerClass::User, AuthKind::SshUser);
            caller.ssh_valid_before = Some(cert.valid_before);
            caller
        }
        AuthMethod::Certificate(cert) => {
            check_presented_certificate(&cert, ctx.config, ctx.now).map_err(as_verify_failed)?;
            if !cert.entity_name.eq_ignore_ascii_case(&req.entity_name) {
                return Err(verify_failed(format!(
                    "resolve request for '{}' carries a certificate for '{}'",
                    req.entity_name, cert.entity_name
                )));
            }
            if !cert.verify(&signed, &req.signature) {
                return Err(verify_failed("resolve request signature does not verify"));
            }
            let key = cert.public_key().map_err(verify_failed)?;
            let class = if req
                .entity_name
                .to_ascii_lowercase()
                .ends_with(&ctx.config.host_suffix().to_ascii_lowercase())
            {
                CallerClass::Host
            } else {
                CallerClass::Service
            };
            Caller::new(&req.entity_name, key, class, AuthKind::Certificate)
        }
        AuthMethod::Enrolled => {
            let key = enrolled_key(ctx.store, &req.entity_name).map_err(as_verify_failed)?;
            if !key.verify(&signed, &req.signature) {
                return Err(verify_failed("resolve request signature does not verify"));
            }
            Caller::new(&req.entity_name, key, CallerClass::Service, AuthKind::Enrolled)
        }
    };

    debug!(
        entity = %caller.name,
        authtype = %caller.auth,
        class = %caller.class,
        "resolve request authenticated"
    );
    Ok(caller)
}
