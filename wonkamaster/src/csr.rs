//! Certificate signing request authorization.
//!
//! A CSR is authorized along exactly one path, chosen by the material it
//! carries: a signing certificate (cert-granting or refresh), an SSH
//! certificate (host or user), or the entity's enrolled key. Every failure
//! is an [`AuthError::BadCsr`] naming the [`ChainCheck`] that failed; the
//! client only ever sees the generic result code.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};
use wonka::constants::result;
use wonka::{
    CERTIFICATE_SKEW_SECS, Certificate, CertificateSignature, CertificateSigningRequest,
    EntityType, LaunchRequest, VerifyingKey, is_group_reference, is_personnel_name,
    personnel_local_part, qualify_host, unix_i64,
};
use wonka_directory::EntityStore;

use crate::clock::Clock;
use crate::config::PolicyConfig;
use crate::error::{AuthError, ChainCheck};
use crate::issuer::Issuer;
use crate::ssh::{SshCertKind, SshCertificate, SshTrust};

/// The path a CSR was authorized along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrPath {
    /// A cert-granting certificate vouched for a new certificate on its host.
    CertGranting,
    /// An existing certificate was refreshed.
    Refresh,
    /// An SSH host certificate authorized the request.
    SshHost,
    /// An SSH user certificate authorized the request.
    SshUser,
    /// The entity's enrolled key authorized the request.
    Enrolled,
}

impl CsrPath {
    /// Returns the checks this path runs, in order.
    #[must_use]
    pub const fn checks(self) -> &'static [ChainCheck] {
        match self {
            Self::CertGranting => &GRANTING_CHECKS,
            Self::Refresh => &[
                ChainCheck::SigningCertificate,
                ChainCheck::CsrSignature,
                ChainCheck::RefreshEntity,
                ChainCheck::RefreshHost,
            ],
            Self::SshHost => &[
                ChainCheck::SshCertificate,
                ChainCheck::SshTrusted,
                ChainCheck::CsrSignature,
                ChainCheck::EntityType,
                ChainCheck::EntityShape,
                ChainCheck::LaunchPrincipal,
            ],
            Self::SshUser => &[
                ChainCheck::SshCertificate,
                ChainCheck::PersonnelName,
                ChainCheck::SshTrusted,
                ChainCheck::CsrSignature,
            ],
            Self::Enrolled => &[ChainCheck::EnrolledKey, ChainCheck::CsrSignature],
        }
    }
}

impl fmt::Display for CsrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CertGranting => "cert-granting",
            Self::Refresh => "refresh",
            Self::SshHost => "ssh-host",
            Self::SshUser => "ssh-user",
            Self::Enrolled => "enrolled",
        })
    }
}

const GRANTING_CHECKS: [ChainCheck; 7] = [
    ChainCheck::CsrSignature,
    ChainCheck::EmbeddedHostCert,
    ChainCheck::HostCertTrusted,
    ChainCheck::SignedByHostKey,
    ChainCheck::LaunchRequest,
    ChainCheck::LaunchHostBinding,
    ChainCheck::LaunchServiceBinding,
];

type Link = fn(&GrantingChain<'_>) -> Result<(), String>;

const GRANTING_LINKS: [(ChainCheck, Link); 7] = [
    (ChainCheck::CsrSignature, csr_signed_by_granting_key),
    (ChainCheck::EmbeddedHostCert, embeds_host_cert),
    (ChainCheck::HostCertTrusted, host_cert_trusted_for_target),
    (ChainCheck::SignedByHostKey, granting_signed_by_host_key),
    (ChainCheck::LaunchRequest, launch_request_verifies),
    (ChainCheck::LaunchHostBinding, launch_names_target_host),
    (ChainCheck::LaunchServiceBinding, launch_names_target_service),
];

/// Everything the cert-granting checks look at. Built once; each check is
/// a pure predicate over it.
struct GrantingChain<'a> {
    target: &'a Certificate,
    target_host: String,
    signing: &'a Certificate,
    csr_signed: &'a [u8],
    csr_signature: &'a [u8],
    host_cert: Result<SshCertificate, String>,
    launch: Result<LaunchRequest, String>,
    ssh: &'a dyn SshTrust,
    now: i64,
}

impl<'a> GrantingChain<'a> {
    fn new(
        csr: &'a CertificateSigningRequest,
        csr_signed: &'a [u8],
        target: &'a Certificate,
        signing: &'a Certificate,
        config: &PolicyConfig,
        ssh: &'a dyn SshTrust,
        now: i64,
    ) -> Self {
        let host_cert = signing
            .ussh_certificate_tag()
            .ok_or_else(|| "signing certificate has no ssh host certificate".to_string())
            .and_then(|text| ssh.parse(text).map_err(|e| e.to_string()));
        let launch = signing
            .launch_request_tag()
            .ok_or_else(|| "signing certificate has no launch request".to_string())
            .and_then(|tag| verified_launch_request(tag, config.root_keys(), now));

        Self {
            target,
            target_host: qualify_host(&target.host, config.host_suffix()),
            signing,
            csr_signed,
            csr_signature: &csr.signature,
            host_cert,
            launch,
            ssh,
            now,
        }
    }

    fn run(&self) -> Result<(), AuthError> {
        for (check, link) in GRANTING_LINKS {
            link(self).map_err(|reason| AuthError::bad_csr(check, reason))?;
        }
        Ok(())
    }

    fn host_cert(&self) -> Result<&SshCertificate, String> {
        self.host_cert.as_ref().map_err(Clone::clone)
    }

    fn launch(&self) -> Result<&LaunchRequest, String> {
        self.launch.as_ref().map_err(Clone::clone)
    }
}

fn csr_signed_by_granting_key(chain: &GrantingChain<'_>) -> Result<(), String> {
    if chain.signing.verify(chain.csr_signed, chain.csr_signature) {
        Ok(())
    } else {
        Err("csr signature does not verify with the signing certificate key".into())
    }
}

fn embeds_host_cert(chain: &GrantingChain<'_>) -> Result<(), String> {
    if chain.host_cert()?.kind == SshCertKind::Host {
        Ok(())
    } else {
        Err("embedded ssh certificate is not a host certificate".into())
    }
}

fn host_cert_trusted_for_target(chain: &GrantingChain<'_>) -> Result<(), String> {
    chain
        .ssh
        .verify_host(chain.host_cert()?, &chain.target_host, chain.now)
        .map_err(|e| e.to_string())
}

fn granting_signed_by_host_key(chain: &GrantingChain<'_>) -> Result<(), String> {
    let bytes = chain.signing.signing_bytes().map_err(|e| e.to_string())?;
    if chain.host_cert()?.public_key.verify(&bytes, &chain.signing.signature) {
        Ok(())
    } else {
        Err("signing certificate was not signed by the ssh host key".into())
    }
}

fn launch_request_verifies(chain: &GrantingChain<'_>) -> Result<(), String> {
    chain.launch().map(drop)
}

fn launch_names_target_host(chain: &GrantingChain<'_>) -> Result<(), String> {
    let launch = chain.launch()?;
    let principal = chain.host_cert()?.primary_principal().unwrap_or_default();
    if launch.hostname.eq_ignore_ascii_case(&chain.target.host)
        && launch.hostname.eq_ignore_ascii_case(principal)
    {
        Ok(())
    } else {
        Err(format!(
            "launch hostname '{}' does not match target host '{}' and principal '{}'",
            launch.hostname, chain.target.host, principal
        ))
    }
}

fn launch_names_target_service(chain: &GrantingChain<'_>) -> Result<(), String> {
    let launch = chain.launch()?;
    if launch.svc_id == chain.target.entity_name {
        Ok(())
    } else {
        Err(format!(
            "launch service '{}' does not match target entity '{}'",
            launch.svc_id, chain.target.entity_name
        ))
    }
}

fn verified_launch_request(
    tag: &str,
    roots: &[VerifyingKey],
    now: i64,
) -> Result<LaunchRequest, String> {
    let signed = CertificateSignature::decode(tag).map_err(|e| e.to_string())?;
    verify_launch(&signed, roots, now)
}

fn verify_launch(
    signed: &CertificateSignature,
    roots: &[VerifyingKey],
    now: i64,
) -> Result<LaunchRequest, String> {
    signed
        .verify(roots, now, CERTIFICATE_SKEW_SECS)
        .map_err(|e| e.to_string())?;
    signed.launch_request().map_err(|e| e.to_string())
}

/// Authorizes and signs certificate signing requests.
pub struct CsrEngine {
    config: Arc<PolicyConfig>,
    store: Arc<dyn EntityStore>,
    ssh: Arc<dyn SshTrust>,
    clock: Arc<dyn Clock>,
    issuer: Issuer,
}

impl CsrEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        config: Arc<PolicyConfig>,
        store: Arc<dyn EntityStore>,
        ssh: Arc<dyn SshTrust>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let issuer = Issuer::new(config.authority().clone());
        Self {
            config,
            store,
            ssh,
            clock,
            issuer,
        }
    }

    /// Authorizes the request, applies the certificate time rules and signs
    /// the certificate. The response echoes the request with the signed
    /// certificate in place and `result` set to `OK`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedCsr` if the certificate cannot be read, `BadCsr`
    /// if authorization fails, `OutsideTimeWindow` or `Expired` for time
    /// violations and `Lookup` if the entity store fails.
    pub fn sign(
        &self,
        csr: &CertificateSigningRequest,
    ) -> Result<CertificateSigningRequest, AuthError> {
        self.sign_inner(csr).inspect_err(|e| {
            warn!(
                result = e.result_code(),
                status_code = e.status(),
                error = %e,
                "certificate signing request rejected"
            );
        })
    }

    fn sign_inner(
        &self,
        csr: &CertificateSigningRequest,
    ) -> Result<CertificateSigningRequest, AuthError> {
        let mut target = csr.certificate_to_sign().map_err(|e| AuthError::MalformedCsr {
            reason: e.to_string(),
        })?;
        let path = self.authorize(csr, &target)?;

        let now = self.clock.now();
        let window = self.config.csr_window();
        let valid_before = unix_i64(target.valid_before);
        let capped = window.apply(unix_i64(target.valid_after), valid_before, now)?;
        if capped != valid_before {
            target.valid_before = u64::try_from(capped).unwrap_or_default();
        }

        let signed = self.issuer.sign_certificate(target)?;
        let mut response = csr.clone();
        response.certificate = signed.to_bytes().map_err(|e| AuthError::MalformedCsr {
            reason: e.to_string(),
        })?;
        response.result = result::OK.to_string();

        info!(
            entity = %signed.entity_name,
            host = %signed.host,
            serial = signed.serial,
            path = %path,
            valid_before = signed.valid_before,
            "certificate issued"
        );
        Ok(response)
    }

    /// Decides whether `target` may be signed on the strength of the
    /// material in `csr`, and returns the path that authorized it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BadCsr` naming the failing check, or
    /// `AuthError::Lookup` if the entity store fails.
    pub fn authorize(
        &self,
        csr: &CertificateSigningRequest,
        target: &Certificate,
    ) -> Result<CsrPath, AuthError> {
        let signed = csr
            .signing_bytes()
            .map_err(|e| AuthError::bad_csr(ChainCheck::CsrSignature, e))?;
        let now = self.clock.now();

        let signing = csr
            .signing_certificate()
            .map_err(|e| AuthError::bad_csr(ChainCheck::SigningCertificate, e))?;
        if let Some(signing) = signing {
            if signing.is_cert_granting() {
                GrantingChain::new(csr, &signed, target, &signing, &self.config, &*self.ssh, now)
                    .run()?;
                return Ok(CsrPath::CertGranting);
            }
            signing
                .check(self.config.root_keys(), now, CERTIFICATE_SKEW_SECS)
                .map_err(|e| AuthError::bad_csr(ChainCheck::SigningCertificate, e))?;
            return refresh(csr, &signed, target, &signing);
        }

        let ussh = csr
            .ussh_certificate()
            .map_err(|e| AuthError::bad_csr(ChainCheck::SshCertificate, e))?;
        if let Some(text) = ussh {
            let cert = self
                .ssh
                .parse(text)
                .map_err(|e| AuthError::bad_csr(ChainCheck::SshCertificate, e))?;
            return match cert.kind {
                SshCertKind::Host => self.ssh_host(csr, &signed, target, &cert, now),
                SshCertKind::User => self.ssh_user(csr, &signed, target, &cert, now),
            };
        }

        self.enrolled(csr, &signed, target)
    }

    fn ssh_host(
        &self,
        csr: &CertificateSigningRequest,
        signed: &[u8],
        target: &Certificate,
        cert: &SshCertificate,
        now: i64,
    ) -> Result<CsrPath, AuthError> {
        let host = qualify_host(&target.host, self.config.host_suffix());
        self.ssh
            .verify_host(cert, &host, now)
            .map_err(|e| AuthError::bad_csr(ChainCheck::SshTrusted, e))?;
        check_csr_signature(&cert.public_key, signed, csr)?;

        if !matches!(
            target.entity_type,
            EntityType::Service | EntityType::Host | EntityType::Invalid
        ) {
            return Err(AuthError::bad_csr(
                ChainCheck::EntityType,
                format!(
                    "{:?} certificates may not be issued over an ssh host certificate",
                    target.entity_type
                ),
            ));
        }
        if is_personnel_name(&target.entity_name) || is_group_reference(&target.entity_name) {
            return Err(AuthError::bad_csr(
                ChainCheck::EntityShape,
                format!("'{}' is not a service or host name", target.entity_name),
            ));
        }

        let launch = csr
            .launch_request()
            .map_err(|e| AuthError::bad_csr(ChainCheck::LaunchPrincipal, e))?;
        match launch {
            None => warn!(
                entity = %target.entity_name,
                host = %host,
                "no launch request included"
            ),
            Some(signed_launch) => {
                let launch = verify_launch(&signed_launch, self.config.root_keys(), now)
                    .map_err(|e| AuthError::bad_csr(ChainCheck::LaunchPrincipal, e))?;
                let principal = cert.primary_principal().unwrap_or_default();
                if principal.is_empty() || !launch.hostname.eq_ignore_ascii_case(principal) {
                    return Err(AuthError::bad_csr(
                        ChainCheck::LaunchPrincipal,
                        format!(
                            "launch hostname '{}' is not the ssh principal '{principal}'",
                            launch.hostname
                        ),
                    ));
                }
            }
        }
        Ok(CsrPath::SshHost)
    }

    fn ssh_user(
        &self,
        csr: &CertificateSigningRequest,
        signed: &[u8],
        target: &Certificate,
        cert: &SshCertificate,
        now: i64,
    ) -> Result<CsrPath, AuthError> {
        let local = personnel_local_part(&target.entity_name).ok_or_else(|| {
            AuthError::bad_csr(
                ChainCheck::PersonnelName,
                format!("'{}' is not a personnel entity name", target.entity_name),
            )
        })?;
        self.ssh
            .verify_user(cert, local, now)
            .map_err(|e| AuthError::bad_csr(ChainCheck::SshTrusted, e))?;
        check_csr_signature(&cert.public_key, signed, csr)?;
        Ok(CsrPath::SshUser)
    }

    fn enrolled(
        &self,
        csr: &CertificateSigningRequest,
        signed: &[u8],
        target: &Certificate,
    ) -> Result<CsrPath, AuthError> {
        let entity = self.store.get(&target.entity_name).map_err(|e| {
            if e.is_not_found() {
                AuthError::bad_csr(ChainCheck::EnrolledKey, e)
            } else {
                AuthError::lookup(e)
            }
        })?;
        let key = entity
            .verifying_key()
            .map_err(|e| AuthError::bad_csr(ChainCheck::EnrolledKey, e))?;
        check_csr_signature(&key, signed, csr)?;
        Ok(CsrPath::Enrolled)
    }
}

fn check_csr_signature(
    key: &VerifyingKey,
    signed: &[u8],
    csr: &CertificateSigningRequest,
) -> Result<(), AuthError> {
    if key.verify(signed, &csr.signature) {
        Ok(())
    } else {
        Err(AuthError::bad_csr(
            ChainCheck::CsrSignature,
            "csr signature does not verify",
        ))
    }
}

fn refresh(
    csr: &CertificateSigningRequest,
    signed: &[u8],
    target: &Certificate,
    signing: &Certificate,
) -> Result<CsrPath, AuthError> {
    if !signing.verify(signed, &csr.signature) {
        return Err(AuthError::bad_csr(
            ChainCheck::CsrSignature,
            "csr signature does not verify with the signing certificate key",
        ));
    }
    if target.entity_name != signing.entity_name {
        return Err(AuthError::bad_csr(
            ChainCheck::RefreshEntity,
            format!("'{}' may not refresh '{}'", signing.entity_name, target.entity_name),
        ));
    }
    if target.host != signing.host {
        return Err(AuthError::bad_csr(
            ChainCheck::RefreshHost,
            format!("host changed from '{}' to '{}'", signing.host, target.host),
        ));
    }
    if target.tags != signing.tags {
        warn!(
            entity = %target.entity_name,
            host = %target.host,
            "refreshed certificate tags differ from the signing certificate"
        );
    }
    Ok(CsrPath::Refresh)
}
