//! Fixtures shared by the engine unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use wonka::SigningKey;

use crate::error::SshError;
use crate::ssh::{SshCertKind, SshCertificate, SshTrust};

/// SSH trust keyed by opaque certificate text. Registered certificates
/// parse; trusted ones verify for their principals.
#[derive(Default)]
pub(crate) struct FakeSsh {
    certs: Mutex<HashMap<String, (SshCertificate, bool)>>,
}

impl FakeSsh {
    fn register(
        &self,
        kind: SshCertKind,
        key: &SigningKey,
        principal: &str,
        trusted: bool,
    ) -> String {
        let mut certs = self.certs.lock().unwrap();
        let text = format!("fake-ssh-{}-{}", certs.len(), principal);
        let cert = SshCertificate {
            kind,
            principals: vec![principal.to_string()],
            key_id: principal.to_string(),
            serial: certs.len() as u64,
            valid_after: 0,
            valid_before: u64::MAX,
            public_key: key.verifying_key(),
            openssh: text.clone(),
        };
        certs.insert(text.clone(), (cert, trusted));
        text
    }

    pub(crate) fn host(&self, key: &SigningKey, principal: &str) -> String {
        self.register(SshCertKind::Host, key, principal, true)
    }

    pub(crate) fn untrusted_host(&self, key: &SigningKey, principal: &str) -> String {
        self.register(SshCertKind::Host, key, principal, false)
    }

    pub(crate) fn user(&self, key: &SigningKey, principal: &str) -> String {
        self.register(SshCertKind::User, key, principal, true)
    }

    fn check(
        &self,
        cert: &SshCertificate,
        kind: SshCertKind,
        matches: bool,
    ) -> Result<(), SshError> {
        let certs = self.certs.lock().unwrap();
        let trusted = certs.get(&cert.openssh).is_some_and(|(_, trusted)| *trusted);
        if cert.kind != kind {
            return Err(SshError::WrongType {
                expected: if kind == SshCertKind::Host { "host" } else { "user" },
            });
        }
        if !trusted {
            return Err(SshError::Untrusted {
                reason: "not signed by a trusted ca".into(),
            });
        }
        if !matches {
            return Err(SshError::Principal {
                principal: cert.principals.join(","),
            });
        }
        Ok(())
    }
}

impl SshTrust for FakeSsh {
    fn parse(&self, text: &str) -> Result<SshCertificate, SshError> {
        self.certs
            .lock()
            .unwrap()
            .get(text)
            .map(|(cert, _)| cert.clone())
            .ok_or_else(|| SshError::Parse {
                reason: format!("unknown certificate '{text}'"),
            })
    }

    fn verify_host(&self, cert: &SshCertificate, host: &str, _now: i64) -> Result<(), SshError> {
        self.check(cert, SshCertKind::Host, cert.has_principal_ignore_case(host))
    }

    fn verify_user(
        &self,
        cert: &SshCertificate,
        principal: &str,
        _now: i64,
    ) -> Result<(), SshError> {
        let matches = cert.principals.iter().any(|p| p == principal);
        self.check(cert, SshCertKind::User, matches)
    }
}
