//! Certificate-signing and claim authorization engine for the wonka trust
//! service.
//!
//! Two engines sit on top of the model in [`wonka`]:
//!
//! - [`CsrEngine`] decides whether the certificate in a signing request may
//!   be signed, along one of several trust chains, and signs it.
//! - [`ClaimEngine`] authenticates claim and resolve requests and issues
//!   claim tokens holding the capabilities the caller is entitled to.
//!
//! Both are stateless apart from an immutable [`PolicyConfig`] and the
//! collaborators they are built with: an entity store and group directory
//! from [`wonka_directory`], an [`SshTrust`] and a [`Clock`].
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use wonka::{ClaimRequest, Entity, SigningKey};
//! use wonka_directory::{MemoryEntityStore, MemoryGroupDirectory};
//! use wonkamaster::{
//!     ClaimEngine, ClaimProtocol, ClaimVerifier, Clock, OpenSshTrust, PolicyConfig, SystemClock,
//! };
//!
//! let authority = SigningKey::generate();
//! let store = Arc::new(MemoryEntityStore::with_defaults());
//! let engine = ClaimEngine::new(
//!     Arc::new(PolicyConfig::new(authority.clone())),
//!     store.clone(),
//!     Arc::new(MemoryGroupDirectory::new()),
//!     Arc::new(OpenSshTrust::new()),
//!     Arc::new(SystemClock),
//! );
//!
//! let key = SigningKey::generate();
//! store.put(Entity::new("svc-a", &key.verifying_key())).unwrap();
//!
//! let now = SystemClock.now();
//! let mut req = ClaimRequest::new("svc-a", "EVERYONE", "svc-b", now, now + 600);
//! req.sign(&key).unwrap();
//!
//! let response = engine.claim(&req, ClaimProtocol::V2).unwrap();
//! let claim = ClaimVerifier::new(vec![authority.verifying_key()])
//!     .verify(&response.token, Some(&key), now)
//!     .unwrap();
//! assert_eq!(claim.claims, vec!["EVERYONE", "svc-a"]);
//! ```
//!
//! # Errors
//!
//! Every failure is an [`AuthError`]. Clients only see its
//! [`result_code`](AuthError::result_code) and
//! [`status`](AuthError::status); [`respond`] renders both.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod auth;
mod claim_engine;
mod claims;
mod clock;
mod config;
mod csr;
mod error;
mod issuer;
#[cfg(kani)]
mod kani_impls;
pub mod prelude;
mod response;
mod seal;
mod ssh;
#[cfg(test)]
mod test_support;
mod time_policy;
mod verifier;

pub use auth::{
    AuthContext, AuthKind, AuthMethod, Caller, CallerClass, authenticate_claim_request,
    authenticate_resolve_request, check_presented_certificate,
};
pub use claim_engine::{ClaimEngine, RESOLVE_BACKDATE_SECS};
pub use claims::{
    ApprovalScope, LEGACY_GROUP, LEGACY_GROUP_MEMBERS, compute_approved_claims, is_legacy_grant,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CertAuthOverride, DEFAULT_HOST_SUFFIX, PolicyConfig, PolicyFile};
pub use csr::{CsrEngine, CsrPath};
pub use error::{AuthError, ChainCheck, ConfigError, RequestKind, SshError, TokenError};
pub use issuer::{ClaimProtocol, Issuer, TOKEN_ISSUER};
pub use response::{decode_failure, respond};
pub use seal::{open, seal};
pub use ssh::{OpenSshTrust, SshCertKind, SshCertificate, SshTrust, parse_openssh_certificate};
pub use time_policy::{
    CLAIM_SKEW_SECS, CSR_SKEW_SECS, MAX_CERTIFICATE_LIFETIME_SECS, MAX_CLAIM_LIFETIME_SECS,
    RESOLVE_DEFAULT_LIFETIME_SECS, TimeWindow, cap_expiry, check_not_expired, within_clock_skew,
};
pub use verifier::ClaimVerifier;
