//! Identity, certificate and claim model for the wonka trust service.
//!
//! This crate holds the wire types shared by clients and the issuing
//! authority, the rules for what bytes each type signs, and small helpers
//! for the name shapes the authorization engine branches on.
//!
//! # Overview
//!
//! - [`Entity`]: an enrolled principal and its authoritative public key.
//! - [`Certificate`]: a short-lived signed identity assertion.
//! - [`CertificateSigningRequest`]: a request to have a certificate signed.
//! - [`ClaimRequest`] and [`ResolveRequest`]: requests for capability claims.
//! - [`Claim`]: an issued, signed capability grant.
//!
//! # Quick Start
//!
//! ```rust
//! use wonka::{Certificate, CertificateSigningRequest, EntityType, SigningKey};
//!
//! let holder = SigningKey::generate();
//! let cert = Certificate::new(
//!     "svc-a", EntityType::Service, "h1", &holder.verifying_key(), 1_000, 2_000,
//! );
//!
//! let csr = CertificateSigningRequest::sign_with_enrolled_key(&cert, &holder).unwrap();
//! assert_eq!(csr.certificate_to_sign().unwrap().entity_name, "svc-a");
//! ```
//!
//! # Signed bytes
//!
//! Every signature covers `serde_json::to_vec` of the value with its
//! signature fields cleared. Older claim requests sign a legacy string; see
//! [`ClaimRequest::signing_bytes`].

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod certificate;
mod claim;
pub mod constants;
mod csr;
mod encoding;
mod entity;
mod error;
#[cfg(kani)]
mod kani_impls;
mod keys;
mod names;
pub mod prelude;

pub use certificate::{Certificate, CertificateSignature, LaunchRequest, unix_i64};
pub use claim::{Claim, ClaimRequest, ClaimResponse, GenericResponse, ResolveRequest};
pub use constants::{
    CERTIFICATE_SKEW_SECS, CLAIM_TYPE, ED25519_SIGTYPE, EVERYONE, NULL_ENTITY, SAMPLE_PREFIX,
    SIGN_EVERYTHING_VERSION, SSH_ED25519_SIGTYPE, TAG_LAUNCH_REQUEST, TAG_RUNTIME, TAG_TASK_ID,
    TAG_USSH_CERT,
};
pub use csr::CertificateSigningRequest;
pub use encoding::{base64_bytes, from_base64, to_base64};
pub use entity::{Entity, EntityType};
pub use error::{CertificateError, ModelError};
pub use keys::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, SigningKey, VerifyingKey, verify_any};
pub use names::{
    canonical_name, is_group_reference, is_personnel_name, personnel_local_part, qualify_host,
};
