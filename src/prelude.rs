//! Convenient re-exports for glob imports.
//!
//! ```rust
//! use wonka::prelude::*;
//!
//! let key = SigningKey::generate();
//! let entity = Entity::new("svc-a", &key.verifying_key());
//! assert_eq!(entity.verifying_key().unwrap(), key.verifying_key());
//! ```
//!
//! Result code strings stay under [`crate::constants::result`].

pub use crate::{
    // Model types
    Certificate, CertificateSignature, CertificateSigningRequest, Claim, ClaimRequest,
    ClaimResponse, Entity, EntityType, GenericResponse, LaunchRequest, ResolveRequest,
    // Keys
    SigningKey, VerifyingKey, verify_any,
    // Errors
    CertificateError, ModelError,
    // Name shapes
    is_group_reference, is_personnel_name, personnel_local_part, qualify_host,
    // Constants
    EVERYONE, NULL_ENTITY, SIGN_EVERYTHING_VERSION,
};
