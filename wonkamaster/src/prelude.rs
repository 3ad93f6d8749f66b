//! Convenient re-exports for glob imports.
//!
//! ```rust
//! use wonkamaster::prelude::*;
//!
//! let clock = FixedClock::new(1_000);
//! assert!(within_clock_skew(1_100, clock.now(), CLAIM_SKEW_SECS));
//! ```

pub use crate::{
    // Engines
    ClaimEngine, CsrEngine, CsrPath,
    // Policy
    CertAuthOverride, PolicyConfig, PolicyFile, TimeWindow,
    // Collaborators
    Clock, FixedClock, OpenSshTrust, SshTrust, SystemClock,
    // Tokens
    ClaimProtocol, ClaimVerifier, Issuer,
    // Errors
    AuthError, ChainCheck, TokenError,
    // Helpers
    CLAIM_SKEW_SECS, CallerClass, compute_approved_claims, respond, within_clock_skew,
};
