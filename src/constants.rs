//! Wire constants shared by clients and the issuing authority.

/// Universal wildcard capability. Every authenticated caller may hold it.
pub const EVERYONE: &str = "EVERYONE";

/// Universal-deny sentinel. A request naming it is rejected outright.
pub const NULL_ENTITY: &str = "NULLENTITY";

/// Claim-request version whose signature covers the whole JSON body.
pub const SIGN_EVERYTHING_VERSION: &str = "2.0.0";

/// Claim type written into every issued claim token.
pub const CLAIM_TYPE: &str = "WONKAC";

/// Certificate tag carrying an embedded SSH host certificate.
pub const TAG_USSH_CERT: &str = "USSHCertificate";

/// Certificate tag carrying an embedded, signed launch request.
pub const TAG_LAUNCH_REQUEST: &str = "LaunchRequest";

/// Certificate tag carrying the scheduler task id.
pub const TAG_TASK_ID: &str = "TaskID";

/// Certificate tag carrying the runtime environment.
pub const TAG_RUNTIME: &str = "Runtime";

/// Signature type string for raw Ed25519 signatures made with an SSH key.
pub const SSH_ED25519_SIGTYPE: &str = "ssh-ed25519";

/// Signature type string for Ed25519 entity signatures.
pub const ED25519_SIGTYPE: &str = "Ed25519";

/// Clock skew tolerated when checking a certificate's validity window, in seconds.
pub const CERTIFICATE_SKEW_SECS: i64 = 60;

/// Reserved name prefix whose enrolled keys may be replaced.
pub const SAMPLE_PREFIX: &str = "sample";

/// Machine-readable result strings returned beside every HTTP status.
pub mod result {
    /// Success.
    pub const OK: &str = "OK";
    /// The request body failed to decode.
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    /// Generic rejection.
    pub const REJECTED: &str = "REJECTED";
    /// The requesting entity is not enrolled.
    pub const ENTITY_UNKNOWN: &str = "ENTITY_UNKNOWN";
    /// A request signature did not verify.
    pub const VERIFY_ERROR: &str = "VERIFY_ERROR";
    /// The service failed internally.
    pub const INTERNAL_ERROR: &str = "WONKA_INTERNAL_ERROR";
    /// The request create time is outside the allowed clock skew.
    pub const OUTSIDE_TIME_WINDOW: &str = "ERROR_OUTSIDE_TIME_WINDOW";
    /// The claim request expire time has passed.
    pub const CLAIM_REQUEST_EXPIRED: &str = "CLAIM_REQUEST_EXPIRED";
    /// The caller authenticated but holds none of the requested claims.
    pub const CLAIM_NO_ACCESS: &str = "REJECTED_CLAIM_NO_ACCESS";
    /// The claim could not be signed or sealed.
    pub const CLAIM_SIGNING_ERROR: &str = "ERROR_SIGNING_CLAIM";
    /// The caller may not impersonate the named entity.
    pub const INVALID_IMPERSONATOR: &str = "REJECTED_INVALID_IMPERSONATOR";
    /// The entity store or group directory failed.
    pub const LOOKUP_SERVER_ERROR: &str = "LOOKUP_SERVER_ERROR";
    /// The certificate signing request was not authorized.
    pub const BAD_CSR: &str = "INVALID_CERTIFICATE_SIGNING_REQUEST";
    /// The certificate to sign has already expired.
    pub const CSR_EXPIRED: &str = "CERTIFICATE_SIGNING_REQUEST_EXPIRED";
}
