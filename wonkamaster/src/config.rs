//! Immutable policy configuration for the engines.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wonka::{SigningKey, VerifyingKey, canonical_name, unix_i64};

use crate::error::ConfigError;
use crate::ssh::OpenSshTrust;
use crate::time_policy::{RESOLVE_DEFAULT_LIFETIME_SECS, TimeWindow};

/// Domain appended to unqualified host names before host-CA checks.
pub const DEFAULT_HOST_SUFFIX: &str = ".prod.uber.internal";

/// A time-boxed grace period for expired certificates during a root-key
/// rotation.
///
/// An expired certificate is still accepted for claim requests while
/// `now <= enforce_until`, provided its `valid_after` lies strictly between
/// `signed_after` and `signed_before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertAuthOverride {
    /// Certificates issued after this instant qualify.
    pub signed_after: DateTime<Utc>,
    /// Certificates issued before this instant qualify.
    pub signed_before: DateTime<Utc>,
    /// The grace period ends at this instant.
    pub enforce_until: DateTime<Utc>,
}

impl CertAuthOverride {
    /// Creates an override window.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvertedOverride` if `signed_after` is not
    /// before `signed_before`.
    pub fn new(
        signed_after: DateTime<Utc>,
        signed_before: DateTime<Utc>,
        enforce_until: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let grant = Self {
            signed_after,
            signed_before,
            enforce_until,
        };
        grant.validate()?;
        Ok(grant)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.signed_after >= self.signed_before {
            return Err(ConfigError::InvertedOverride);
        }
        Ok(())
    }

    /// Returns true if an expired certificate issued at `valid_after` may
    /// still be used at `now`.
    #[must_use]
    pub fn permits(&self, valid_after: u64, now: i64) -> bool {
        let signed = unix_i64(valid_after);
        now <= self.enforce_until.timestamp()
            && signed > self.signed_after.timestamp()
            && signed < self.signed_before.timestamp()
    }
}

/// Read-only policy shared by every engine.
///
/// Built once at startup and shared by `Arc`.
///
/// ```
/// use wonka::SigningKey;
/// use wonkamaster::PolicyConfig;
///
/// let authority = SigningKey::generate();
/// let config = PolicyConfig::new(authority.clone())
///     .with_impersonator("gateway")
///     .with_host_suffix(".dc1.example");
///
/// assert!(config.root_keys().contains(&authority.verifying_key()));
/// assert!(config.is_impersonator("GATEWAY"));
/// ```
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    authority: SigningKey,
    root_keys: Vec<VerifyingKey>,
    impersonators: BTreeSet<String>,
    host_suffix: String,
    cert_override: Option<CertAuthOverride>,
    csr_window: TimeWindow,
    claim_window: TimeWindow,
    resolve_window: TimeWindow,
    resolve_default_lifetime: i64,
}

impl PolicyConfig {
    /// Creates a policy signed by `authority`, whose public key is trusted
    /// as a root.
    #[must_use]
    pub fn new(authority: SigningKey) -> Self {
        let root = authority.verifying_key();
        Self {
            authority,
            root_keys: vec![root],
            impersonators: BTreeSet::new(),
            host_suffix: DEFAULT_HOST_SUFFIX.to_string(),
            cert_override: None,
            csr_window: TimeWindow::csr(),
            claim_window: TimeWindow::claim(),
            resolve_window: TimeWindow::resolve(),
            resolve_default_lifetime: RESOLVE_DEFAULT_LIFETIME_SECS,
        }
    }

    /// Trusts an additional root key, e.g. the previous key during rotation.
    #[must_use]
    pub fn with_root_key(mut self, key: VerifyingKey) -> Self {
        if !self.root_keys.contains(&key) {
            self.root_keys.push(key);
        }
        self
    }

    /// Allows `name` to impersonate other entities.
    #[must_use]
    pub fn with_impersonator(mut self, name: &str) -> Self {
        self.impersonators.insert(canonical_name(name));
        self
    }

    /// Sets the suffix appended to unqualified host names.
    #[must_use]
    pub fn with_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.host_suffix = suffix.into();
        self
    }

    /// Installs a certificate grace override.
    #[must_use]
    pub const fn with_cert_override(mut self, grant: CertAuthOverride) -> Self {
        self.cert_override = Some(grant);
        self
    }

    /// Replaces the CSR time rules.
    #[must_use]
    pub const fn with_csr_window(mut self, window: TimeWindow) -> Self {
        self.csr_window = window;
        self
    }

    /// Replaces the claim time rules.
    #[must_use]
    pub const fn with_claim_window(mut self, window: TimeWindow) -> Self {
        self.claim_window = window;
        self
    }

    /// Sets the lifetime of resolved claims whose request names none.
    #[must_use]
    pub const fn with_resolve_default_lifetime(mut self, secs: i64) -> Self {
        self.resolve_default_lifetime = secs;
        self
    }

    /// Returns the authority signing key.
    #[must_use]
    pub const fn authority(&self) -> &SigningKey {
        &self.authority
    }

    /// Returns the trusted root keys.
    #[must_use]
    pub fn root_keys(&self) -> &[VerifyingKey] {
        &self.root_keys
    }

    /// Returns true if `name` may impersonate other entities.
    #[must_use]
    pub fn is_impersonator(&self, name: &str) -> bool {
        self.impersonators.contains(&canonical_name(name))
    }

    /// Returns the host suffix.
    #[must_use]
    pub fn host_suffix(&self) -> &str {
        &self.host_suffix
    }

    /// Returns the grace override, if any.
    #[must_use]
    pub const fn cert_override(&self) -> Option<&CertAuthOverride> {
        self.cert_override.as_ref()
    }

    /// Returns the CSR time rules.
    #[must_use]
    pub const fn csr_window(&self) -> TimeWindow {
        self.csr_window
    }

    /// Returns the claim time rules.
    #[must_use]
    pub const fn claim_window(&self) -> TimeWindow {
        self.claim_window
    }

    /// Returns the resolve time rules.
    #[must_use]
    pub const fn resolve_window(&self) -> TimeWindow {
        self.resolve_window
    }

    /// Returns the default resolved-claim lifetime in seconds.
    #[must_use]
    pub const fn resolve_default_lifetime(&self) -> i64 {
        self.resolve_default_lifetime
    }
}

/// File-backed policy, read once at startup.
///
/// ```
/// use wonka::SigningKey;
/// use wonkamaster::PolicyFile;
///
/// let file = PolicyFile::from_json(br#"{
///     "impersonators": ["gateway"],
///     "claim_skew_secs": 30
/// }"#).unwrap();
///
/// let config = file.into_config(SigningKey::generate()).unwrap();
/// assert!(config.is_impersonator("gateway"));
/// assert_eq!(config.claim_window().skew(), 30);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFile {
    /// Extra trusted root keys, hex.
    #[serde(default)]
    pub root_keys: Vec<String>,
    /// SSH user CA keys, OpenSSH public key lines.
    #[serde(default)]
    pub ssh_user_ca_keys: Vec<String>,
    /// SSH host CA keys, OpenSSH public key lines.
    #[serde(default)]
    pub ssh_host_ca_keys: Vec<String>,
    /// Entities allowed to impersonate.
    #[serde(default)]
    pub impersonators: Vec<String>,
    /// Host suffix; defaults to [`DEFAULT_HOST_SUFFIX`].
    #[serde(default)]
    pub host_suffix: Option<String>,
    /// Certificate grace override.
    #[serde(default)]
    pub cert_auth_override: Option<CertAuthOverride>,
    /// CSR skew override, seconds.
    #[serde(default)]
    pub csr_skew_secs: Option<i64>,
    /// Claim skew override, seconds.
    #[serde(default)]
    pub claim_skew_secs: Option<i64>,
    /// Certificate lifetime cap override, seconds.
    #[serde(default)]
    pub max_certificate_lifetime_secs: Option<i64>,
    /// Claim lifetime cap override, seconds.
    #[serde(default)]
    pub max_claim_lifetime_secs: Option<i64>,
}

impl PolicyFile {
    /// Parses a JSON policy file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Builds the engine policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` for a malformed root key and
    /// `InvertedOverride` for a bad grace window.
    pub fn into_config(&self, authority: SigningKey) -> Result<PolicyConfig, ConfigError> {
        let mut config = PolicyConfig::new(authority);

        for hex in &self.root_keys {
            let key = VerifyingKey::from_hex(hex).map_err(|e| ConfigError::InvalidKey {
                what: "root key",
                reason: e.to_string(),
            })?;
            config = config.with_root_key(key);
        }
        for name in &self.impersonators {
            config = config.with_impersonator(name);
        }
        if let Some(suffix) = &self.host_suffix {
            config = config.with_host_suffix(suffix.clone());
        }
        if let Some(grant) = self.cert_auth_override {
            grant.validate()?;
            config = config.with_cert_override(grant);
        }

        let mut csr = TimeWindow::csr();
        if let Some(skew) = self.csr_skew_secs {
            csr = csr.with_skew(skew);
        }
        if let Some(max) = self.max_certificate_lifetime_secs {
            csr = csr.with_max_lifetime(max);
        }
        let mut claim = TimeWindow::claim();
        if let Some(skew) = self.claim_skew_secs {
            claim = claim.with_skew(skew);
        }
        if let Some(max) = self.max_claim_lifetime_secs {
            claim = claim.with_max_lifetime(max);
        }
        config = config.with_csr_window(csr).with_claim_window(claim);
        config.resolve_window = TimeWindow::resolve()
            .with_skew(claim.skew())
            .with_max_lifetime(claim.max_lifetime());

        debug!(
            root_keys = config.root_keys.len(),
            impersonators = config.impersonators.len(),
            grace_override = config.cert_override.is_some(),
            "policy loaded"
        );
        Ok(config)
    }

    /// Builds the OpenSSH trust adapter from the configured CA keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` if a CA line does not parse.
    pub fn ssh_trust(&self) -> Result<OpenSshTrust, ConfigError> {
        OpenSshTrust::from_openssh_keys(&self.ssh_user_ca_keys, &self.ssh_host_ca_keys)
            .map_err(|e| ConfigError::InvalidKey {
                what: "ssh ca key",
                reason: e.to_string(),
            })
    }
}
