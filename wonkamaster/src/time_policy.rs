//! Clock-skew, expiry and lifetime rules shared by every endpoint.
//!
//! The free functions are pure so they can be checked exhaustively; the
//! [`TimeWindow`] wraps them with per-endpoint constants and typed errors.
//!
//! | Endpoint | Skew | Max lifetime |
//! |----------|------|--------------|
//! | CSR | 60 s | 20 h |
//! | Claim | 120 s | 24 h |
//! | Resolve | 120 s | 24 h |

use tracing::warn;

use crate::error::{AuthError, RequestKind};

/// Allowed skew for certificate signing requests, in seconds.
pub const CSR_SKEW_SECS: i64 = 60;

/// Allowed skew for claim and resolve requests, in seconds.
pub const CLAIM_SKEW_SECS: i64 = 120;

/// Longest certificate the authority signs, in seconds.
pub const MAX_CERTIFICATE_LIFETIME_SECS: i64 = 20 * 60 * 60;

/// Longest claim the authority issues, in seconds.
pub const MAX_CLAIM_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Lifetime of a resolved claim when the request names none, in seconds.
pub const RESOLVE_DEFAULT_LIFETIME_SECS: i64 = 2 * 60 * 60;

/// Returns true if `t` lies in `[now - skew, now + skew]`.
///
/// ```
/// use wonkamaster::within_clock_skew;
///
/// assert!(within_clock_skew(940, 1_000, 60));
/// assert!(within_clock_skew(1_060, 1_000, 60));
/// assert!(!within_clock_skew(1_061, 1_000, 60));
/// ```
#[must_use]
pub const fn within_clock_skew(t: i64, now: i64, skew: i64) -> bool {
    t >= now.saturating_sub(skew) && t <= now.saturating_add(skew)
}

/// Returns true unless `etime` is before `now - skew`.
#[must_use]
pub const fn check_not_expired(etime: i64, now: i64, skew: i64) -> bool {
    etime >= now.saturating_sub(skew)
}

/// Truncates `etime` to `now + max_lifetime`.
///
/// ```
/// use wonkamaster::cap_expiry;
///
/// assert_eq!(cap_expiry(5_000, 1_000, 3_600), 4_600);
/// assert_eq!(cap_expiry(2_000, 1_000, 3_600), 2_000);
/// ```
#[must_use]
pub const fn cap_expiry(etime: i64, now: i64, max_lifetime: i64) -> i64 {
    let cap = now.saturating_add(max_lifetime);
    if etime > cap { cap } else { etime }
}

/// Time rules for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    kind: RequestKind,
    skew: i64,
    max_lifetime: i64,
}

impl TimeWindow {
    /// Rules for certificate signing requests.
    #[must_use]
    pub const fn csr() -> Self {
        Self {
            kind: RequestKind::Csr,
            skew: CSR_SKEW_SECS,
            max_lifetime: MAX_CERTIFICATE_LIFETIME_SECS,
        }
    }

    /// Rules for claim requests.
    #[must_use]
    pub const fn claim() -> Self {
        Self {
            kind: RequestKind::Claim,
            skew: CLAIM_SKEW_SECS,
            max_lifetime: MAX_CLAIM_LIFETIME_SECS,
        }
    }

    /// Rules for resolve requests.
    #[must_use]
    pub const fn resolve() -> Self {
        Self {
            kind: RequestKind::Resolve,
            ..Self::claim()
        }
    }

    /// Overrides the skew.
    #[must_use]
    pub const fn with_skew(mut self, skew: i64) -> Self {
        self.skew = skew;
        self
    }

    /// Overrides the maximum lifetime.
    #[must_use]
    pub const fn with_max_lifetime(mut self, max_lifetime: i64) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    /// Returns the endpoint these rules apply to.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Returns the allowed skew in seconds.
    #[must_use]
    pub const fn skew(&self) -> i64 {
        self.skew
    }

    /// Returns the maximum lifetime in seconds.
    #[must_use]
    pub const fn max_lifetime(&self) -> i64 {
        self.max_lifetime
    }

    /// Checks a create time against the skew window.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OutsideTimeWindow`.
    pub fn check_created(&self, ctime: i64, now: i64) -> Result<(), AuthError> {
        if within_clock_skew(ctime, now, self.skew) {
            Ok(())
        } else {
            Err(AuthError::OutsideTimeWindow {
                kind: self.kind,
                ctime,
                skew: self.skew,
            })
        }
    }

    /// Checks that an expire time has not passed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired`.
    pub fn check_expiry(&self, etime: i64, now: i64) -> Result<(), AuthError> {
        if check_not_expired(etime, now, self.skew) {
            Ok(())
        } else {
            Err(AuthError::Expired {
                kind: self.kind,
                etime,
            })
        }
    }

    /// Truncates an expire time to the lifetime cap, logging when it does.
    #[must_use]
    pub fn cap(&self, etime: i64, now: i64) -> i64 {
        let capped = cap_expiry(etime, now, self.max_lifetime);
        if capped != etime {
            warn!(
                endpoint = %self.kind,
                requested_etime = etime,
                capped_etime = capped,
                "expire time truncated to maximum lifetime"
            );
        }
        capped
    }

    /// Runs all three rules and returns the capped expire time.
    ///
    /// # Errors
    ///
    /// Returns `OutsideTimeWindow` or `Expired`.
    pub fn apply(&self, ctime: i64, etime: i64, now: i64) -> Result<i64, AuthError> {
        self.check_created(ctime, now)?;
        self.check_expiry(etime, now)?;
        Ok(self.cap(etime, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn skew_boundaries_are_inclusive() {
        let window = TimeWindow::claim();
        assert!(window.check_created(NOW - 120, NOW).is_ok());
        assert!(window.check_created(NOW + 120, NOW).is_ok());
        assert!(window.check_created(NOW - 121, NOW).is_err());
        assert!(window.check_created(NOW + 121, NOW).is_err());
    }

    #[test]
    fn csr_window_is_tighter() {
        let err = TimeWindow::csr().check_created(NOW + 61, NOW).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(TimeWindow::claim().check_created(NOW + 61, NOW).is_ok());
    }

    #[test]
    fn expiry_allows_skew() {
        let window = TimeWindow::csr();
        assert!(window.check_expiry(NOW - 60, NOW).is_ok());
        assert!(matches!(
            window.check_expiry(NOW - 61, NOW),
            Err(AuthError::Expired { kind: RequestKind::Csr, .. })
        ));
    }

    #[test]
    fn lifetime_is_truncated_not_rejected() {
        let window = TimeWindow::csr();
        let etime = window.apply(NOW, NOW + 7 * 24 * 3600, NOW).unwrap();
        assert_eq!(etime, NOW + MAX_CERTIFICATE_LIFETIME_SECS);
    }

    #[test]
    fn short_lifetime_is_kept() {
        assert_eq!(TimeWindow::claim().apply(NOW, NOW + 60, NOW).unwrap(), NOW + 60);
    }

    #[test]
    fn overrides_apply() {
        let window = TimeWindow::claim().with_skew(5).with_max_lifetime(10);
        assert!(window.check_created(NOW + 6, NOW).is_err());
        assert_eq!(window.cap(NOW + 100, NOW), NOW + 10);
        assert_eq!(TimeWindow::resolve().kind(), RequestKind::Resolve);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        assert!(!within_clock_skew(i64::MIN, i64::MAX, i64::MAX));
        assert_eq!(cap_expiry(i64::MAX, i64::MAX, 10), i64::MAX);
        assert!(check_not_expired(i64::MIN, i64::MIN, 1));
    }
}
