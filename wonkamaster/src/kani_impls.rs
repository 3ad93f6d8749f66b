//! Kani proof harnesses for the time rules and approval scopes.
//!
//! # Usage
//!
//! ```bash
//! cargo kani -p wonkamaster --features kani
//! ```
//!
//! This module is only compiled when using Kani (`#[cfg(kani)]`).

use crate::auth::CallerClass;
use crate::claims::ApprovalScope;
use crate::time_policy::{cap_expiry, check_not_expired, within_clock_skew};

impl kani::Arbitrary for CallerClass {
    fn any() -> Self {
        match kani::any::<u8>() % 4 {
            0 => Self::User,
            1 => Self::Service,
            2 => Self::Host,
            _ => Self::Invalid,
        }
    }
}

#[kani::proof]
fn proof_skew_window_is_inclusive() {
    let now: i64 = kani::any();
    let skew: i64 = kani::any();
    kani::assume(skew >= 0 && skew <= 3_600);
    kani::assume(now > i64::MIN + 3_600 && now < i64::MAX - 3_600);

    assert!(within_clock_skew(now - skew, now, skew));
    assert!(within_clock_skew(now + skew, now, skew));
    assert!(!within_clock_skew(now - skew - 1, now, skew));
    assert!(!within_clock_skew(now + skew + 1, now, skew));
}

#[kani::proof]
fn proof_cap_never_exceeds_lifetime() {
    let etime: i64 = kani::any();
    let now: i64 = kani::any();
    let max: i64 = kani::any();
    kani::assume(max >= 0);

    let capped = cap_expiry(etime, now, max);
    assert!(capped <= etime);
    assert!(capped <= now.saturating_add(max));
    if etime <= now.saturating_add(max) {
        assert_eq!(capped, etime);
    }
}

#[kani::proof]
fn proof_capping_keeps_unexpired_requests_valid() {
    let etime: i64 = kani::any();
    let now: i64 = kani::any();
    let skew: i64 = kani::any();
    let max: i64 = kani::any();
    kani::assume(skew >= 0 && max >= 0);

    if check_not_expired(etime, now, skew) {
        assert!(check_not_expired(cap_expiry(etime, now, max), now, skew));
    }
}

#[kani::proof]
fn proof_only_users_get_groups() {
    let class: CallerClass = kani::any();
    let scope = ApprovalScope::for_class(class);
    assert_eq!(scope == ApprovalScope::Groups, class == CallerClass::User);
    if matches!(class, CallerClass::Host | CallerClass::Invalid) {
        assert_eq!(scope, ApprovalScope::SelfOnly);
    }
}
