//! Property-based tests for the time rules and claim computation.

use proptest::prelude::*;

use wonka::{EVERYONE, is_group_reference};
use wonka_directory::MemoryGroupDirectory;
use wonkamaster::{
    AuthError, CallerClass, TimeWindow, cap_expiry, compute_approved_claims, within_clock_skew,
};

mod strategies {
    use super::*;

    pub fn now() -> impl Strategy<Value = i64> {
        1_000_000i64..4_000_000_000
    }

    pub fn item() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("EVERYONE".to_string()),
            Just("knoxgroup".to_string()),
            Just("svc-a".to_string()),
            Just("alice@uber.com".to_string()),
            prop::string::string_regex("(AD:)?[a-z][a-z0-9-]{0,8}").expect("valid regex"),
        ]
    }

    pub fn requested() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(item(), 1..8)
    }

    pub fn class() -> impl Strategy<Value = CallerClass> {
        prop_oneof![
            Just(CallerClass::User),
            Just(CallerClass::Service),
            Just(CallerClass::Host),
            Just(CallerClass::Invalid),
        ]
    }

    pub fn requester() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("svc-a".to_string()),
            Just("knox".to_string()),
            Just("alice@uber.com".to_string()),
            Just("h1.prod.uber.internal".to_string()),
        ]
    }
}

fn directory() -> MemoryGroupDirectory {
    MemoryGroupDirectory::new()
        .with_member("alice", "x-men")
        .with_member("alice", "ops")
}

proptest! {
    #[test]
    fn create_time_accepted_iff_within_skew(now in strategies::now(), offset in -500i64..500) {
        for window in [TimeWindow::csr(), TimeWindow::claim()] {
            let accepted = window.check_created(now + offset, now).is_ok();
            prop_assert_eq!(accepted, offset.abs() <= window.skew());
            prop_assert_eq!(accepted, within_clock_skew(now + offset, now, window.skew()));
        }
    }

    #[test]
    fn long_lifetimes_are_truncated_not_rejected(
        now in strategies::now(),
        extra in 1i64..10_000_000,
    ) {
        for window in [TimeWindow::csr(), TimeWindow::claim()] {
            let etime = now + window.max_lifetime() + extra;
            let issued = window.apply(now, etime, now).unwrap();
            prop_assert_eq!(issued, now + window.max_lifetime());
            prop_assert_eq!(issued, cap_expiry(etime, now, window.max_lifetime()));
        }
    }

    #[test]
    fn approved_claims_never_exceed_request(
        requested in strategies::requested(),
        requester in strategies::requester(),
        class in strategies::class(),
    ) {
        let csv = requested.join(",");
        match compute_approved_claims(&csv, &requester, class, &directory()) {
            Ok(approved) => {
                for item in approved.split(',') {
                    let allowed = item == EVERYONE
                        || item == requester
                        || requested.iter().any(|r| r == item);
                    prop_assert!(allowed, "{} was not requested", item);
                }
                let mut sorted: Vec<&str> = approved.split(',').collect();
                sorted.sort_unstable();
                prop_assert_eq!(sorted.join(","), approved.clone());
            }
            Err(e) => {
                let is_no_access = matches!(e, AuthError::NoAccess { .. });
                prop_assert!(is_no_access);
            }
        }
    }

    #[test]
    fn hosts_never_get_groups_or_legacy_claims(
        requested in strategies::requested(),
        requester in strategies::requester(),
    ) {
        let csv = requested.join(",");
        let outcome = compute_approved_claims(&csv, &requester, CallerClass::Host, &directory());
        if let Ok(approved) = outcome {
            for item in approved.split(',') {
                prop_assert!(item == EVERYONE || item == requester);
                prop_assert!(!is_group_reference(item) || item == requester);
            }
        }
    }
}
