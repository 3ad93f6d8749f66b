//! Approved-claim computation.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use wonka::{EVERYONE, NULL_ENTITY, is_group_reference};
use wonka_directory::GroupDirectory;

use crate::auth::CallerClass;
use crate::error::AuthError;

/// The one legacy group still granted to services by name.
pub const LEGACY_GROUP: &str = "knoxgroup";

/// Services that may claim [`LEGACY_GROUP`]. Closed; do not extend.
pub const LEGACY_GROUP_MEMBERS: [&str; 6] = [
    "hadoop-gw",
    "knox",
    "querybuilder",
    "michelangelo",
    "queryrunner",
    "michelangelo-rest",
];

/// Which requested items a caller class may have approved beyond the
/// wildcard and its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalScope {
    /// Group references the directory confirms.
    Groups,
    /// The legacy service table.
    LegacyServices,
    /// Nothing else.
    SelfOnly,
}

impl ApprovalScope {
    /// Returns the scope for a caller class. Hosts get nothing beyond the
    /// wildcard and their own name.
    #[must_use]
    pub const fn for_class(class: CallerClass) -> Self {
        match class {
            CallerClass::User => Self::Groups,
            CallerClass::Service => Self::LegacyServices,
            CallerClass::Host | CallerClass::Invalid => Self::SelfOnly,
        }
    }
}

/// Returns true if `claim` is granted to the service `requester` by the
/// legacy table. The wildcard is always granted.
#[must_use]
pub fn is_legacy_grant(claim: &str, requester: &str) -> bool {
    if claim.eq_ignore_ascii_case(EVERYONE) {
        return true;
    }
    claim.eq_ignore_ascii_case(LEGACY_GROUP)
        && LEGACY_GROUP_MEMBERS
            .iter()
            .any(|member| member.eq_ignore_ascii_case(requester))
}

/// Strips the `AD:` prefix from a group reference.
fn group_name(item: &str) -> &str {
    item.trim_start().get(3..).unwrap_or_default().trim()
}

/// Computes the approved subset of `requested` (comma-separated) for
/// `requester`, returned sorted and comma-joined. The wildcard and the
/// requester's own name are always included on success.
///
/// ```
/// use wonka_directory::MemoryGroupDirectory;
/// use wonkamaster::{CallerClass, compute_approved_claims};
///
/// let directory = MemoryGroupDirectory::new().with_member("alice", "x-men");
/// let approved = compute_approved_claims(
///     "EVERYONE,AD:x-men,AD:avengers",
///     "alice@uber.com",
///     CallerClass::User,
///     &directory,
/// )
/// .unwrap();
/// assert_eq!(approved, "AD:x-men,EVERYONE,alice@uber.com");
/// ```
///
/// # Errors
///
/// Returns `AuthError::NoAccess` if the universal-deny name is requested or
/// nothing is approved, and `AuthError::Lookup` if the directory fails.
pub fn compute_approved_claims(
    requested: &str,
    requester: &str,
    class: CallerClass,
    directory: &dyn GroupDirectory,
) -> Result<String, AuthError> {
    let items: Vec<&str> = requested
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    if items.iter().any(|item| item.eq_ignore_ascii_case(NULL_ENTITY)) {
        return Err(AuthError::no_access(
            requester,
            format!("{NULL_ENTITY} may not be requested"),
        ));
    }

    let mut approved = BTreeSet::new();
    if items.iter().any(|item| item.eq_ignore_ascii_case(EVERYONE)) {
        approved.insert(EVERYONE.to_string());
    }
    if items.iter().any(|item| item.eq_ignore_ascii_case(requester)) {
        approved.insert(requester.to_string());
    }

    match ApprovalScope::for_class(class) {
        ApprovalScope::Groups => {
            for item in items.iter().filter(|item| is_group_reference(item)) {
                if directory
                    .is_member_of(requester, group_name(item))
                    .map_err(AuthError::lookup)?
                {
                    approved.insert((*item).to_string());
                }
            }
        }
        ApprovalScope::LegacyServices => {
            for item in &items {
                if is_group_reference(item) {
                    warn!(entity = requester, claim = *item, "service requested a group claim");
                } else if is_legacy_grant(item, requester) || item.eq_ignore_ascii_case(requester) {
                    approved.insert((*item).to_string());
                }
            }
        }
        ApprovalScope::SelfOnly => {}
    }

    if approved.is_empty() {
        return Err(AuthError::no_access(
            requester,
            format!("none of '{requested}' may be granted to a {class} caller"),
        ));
    }

    approved.insert(EVERYONE.to_string());
    approved.insert(requester.to_string());
    let joined = approved.into_iter().collect::<Vec<_>>().join(",");
    debug!(entity = requester, class = %class, approved_claims = %joined, "claims approved");
    Ok(joined)
}
