//! Name-shape rules for entities, capabilities and hosts.
//!
//! Personnel names contain `@`; service and host names never do. Group
//! references carry a case-insensitive `ad:` prefix, ignoring leading
//! whitespace.

/// Returns true if `name` names a person (it contains `@`).
#[must_use]
pub fn is_personnel_name(name: &str) -> bool {
    name.contains('@')
}

/// Returns true if `claim` references a directory group (`AD:` prefix).
///
/// ```
/// use wonka::is_group_reference;
///
/// assert!(is_group_reference("AD:x-men"));
/// assert!(is_group_reference("  ad:x-men"));
/// assert!(!is_group_reference("x-men"));
/// ```
#[must_use]
pub fn is_group_reference(claim: &str) -> bool {
    claim
        .trim_start()
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ad:"))
}

/// Splits a personnel name into its local part.
///
/// Returns `None` unless the name has exactly one `@` separating two parts.
///
/// ```
/// use wonka::personnel_local_part;
///
/// assert_eq!(personnel_local_part("alice@uber.com"), Some("alice"));
/// assert_eq!(personnel_local_part("alice"), None);
/// assert_eq!(personnel_local_part("a@b@c"), None);
/// ```
#[must_use]
pub fn personnel_local_part(name: &str) -> Option<&str> {
    let mut parts = name.split('@');
    let local = parts.next()?;
    parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(local)
}

/// Appends `suffix` to a host name that has no domain separator.
///
/// ```
/// use wonka::qualify_host;
///
/// assert_eq!(qualify_host("h1", ".prod.example"), "h1.prod.example");
/// assert_eq!(qualify_host("h1.dc1.example", ".prod.example"), "h1.dc1.example");
/// ```
#[must_use]
pub fn qualify_host(host: &str, suffix: &str) -> String {
    if host.contains('.') {
        host.to_string()
    } else {
        format!("{host}{suffix}")
    }
}

/// Canonical store key for an entity name (names compare case-insensitively).
#[must_use]
pub fn canonical_name(name: &str) -> String {
    name.to_lowercase()
}
