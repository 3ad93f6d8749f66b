//! Error types for the entity store and group directory.

use thiserror::Error;

/// Errors returned by an [`EntityStore`](crate::EntityStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entity is enrolled under the name.
    #[error("entity '{name}' is not enrolled; enroll it before requesting certificates or claims")]
    NotFound {
        /// The name that was looked up
        name: String,
    },
    /// The backing store could not be reached.
    #[error("entity store unavailable: {reason}")]
    Unavailable {
        /// Description of the failure
        reason: String,
    },
    /// An update tried to replace an enrolled key.
    #[error("public key of entity '{name}' is immutable once enrolled")]
    ImmutableKey {
        /// The entity whose key was protected
        name: String,
    },
    /// The store is at its configured size limit.
    #[error("entity store holds the maximum of {max} entities")]
    CapacityExceeded {
        /// Configured limit
        max: usize,
    },
}

impl StoreError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an `Unavailable` error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates an `ImmutableKey` error.
    #[must_use]
    pub fn immutable_key(name: impl Into<String>) -> Self {
        Self::ImmutableKey { name: name.into() }
    }

    /// Returns true if the entity is simply not enrolled.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors returned by a [`GroupDirectory`](crate::GroupDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The directory could not be queried.
    #[error("group directory unavailable: {reason}")]
    Unavailable {
        /// Description of the failure
        reason: String,
    },
}

impl DirectoryError {
    /// Creates an `Unavailable` error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error_display() {
        let err = StoreError::not_found("svc-a");
        assert!(err.to_string().contains("not enrolled"));
        assert!(err.is_not_found());
    }

    #[test]
    fn unavailable_is_not_not_found() {
        let err = StoreError::unavailable("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn immutable_key_error_display() {
        let err = StoreError::immutable_key("svc-a");
        assert!(err.to_string().contains("immutable"));
    }

    #[test]
    fn directory_error_display() {
        let err = DirectoryError::unavailable("ldap timeout");
        assert_eq!(err.to_string(), "group directory unavailable: ldap timeout");
    }
}
