//! Collaborator traits consumed by the authorization engine.

use wonka::Entity;

use crate::{DirectoryError, StoreError};

/// Canonical store of enrolled entities, keyed by case-insensitive name.
///
/// Implementations must be safe to call from many in-flight requests at
/// once. The engine never holds a lock across a call and never retries.
pub trait EntityStore: Send + Sync {
    /// Looks up an entity by name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the name is not enrolled and
    /// `StoreError::Unavailable` if the store cannot answer.
    fn get(&self, name: &str) -> Result<Entity, StoreError>;
}

/// Resolves personnel group membership.
pub trait GroupDirectory: Send + Sync {
    /// Returns true if `person` is a member of `group`.
    ///
    /// `group` is the bare group name, without any `AD:` prefix.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` if the directory cannot answer.
    fn is_member_of(&self, person: &str, group: &str) -> Result<bool, DirectoryError>;
}
