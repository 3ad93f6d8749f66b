//! In-memory entity store and group directory.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};
use wonka::{Entity, canonical_name};

use crate::{DirectoryError, EntityStore, GroupDirectory, StoreConfig, StoreError};

/// In-memory [`EntityStore`].
///
/// Names are folded to lowercase, so lookups are case-insensitive. Keys are
/// immutable once enrolled except in the configured sample namespace.
///
/// # Thread Safety
///
/// Uses `RwLock` for interior mutability, allowing concurrent reads
/// and exclusive writes.
///
/// # Examples
///
/// ```
/// use wonka::{Entity, SigningKey};
/// use wonka_directory::{EntityStore, MemoryEntityStore};
///
/// let store = MemoryEntityStore::with_defaults();
/// let key = SigningKey::generate().verifying_key();
/// store.put(Entity::new("svc-a", &key)).unwrap();
///
/// assert_eq!(store.get("SVC-A").unwrap().verifying_key().unwrap(), key);
/// ```
pub struct MemoryEntityStore {
    entities: RwLock<HashMap<String, Entity>>,
    available: AtomicBool,
    config: StoreConfig,
}

impl MemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            config,
        }
    }

    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::unavailable("store marked offline"))
        }
    }

    /// Marks the store reachable or unreachable. While unreachable every
    /// call fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Enrolls or updates an entity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ImmutableKey` if the update changes an enrolled
    /// key outside the sample namespace, `CapacityExceeded` if the store is
    /// full, or `Unavailable`.
    pub fn put(&self, entity: Entity) -> Result<(), StoreError> {
        self.check_available()?;
        let name = canonical_name(&entity.entity_name);
        let mut entities = self
            .entities
            .write()
            .map_err(|_| StoreError::unavailable("entity lock poisoned"))?;

        match entities.get(&name) {
            Some(existing) => {
                let rekey = existing.ecc_public_key != entity.ecc_public_key
                    || existing.public_key != entity.public_key;
                if rekey && !self.config.allow_rekey && !self.config.is_sample(&name) {
                    warn!(entity = %name, "refusing to replace enrolled key");
                    return Err(StoreError::immutable_key(name));
                }
            }
            None if entities.len() >= self.config.max_entities => {
                return Err(StoreError::CapacityExceeded {
                    max: self.config.max_entities,
                });
            }
            None => {}
        }

        debug!(entity = %name, "entity stored");
        entities.insert(name, entity);
        Ok(())
    }

    /// Removes an entity, returning it if it was enrolled.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the store is offline.
    pub fn remove(&self, name: &str) -> Result<Option<Entity>, StoreError> {
        self.check_available()?;
        let mut entities = self
            .entities
            .write()
            .map_err(|_| StoreError::unavailable("entity lock poisoned"))?;
        Ok(entities.remove(&canonical_name(name)))
    }

    /// Returns the number of enrolled entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().map_or(0, |entities| entities.len())
    }

    /// Returns true if nothing is enrolled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEntityStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EntityStore for MemoryEntityStore {
    fn get(&self, name: &str) -> Result<Entity, StoreError> {
        self.check_available()?;
        let entities = self
            .entities
            .read()
            .map_err(|_| StoreError::unavailable("entity lock poisoned"))?;
        entities
            .get(&canonical_name(name))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }
}

/// In-memory [`GroupDirectory`].
///
/// Person and group names are compared case-insensitively. A person may be
/// recorded by full name or by local part; both forms match a lookup by
/// full name.
#[derive(Default)]
pub struct MemoryGroupDirectory {
    members: RwLock<HashMap<String, HashSet<String>>>,
    offline: AtomicBool,
}

impl MemoryGroupDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `person` belongs to `group`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` if the lock is poisoned.
    pub fn add_member(&self, person: &str, group: &str) -> Result<(), DirectoryError> {
        let mut members = self
            .members
            .write()
            .map_err(|_| DirectoryError::unavailable("group lock poisoned"))?;
        members
            .entry(canonical_name(group))
            .or_default()
            .insert(canonical_name(person));
        Ok(())
    }

    /// Builder form of [`add_member`](Self::add_member) for fixtures.
    #[must_use]
    pub fn with_member(self, person: &str, group: &str) -> Self {
        if let Ok(mut members) = self.members.write() {
            members
                .entry(canonical_name(group))
                .or_default()
                .insert(canonical_name(person));
        }
        self
    }

    /// Marks the directory reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::Release);
    }
}

impl GroupDirectory for MemoryGroupDirectory {
    fn is_member_of(&self, person: &str, group: &str) -> Result<bool, DirectoryError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(DirectoryError::unavailable("directory marked offline"));
        }
        let members = self
            .members
            .read()
            .map_err(|_| DirectoryError::unavailable("group lock poisoned"))?;

        let Some(group) = members.get(&canonical_name(group.trim())) else {
            return Ok(false);
        };
        let person = canonical_name(person);
        let local = wonka::personnel_local_part(&person);
        Ok(group.contains(&person) || local.is_some_and(|l| group.contains(l)))
    }
}

#[cfg(test)]
mod tests {
    use wonka::SigningKey;

    use super::*;

    fn entity(name: &str) -> Entity {
        Entity::new(name, &SigningKey::generate().verifying_key())
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let store = MemoryEntityStore::with_defaults();
        store.put(entity("Svc-A")).unwrap();

        assert!(store.get("svc-a").is_ok());
        assert!(store.get("SVC-A").is_ok());
        assert!(store.get("svc-b").unwrap_err().is_not_found());
    }

    #[test]
    fn enrolled_key_is_immutable() {
        let store = MemoryEntityStore::with_defaults();
        store.put(entity("svc-a")).unwrap();

        let err = store.put(entity("svc-a")).unwrap_err();
        assert_eq!(err, StoreError::immutable_key("svc-a"));
    }

    #[test]
    fn non_key_fields_may_change() {
        let store = MemoryEntityStore::with_defaults();
        let original = entity("svc-a");
        store.put(original.clone()).unwrap();

        store.put(original.with_requires("AD:ops")).unwrap();
        assert_eq!(store.get("svc-a").unwrap().requires, "AD:ops");
    }

    #[test]
    fn sample_namespace_may_rekey() {
        let store = MemoryEntityStore::with_defaults();
        store.put(entity("sample-svc")).unwrap();
        store.put(entity("sample-svc")).unwrap();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let store = MemoryEntityStore::new(StoreConfig::new().with_max_entities(1));
        store.put(entity("svc-a")).unwrap();

        assert_eq!(
            store.put(entity("svc-b")).unwrap_err(),
            StoreError::CapacityExceeded { max: 1 }
        );
    }

    #[test]
    fn offline_store_is_unavailable() {
        let store = MemoryEntityStore::with_defaults();
        store.put(entity("svc-a")).unwrap();
        store.set_available(false);

        assert!(matches!(store.get("svc-a"), Err(StoreError::Unavailable { .. })));
        store.set_available(true);
        assert!(store.get("svc-a").is_ok());
    }

    #[test]
    fn remove_entity() {
        let store = MemoryEntityStore::with_defaults();
        store.put(entity("svc-a")).unwrap();

        assert!(store.remove("SVC-A").unwrap().is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn membership_matches_full_name_or_local_part() {
        let directory = MemoryGroupDirectory::new()
            .with_member("alice", "x-men")
            .with_member("bob@uber.com", "ops");

        assert!(directory.is_member_of("alice@uber.com", "X-Men").unwrap());
        assert!(directory.is_member_of("bob@uber.com", "ops").unwrap());
        assert!(!directory.is_member_of("bob@uber.com", "x-men").unwrap());
        assert!(!directory.is_member_of("alice@uber.com", "unknown").unwrap());
    }

    #[test]
    fn offline_directory_errors() {
        let directory = MemoryGroupDirectory::new();
        directory.set_available(false);
        assert!(directory.is_member_of("alice@uber.com", "x-men").is_err());
    }
}
