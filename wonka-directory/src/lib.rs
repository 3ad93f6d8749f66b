//! Entity store and group directory boundaries for the wonka trust service.
//!
//! The authorization engine consumes two external collaborators:
//!
//! - **Entity store**: [`EntityStore`], enrolled entities keyed by
//!   case-insensitive name.
//! - **Group directory**: [`GroupDirectory`], personnel group membership.
//!
//! Both traits are synchronous and `Send + Sync`. Production embedders
//! back them with a database and a directory service; this crate ships
//! in-memory implementations for tests and small deployments.
//!
//! # Quick Start
//!
//! ```rust
//! use wonka::{Entity, SigningKey};
//! use wonka_directory::{
//!     EntityStore, GroupDirectory, MemoryEntityStore, MemoryGroupDirectory,
//! };
//!
//! let store = MemoryEntityStore::with_defaults();
//! let key = SigningKey::generate().verifying_key();
//! store.put(Entity::new("svc-a", &key).with_requires("AD:ops")).unwrap();
//!
//! let directory = MemoryGroupDirectory::new().with_member("alice@uber.com", "ops");
//!
//! let dest = store.get("svc-a").unwrap();
//! assert_eq!(dest.required_claims().collect::<Vec<_>>(), vec!["AD:ops"]);
//! assert!(directory.is_member_of("alice@uber.com", "ops").unwrap());
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod memory;
mod traits;

pub use config::StoreConfig;
pub use error::{DirectoryError, StoreError};
pub use memory::{MemoryEntityStore, MemoryGroupDirectory};
pub use traits::{EntityStore, GroupDirectory};
