//! Enrolled entities and entity types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;
use crate::keys::VerifyingKey;

/// What kind of principal a certificate was issued to.
///
/// Encoded on the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityType {
    /// Unknown or unset. Certificates of this type are still accepted on
    /// the SSH host path because older daemons leave the field empty.
    #[default]
    Invalid,
    /// A service, e.g. `rt-api`.
    Service,
    /// A person, e.g. `alice@uber.com`.
    User,
    /// A machine, e.g. `h1.prod.uber.internal`.
    Host,
}

impl EntityType {
    /// Returns the wire integer.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Invalid => 0,
            Self::Service => 1,
            Self::User => 2,
            Self::Host => 3,
        }
    }

    /// Maps a wire integer back to a type. Unknown values become `Invalid`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Service,
            2 => Self::User,
            3 => Self::Host,
            _ => Self::Invalid,
        }
    }

    /// Returns true for `Invalid`.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Invalid => "Invalid",
            Self::Service => "Service",
            Self::User => "User",
            Self::Host => "Host",
        };
        f.write_str(name)
    }
}

impl Serialize for EntityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Ok(u8::try_from(value).map_or(Self::Invalid, Self::from_u8))
    }
}

/// A registered principal: service, host or person.
///
/// Read-only from the engine's perspective; enrollment owns the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Case-insensitive unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_name: String,
    /// Comma-separated capabilities a caller must hold to reach this entity.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requires: String,
    /// Legacy key text. Kept for compatibility, never used to verify.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
    /// Enrollment protocol version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Authoritative public key as lowercase hex.
    #[serde(rename = "ecc_key", default, skip_serializing_if = "String::is_empty")]
    pub ecc_public_key: String,
    /// SSH certificate presented at enrollment, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ussh_certificate: String,
    /// Enrollment create time, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ctime: i64,
    /// Enrollment expire time, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub etime: i64,
    /// Signature type of the enrollment signature.
    #[serde(rename = "entity_sigtype", default, skip_serializing_if = "String::is_empty")]
    pub sig_type: String,
    /// Enrollment signature.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_signature: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Entity {
    /// Creates an entity with a name and authoritative key.
    #[must_use]
    pub fn new(name: impl Into<String>, key: &VerifyingKey) -> Self {
        Self {
            entity_name: name.into(),
            ecc_public_key: key.to_hex(),
            ..Self::default()
        }
    }

    /// Sets the `requires` list.
    #[must_use]
    pub fn with_requires(mut self, requires: impl Into<String>) -> Self {
        self.requires = requires.into();
        self
    }

    /// Parses the authoritative key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidKey` if no key is enrolled or it is malformed.
    pub fn verifying_key(&self) -> Result<VerifyingKey, ModelError> {
        if self.ecc_public_key.is_empty() {
            return Err(ModelError::invalid_key(format!(
                "entity '{}' has no enrolled key",
                self.entity_name
            )));
        }
        VerifyingKey::from_hex(&self.ecc_public_key)
    }

    /// Returns the non-empty items of `requires`.
    pub fn required_claims(&self) -> impl Iterator<Item = &str> {
        self.requires
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningKey;

    #[test]
    fn entity_type_wire_values() {
        assert_eq!(serde_json::to_string(&EntityType::Host).unwrap(), "3");
        let t: EntityType = serde_json::from_str("1").unwrap();
        assert_eq!(t, EntityType::Service);
        let t: EntityType = serde_json::from_str("42").unwrap();
        assert_eq!(t, EntityType::Invalid);
        let t: EntityType = serde_json::from_str("-1").unwrap();
        assert_eq!(t, EntityType::Invalid);
    }

    #[test]
    fn entity_key_roundtrip() {
        let key = SigningKey::generate().verifying_key();
        let entity = Entity::new("svc-a", &key);
        assert_eq!(entity.verifying_key().unwrap(), key);
    }

    #[test]
    fn entity_without_key_errors() {
        let entity = Entity {
            entity_name: "svc-a".into(),
            ..Entity::default()
        };
        assert!(entity.verifying_key().is_err());
    }

    #[test]
    fn entity_json_uses_wire_names() {
        let key = SigningKey::generate().verifying_key();
        let entity = Entity::new("svc-a", &key).with_requires("AD:ops, EVERYONE");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["entity_name"], "svc-a");
        assert_eq!(json["ecc_key"], key.to_hex());
        assert!(json.get("ctime").is_none());
        assert_eq!(
            entity.required_claims().collect::<Vec<_>>(),
            vec!["AD:ops", "EVERYONE"]
        );
    }
}
