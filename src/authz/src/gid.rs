//! Global identifiers
//!
//! Every entity is addressed by a [`Gid`]: an opaque 24-byte value rendered as
//! unpadded URL-safe base64. The bytes embed the owning tenant and the entity
//! type tag, which is what resource patterns and the entity registry key on.
//!
//! ```text
//! [ tenant id: 8 ][ entity type: 2 ][ created at ms: 8 ][ random: 6 ]
//! ```

use crate::entity::EntityType;
use crate::error::{AuthzError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TENANT_LEN: usize = 8;
const GID_LEN: usize = 24;

/// Tenant identifier embedded in every [`Gid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId([u8; TENANT_LEN]);

impl TenantId {
    /// Create a tenant id from raw bytes
    pub const fn from_bytes(bytes: [u8; TENANT_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a random tenant id
    pub fn new_random() -> Self {
        Self(rand::random())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; TENANT_LEN] {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for TenantId {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| AuthzError::InvalidInput(format!("invalid tenant id {:?}: {}", s, e)))?;
        let bytes: [u8; TENANT_LEN] = bytes.try_into().map_err(|_| {
            AuthzError::InvalidInput(format!("invalid tenant id {:?}: wrong length", s))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for TenantId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Global identifier carrying tenant and entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gid([u8; GID_LEN]);

impl Gid {
    /// Mint a new identifier for an entity of `entity_type` owned by `tenant`
    pub fn new(tenant: TenantId, entity_type: EntityType) -> Self {
        let created_at = chrono::Utc::now().timestamp_millis();
        let random: [u8; 6] = rand::random();

        let mut bytes = [0u8; GID_LEN];
        bytes[..8].copy_from_slice(tenant.as_bytes());
        bytes[8..10].copy_from_slice(&entity_type.tag().to_be_bytes());
        bytes[10..18].copy_from_slice(&created_at.to_be_bytes());
        bytes[18..].copy_from_slice(&random);
        Self(bytes)
    }

    /// Owning tenant
    pub fn tenant_id(&self) -> TenantId {
        let mut tenant = [0u8; TENANT_LEN];
        tenant.copy_from_slice(&self.0[..8]);
        TenantId(tenant)
    }

    /// Raw entity type tag
    pub fn entity_tag(&self) -> u16 {
        u16::from_be_bytes([self.0[8], self.0[9]])
    }

    /// Entity type, if the tag is a known one
    pub fn entity_type(&self) -> Result<EntityType> {
        EntityType::from_tag(self.entity_tag())
    }

    /// Creation time in milliseconds since the epoch
    pub fn created_at_millis(&self) -> i64 {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&self.0[10..18]);
        i64::from_be_bytes(ts)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for Gid {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| AuthzError::InvalidInput(format!("invalid gid {:?}: {}", s, e)))?;
        let bytes: [u8; GID_LEN] = bytes
            .try_into()
            .map_err(|_| AuthzError::InvalidInput(format!("invalid gid {:?}: wrong length", s)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Gid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Gid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
