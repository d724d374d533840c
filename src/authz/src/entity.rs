//! Entity types and attribute providers
//!
//! Identifiers carry a numeric entity type tag. The tag is resolved against a
//! closed set of [`EntityType`] variants, and each variant may have one
//! [`AttributeProvider`] registered in an [`EntityRegistry`]. Providers expose
//! the flat attribute map that conditions are evaluated against.

use crate::error::{AuthzError, BoxError, Result};
use crate::gid::Gid;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Flat attribute map exposed by an entity
pub type Attributes = HashMap<String, String>;

/// Known entity type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Identity,
    Organization,
    Membership,
    Session,
    Invitation,
    Document,
    Vendor,
    Risk,
    Audit,
    Framework,
}

impl EntityType {
    /// All known entity types
    pub const ALL: [EntityType; 10] = [
        EntityType::Identity,
        EntityType::Organization,
        EntityType::Membership,
        EntityType::Session,
        EntityType::Invitation,
        EntityType::Document,
        EntityType::Vendor,
        EntityType::Risk,
        EntityType::Audit,
        EntityType::Framework,
    ];

    /// Numeric tag embedded in identifiers
    pub const fn tag(self) -> u16 {
        match self {
            EntityType::Identity => 1,
            EntityType::Organization => 2,
            EntityType::Membership => 3,
            EntityType::Session => 4,
            EntityType::Invitation => 5,
            EntityType::Document => 6,
            EntityType::Vendor => 7,
            EntityType::Risk => 8,
            EntityType::Audit => 9,
            EntityType::Framework => 10,
        }
    }

    /// Resolve a numeric tag
    pub fn from_tag(tag: u16) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or(AuthzError::UnknownEntityType(tag))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Identity => "identity",
            EntityType::Organization => "organization",
            EntityType::Membership => "membership",
            EntityType::Session => "session",
            EntityType::Invitation => "invitation",
            EntityType::Document => "document",
            EntityType::Vendor => "vendor",
            EntityType::Risk => "risk",
            EntityType::Audit => "audit",
            EntityType::Framework => "framework",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability of an entity type to describe its instances as attributes
///
/// Implementations typically load the entity from storage and flatten the
/// fields that policies need (`organization_id`, owner ids, status, ...).
#[async_trait]
pub trait AttributeProvider: Send + Sync {
    /// Attributes of the entity identified by `id`
    async fn authorization_attributes(
        &self,
        id: &Gid,
    ) -> std::result::Result<Attributes, BoxError>;
}

/// Static registry of attribute providers keyed by entity type
#[derive(Clone, Default)]
pub struct EntityRegistry {
    providers: HashMap<EntityType, Arc<dyn AttributeProvider>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the provider for an entity type, replacing any previous one
    pub fn register(&mut self, entity_type: EntityType, provider: Arc<dyn AttributeProvider>) {
        self.providers.insert(entity_type, provider);
    }

    /// Builder form of [`EntityRegistry::register`]
    pub fn with_provider(
        mut self,
        entity_type: EntityType,
        provider: Arc<dyn AttributeProvider>,
    ) -> Self {
        self.register(entity_type, provider);
        self
    }

    /// Whether `entity_type` exposes attributes
    pub fn has_provider(&self, entity_type: EntityType) -> bool {
        self.providers.contains_key(&entity_type)
    }

    /// Provider for the entity type embedded in `id`
    ///
    /// `Ok(None)` when the type exposes no attributes; an error when the tag
    /// is not a known entity type.
    pub fn provider_for(&self, id: &Gid) -> Result<Option<Arc<dyn AttributeProvider>>> {
        let entity_type = id.entity_type()?;
        Ok(self.providers.get(&entity_type).cloned())
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// In-memory attribute provider
pub struct InMemoryAttributeProvider {
    entities: RwLock<HashMap<Gid, Attributes>>,
}

impl InMemoryAttributeProvider {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Store the attributes of an entity
    pub async fn insert(&self, id: Gid, attributes: Attributes) {
        self.entities.write().await.insert(id, attributes);
    }
}

impl Default for InMemoryAttributeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributeProvider for InMemoryAttributeProvider {
    async fn authorization_attributes(
        &self,
        id: &Gid,
    ) -> std::result::Result<Attributes, BoxError> {
        self.entities
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| format!("entity {} not found", id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gid::TenantId;

    #[test]
    fn test_tags_are_unique_and_round_trip() {
        for entity_type in EntityType::ALL {
            assert_eq!(EntityType::from_tag(entity_type.tag()).unwrap(), entity_type);
        }
        assert!(EntityType::from_tag(0).is_err());
    }

    #[tokio::test]
    async fn test_registry_without_provider() {
        let registry = EntityRegistry::new();
        let id = Gid::new(TenantId::new_random(), EntityType::Vendor);

        assert!(registry.provider_for(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_type() {
        let provider = Arc::new(InMemoryAttributeProvider::new());
        let tenant = TenantId::new_random();
        let doc = Gid::new(tenant, EntityType::Document);
        provider
            .insert(
                doc,
                Attributes::from([("status".to_string(), "draft".to_string())]),
            )
            .await;

        let registry = EntityRegistry::new().with_provider(EntityType::Document, provider);
        assert!(registry.has_provider(EntityType::Document));
        assert!(!registry.has_provider(EntityType::Risk));

        let provider = registry.provider_for(&doc).unwrap().unwrap();
        let attrs = provider.authorization_attributes(&doc).await.unwrap();
        assert_eq!(attrs.get("status").map(String::as_str), Some("draft"));

        let missing = Gid::new(tenant, EntityType::Document);
        assert!(provider.authorization_attributes(&missing).await.is_err());
    }
}
