//! Registry mapping type tags to votable stores.

use std::{collections::HashMap, sync::Arc};

use sharehub_common::{AppError, AppResult};

use super::votable::{ImpactPolicy, VotableStore};

/// A registered votable type: its store and impact policy.
#[derive(Clone)]
pub struct VotableRegistration {
    /// Aggregate access for the type.
    pub store: Arc<dyn VotableStore>,
    /// Accepted impacts for the type.
    pub policy: ImpactPolicy,
}

/// Immutable type-tag lookup, populated once at startup.
#[derive(Clone, Default)]
pub struct VotableRegistry {
    entries: Arc<HashMap<String, VotableRegistration>>,
}

impl VotableRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> VotableRegistryBuilder {
        VotableRegistryBuilder::default()
    }

    /// Look up a type tag.
    pub fn get(&self, type_tag: &str) -> AppResult<&VotableRegistration> {
        self.entries
            .get(type_tag)
            .ok_or_else(|| AppError::UnknownTargetType(type_tag.to_string()))
    }

    /// Registered type tags, sorted.
    #[must_use]
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// Builder for [`VotableRegistry`].
#[derive(Default)]
pub struct VotableRegistryBuilder {
    entries: HashMap<String, VotableRegistration>,
}

impl VotableRegistryBuilder {
    /// Register a store under its type tag.
    ///
    /// Registering the same tag twice is a wiring error.
    pub fn register(
        mut self,
        store: Arc<dyn VotableStore>,
        policy: ImpactPolicy,
    ) -> AppResult<Self> {
        let tag = store.type_tag().to_string();
        if self.entries.contains_key(&tag) {
            return Err(AppError::Config(format!(
                "Votable type '{tag}' registered twice"
            )));
        }

        tracing::debug!(type_tag = %tag, "Registered votable type");
        self.entries
            .insert(tag, VotableRegistration { store, policy });
        Ok(self)
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> VotableRegistry {
        VotableRegistry {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryVotableStore;

    #[test]
    fn test_lookup_registered_and_unknown() {
        let registry = VotableRegistry::builder()
            .register(
                Arc::new(InMemoryVotableStore::new("upload")),
                ImpactPolicy::unit(),
            )
            .unwrap()
            .build();

        assert!(registry.get("upload").is_ok());
        assert!(matches!(
            registry.get("tag"),
            Err(AppError::UnknownTargetType(tag)) if tag == "tag"
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = VotableRegistry::builder()
            .register(
                Arc::new(InMemoryVotableStore::new("comment")),
                ImpactPolicy::unit(),
            )
            .unwrap()
            .register(
                Arc::new(InMemoryVotableStore::new("comment")),
                ImpactPolicy::any(),
            );

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_type_tags_sorted() {
        let registry = VotableRegistry::builder()
            .register(Arc::new(InMemoryVotableStore::new("upload")), ImpactPolicy::any())
            .unwrap()
            .register(Arc::new(InMemoryVotableStore::new("comment")), ImpactPolicy::any())
            .unwrap()
            .build();

        assert_eq!(registry.type_tags(), vec!["comment", "upload"]);
    }
}
