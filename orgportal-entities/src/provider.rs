use std::sync::Arc;

use orgportal_data::{DataError, Entity, EntityStore, FieldValue, MappingRegistry, StorageDriver};

/// A typed facade over one [`EntityStore`]. Providers only build fixed
/// queries; every backend concern stays in the store and its driver.
pub trait EntityProvider: Sized + Send + Sync + 'static {
    type Entity: Entity;

    fn from_store(store: EntityStore<Self::Entity>) -> Self;

    fn store(&self) -> &EntityStore<Self::Entity>;

    fn initialize(
        registry: &MappingRegistry,
        driver: Arc<dyn StorageDriver>,
        table: Option<&str>,
    ) -> Result<Self, DataError> {
        EntityStore::initialize_with_table(registry, driver, table).map(Self::from_store)
    }
}

/// Text form of projected values, skipping nulls.
pub(crate) fn strings(values: Vec<FieldValue>) -> Vec<String> {
    values.into_iter().filter_map(|v| v.as_text()).collect()
}

/// Implements [`EntityProvider`] and the point operations shared by every
/// provider.
macro_rules! provider {
    ($provider:ident, $entity:ty) => {
        #[derive(Debug, Clone)]
        pub struct $provider {
            store: ::orgportal_data::EntityStore<$entity>,
        }

        impl $crate::provider::EntityProvider for $provider {
            type Entity = $entity;

            fn from_store(store: ::orgportal_data::EntityStore<$entity>) -> Self {
                Self { store }
            }

            fn store(&self) -> &::orgportal_data::EntityStore<$entity> {
                &self.store
            }
        }

        impl $provider {
            pub async fn get(&self, id: &str) -> Result<$entity, ::orgportal_data::DataError> {
                self.store.get_by_id(id).await
            }

            pub async fn find(&self, id: &str) -> Result<Option<$entity>, ::orgportal_data::DataError> {
                self.store.find_by_id(id).await
            }

            pub async fn create(&self, entity: &$entity) -> Result<String, ::orgportal_data::DataError> {
                self.store.create(entity).await
            }

            pub async fn update(&self, entity: &$entity) -> Result<(), ::orgportal_data::DataError> {
                self.store.update(entity).await
            }

            pub async fn delete(&self, entity: &$entity) -> Result<(), ::orgportal_data::DataError> {
                self.store.delete(entity).await
            }
        }
    };
}

pub(crate) use provider;
