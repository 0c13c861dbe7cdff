//! # orgportal-entities — governance portal entities
//!
//! Each entity kind is a plain struct implementing
//! [`Entity`](orgportal_data::Entity) plus a provider that only builds
//! fixed queries:
//!
//! | Entity | Id | Provider |
//! |--------|----|----------|
//! | [`TeamSnapshot`] | `teamId` | [`TeamSnapshotProvider`] |
//! | [`RepositorySnapshot`] | `repositoryId` | [`RepositorySnapshotProvider`] |
//! | [`CollaboratorSnapshot`] | `uniqueId` | [`CollaboratorSnapshotProvider`] |
//! | [`TeamPermissionSnapshot`] | `uniqueId` | [`TeamPermissionSnapshotProvider`] |
//! | [`Annotation`] | `annotationId` | [`AnnotationProvider`] |
//! | [`AuditRecord`] | `recordId` | [`AuditRecordProvider`] |
//! | [`UserSettings`] | `userId` | [`UserSettingsProvider`] |
//!
//! Call [`register_entities`] on the registry builder before sealing it.

pub mod annotation;
pub mod audit;
pub mod collaborator;
pub mod provider;
pub mod repository;
pub mod team;
pub mod team_permission;
pub mod user_settings;

use orgportal_data::{RegistryBuilder, RegistryError};

pub use annotation::{Annotation, AnnotationProvider};
pub use audit::{AuditRecord, AuditRecordProvider};
pub use collaborator::{CollaboratorSnapshot, CollaboratorSnapshotProvider};
pub use provider::EntityProvider;
pub use repository::{RepositorySnapshot, RepositorySnapshotProvider};
pub use team::{TeamSnapshot, TeamSnapshotProvider};
pub use team_permission::{TeamPermissionSnapshot, TeamPermissionSnapshotProvider};
pub use user_settings::{UserSettings, UserSettingsProvider};

/// Register every portal entity type with its fixed queries.
pub fn register_entities(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    team::register(builder)?;
    repository::register(builder)?;
    collaborator::register(builder)?;
    team_permission::register(builder)?;
    annotation::register(builder)?;
    audit::register(builder)?;
    user_settings::register(builder)?;
    Ok(())
}

pub mod prelude {
    //! Re-exports of the entity types and their providers.
    pub use crate::{
        register_entities, Annotation, AnnotationProvider, AuditRecord, AuditRecordProvider,
        CollaboratorSnapshot, CollaboratorSnapshotProvider, EntityProvider, RepositorySnapshot,
        RepositorySnapshotProvider, TeamPermissionSnapshot, TeamPermissionSnapshotProvider,
        TeamSnapshot, TeamSnapshotProvider, UserSettings, UserSettingsProvider,
    };
}
