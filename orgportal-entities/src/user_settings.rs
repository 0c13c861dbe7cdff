use chrono::{DateTime, Utc};
use orgportal_data::prelude::*;
use orgportal_data::RegistryError;

use crate::provider::provider;

/// Per-user portal preferences, keyed by the GitHub user id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSettings {
    pub user_id: String,
    pub contribution_share_opt_in: bool,
    pub daily_digest: bool,
    pub theme: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for UserSettings {
    const ENTITY_TYPE: EntityType = EntityType::new("UserSettings");

    entity_fields! {
        id: "userId" => user_id;
        "contributionShareOptIn" => contribution_share_opt_in,
        "dailyDigest" => daily_digest,
        "theme" => theme,
        "lastUpdated" => last_updated,
    }
}

impl UserSettings {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register::<UserSettings>()?
        .query(QueryKind::All, QueryTemplate::select());
    Ok(())
}

provider!(UserSettingsProvider, UserSettings);

impl UserSettingsProvider {
    /// Replace the stored settings, creating them on first save.
    pub async fn save(&self, settings: &UserSettings) -> Result<(), DataError> {
        match self.store.update(settings).await {
            Err(err) if err.is_not_found() => {
                tracing::debug!(user_id = %settings.user_id, "creating user settings");
                self.store.create(settings).await.map(|_| ())
            }
            other => other,
        }
    }

    pub async fn all(&self) -> Result<Vec<UserSettings>, DataError> {
        self.store.query(&FixedQuery::All).await
    }
}
