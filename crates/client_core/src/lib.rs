use std::sync::Arc;

use anyhow::{Context, Result};
use shared::domain::{ExerciseId, OrganizationId};
use storage::{KeyValueStore, StoreTeamRepository};
use tracing::info;

pub mod api;
pub mod auth;
pub mod boundary;
pub mod branding;
pub mod collections;
pub mod config;
pub mod demo;
pub mod launch;
pub mod notifications;
pub mod orchestration;
pub mod teams;

pub use api::{ApiClient, ApiClientError};
pub use auth::{AuthState, AuthStore};
pub use boundary::ErrorBoundary;
pub use branding::{BrandingStore, ThemeDocument, ThemeTarget};
pub use collections::{CollectionQuery, ScenarioCatalog, SortDirection, SortState};
pub use config::{load_settings, prepare_database_url, AuthMode, Settings};
pub use launch::{LaunchController, LaunchError, LaunchEvent};
pub use notifications::{NotificationEvent, NotificationHub};
pub use orchestration::{DashboardPoller, DashboardSnapshot, OrchestrationClient};
pub use teams::{TeamConfigError, TeamConfigManager};

/// The stores and clients one dashboard session shares.
pub struct ScipContext {
    pub settings: Settings,
    pub store: Arc<dyn KeyValueStore>,
    pub api: Arc<ApiClient>,
    pub auth: AuthStore,
    pub orchestration: Arc<OrchestrationClient>,
    pub notifications: NotificationHub,
}

impl ScipContext {
    pub fn new(settings: Settings, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let api = Arc::new(
            ApiClient::new(&settings.api_base_url, settings.request_timeout())
                .context("failed to build api client")?,
        );
        let orchestration_api = if settings.orchestration_url == settings.api_base_url {
            api.clone()
        } else {
            Arc::new(
                ApiClient::new(&settings.orchestration_url, settings.request_timeout())
                    .context("failed to build orchestration client")?,
            )
        };
        let notifications = NotificationHub::new(settings.notification_duration());
        let orchestration = Arc::new(
            OrchestrationClient::new(orchestration_api).with_alerts(notifications.clone()),
        );
        let auth = AuthStore::new(settings.auth_mode, api.clone(), store.clone());

        info!(
            "client: context ready api={} orchestration={} auth_mode={}",
            settings.api_base_url, settings.orchestration_url, settings.auth_mode
        );
        Ok(Self {
            settings,
            store,
            api,
            auth,
            orchestration,
            notifications,
        })
    }

    /// Restores the persisted session and hands its token to every client.
    pub async fn restore_session(&self) -> Result<()> {
        self.auth.restore().await?;
        self.share_token().await;
        Ok(())
    }

    /// Copies the session token onto the orchestration client, which may
    /// talk to a separate host.
    pub async fn share_token(&self) {
        let token = self.auth.state().await.access_token;
        self.orchestration.api().set_token(token).await;
    }

    pub fn team_manager(
        &self,
        exercise_id: ExerciseId,
        organization_id: OrganizationId,
    ) -> TeamConfigManager {
        TeamConfigManager::new(
            Arc::new(StoreTeamRepository::new(self.store.clone())),
            exercise_id,
            organization_id,
        )
    }

    pub fn poll_dashboards(&self) -> DashboardPoller {
        DashboardPoller::start(self.orchestration.clone(), self.settings.poll_interval())
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
