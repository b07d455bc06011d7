use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::domain::{TeamConfig, TeamId};

use crate::{load_json, save_json, KeyValueStore, TEAM_CONFIGS_KEY};

/// Storage-agnostic access to the operator's team configurations.
#[async_trait]
pub trait TeamConfigRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<TeamConfig>>;
    async fn get(&self, team_id: &TeamId) -> Result<Option<TeamConfig>>;
    /// Inserts or replaces the config with the same `team_id`.
    async fn set(&self, config: TeamConfig) -> Result<()>;
    async fn save_all(&self, configs: &[TeamConfig]) -> Result<()>;
    /// Returns whether a config was removed. Removing the only remaining
    /// config is an error; the list is never emptied this way.
    async fn remove(&self, team_id: &TeamId) -> Result<bool>;
}

/// Keeps the whole team array as one JSON document under
/// [`TEAM_CONFIGS_KEY`].
pub struct StoreTeamRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StoreTeamRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TeamConfigRepository for StoreTeamRepository {
    async fn list(&self) -> Result<Vec<TeamConfig>> {
        Ok(load_json(self.store.as_ref(), TEAM_CONFIGS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn get(&self, team_id: &TeamId) -> Result<Option<TeamConfig>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|config| &config.team_id == team_id))
    }

    async fn set(&self, config: TeamConfig) -> Result<()> {
        let mut configs = self.list().await?;
        match configs
            .iter_mut()
            .find(|existing| existing.team_id == config.team_id)
        {
            Some(existing) => *existing = config,
            None => configs.push(config),
        }
        self.save_all(&configs).await
    }

    async fn save_all(&self, configs: &[TeamConfig]) -> Result<()> {
        save_json(self.store.as_ref(), TEAM_CONFIGS_KEY, configs).await
    }

    async fn remove(&self, team_id: &TeamId) -> Result<bool> {
        let mut configs = self.list().await?;
        let before = configs.len();
        configs.retain(|config| &config.team_id != team_id);
        if configs.len() == before {
            return Ok(false);
        }
        if configs.is_empty() {
            bail!("cannot remove the last team configuration '{team_id}'");
        }
        self.save_all(&configs).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/teams_tests.rs"]
mod tests;
