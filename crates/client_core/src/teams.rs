use std::sync::Arc;

use shared::domain::{ExerciseId, OrganizationId, TeamConfig, TeamId};
use storage::{KeyValueStore, TeamConfigRepository, TEAM_DASHBOARD_KEY};
use thiserror::Error;
use tracing::{info, warn};

/// Visually distinct team colours, assigned first-unused.
pub const TEAM_COLOR_PALETTE: [&str; 8] = [
    "#ef4444", "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
];

const DEFAULT_TEAM_NAME: &str = "Team 1";

#[derive(Debug, Error)]
pub enum TeamConfigError {
    #[error("at least one team must remain configured")]
    LastTeam,
    #[error("unknown team '{0}'")]
    UnknownTeam(TeamId),
    #[error("team name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// First palette colour no team uses yet; cycles once all are taken.
pub fn next_team_color(teams: &[TeamConfig]) -> &'static str {
    TEAM_COLOR_PALETTE
        .iter()
        .copied()
        .find(|color| !teams.iter().any(|t| t.color.eq_ignore_ascii_case(color)))
        .unwrap_or(TEAM_COLOR_PALETTE[teams.len() % TEAM_COLOR_PALETTE.len()])
}

fn next_team_id(teams: &[TeamConfig]) -> TeamId {
    let highest = teams
        .iter()
        .filter_map(|t| t.team_id.as_str().strip_prefix("team-"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    TeamId::new(format!("team-{}", highest + 1))
}

pub struct TeamConfigManager {
    repo: Arc<dyn TeamConfigRepository>,
    exercise_id: ExerciseId,
    organization_id: OrganizationId,
}

impl TeamConfigManager {
    pub fn new(
        repo: Arc<dyn TeamConfigRepository>,
        exercise_id: ExerciseId,
        organization_id: OrganizationId,
    ) -> Self {
        Self {
            repo,
            exercise_id,
            organization_id,
        }
    }

    fn default_team(&self) -> TeamConfig {
        TeamConfig {
            team_id: TeamId::new("team-1"),
            team_name: DEFAULT_TEAM_NAME.into(),
            color: TEAM_COLOR_PALETTE[0].into(),
            exercise_id: self.exercise_id.clone(),
            organization_id: self.organization_id.clone(),
        }
    }

    /// Loads the stored teams, seeding a single default team when the
    /// store is empty or unreadable so the list is never empty.
    pub async fn load(&self) -> Result<Vec<TeamConfig>, TeamConfigError> {
        let teams = match self.repo.list().await {
            Ok(teams) => teams,
            Err(err) => {
                warn!("teams: discarding unreadable team configs: {err:#}");
                Vec::new()
            }
        };
        if !teams.is_empty() {
            return Ok(teams);
        }
        let seeded = vec![self.default_team()];
        self.repo.save_all(&seeded).await?;
        Ok(seeded)
    }

    pub async fn add_team(&self, name: &str) -> Result<TeamConfig, TeamConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TeamConfigError::EmptyName);
        }
        let mut teams = self.load().await?;
        let config = TeamConfig {
            team_id: next_team_id(&teams),
            team_name: name.to_string(),
            color: next_team_color(&teams).to_string(),
            exercise_id: self.exercise_id.clone(),
            organization_id: self.organization_id.clone(),
        };
        teams.push(config.clone());
        self.repo.save_all(&teams).await?;
        info!(
            "teams: added team={} color={} total={}",
            config.team_id,
            config.color,
            teams.len()
        );
        Ok(config)
    }

    pub async fn update_team(
        &self,
        team_id: &TeamId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<TeamConfig, TeamConfigError> {
        let mut teams = self.load().await?;
        let team = teams
            .iter_mut()
            .find(|t| &t.team_id == team_id)
            .ok_or_else(|| TeamConfigError::UnknownTeam(team_id.clone()))?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TeamConfigError::EmptyName);
            }
            team.team_name = name.to_string();
        }
        if let Some(color) = color {
            team.color = color.to_string();
        }
        let updated = team.clone();
        self.repo.save_all(&teams).await?;
        Ok(updated)
    }

    pub async fn remove_team(&self, team_id: &TeamId) -> Result<Vec<TeamConfig>, TeamConfigError> {
        let mut teams = self.load().await?;
        if !teams.iter().any(|t| &t.team_id == team_id) {
            return Err(TeamConfigError::UnknownTeam(team_id.clone()));
        }
        if teams.len() <= 1 {
            return Err(TeamConfigError::LastTeam);
        }
        teams.retain(|t| &t.team_id != team_id);
        self.repo.save_all(&teams).await?;
        info!("teams: removed team={team_id} remaining={}", teams.len());
        Ok(teams)
    }

    /// Replaces every team with the single default team.
    pub async fn reset(&self) -> Result<Vec<TeamConfig>, TeamConfigError> {
        let seeded = vec![self.default_team()];
        self.repo.save_all(&seeded).await?;
        Ok(seeded)
    }
}

pub async fn reset_team_dashboard(store: &dyn KeyValueStore) -> anyhow::Result<()> {
    store.remove(TEAM_DASHBOARD_KEY).await
}

#[cfg(test)]
#[path = "tests/teams_tests.rs"]
mod tests;
