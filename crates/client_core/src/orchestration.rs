use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use shared::{
    domain::{ExerciseId, OrganizationId, TeamConfig},
    protocol::{
        DashboardInfo, DeployDashboardsRequest, DeployDashboardsResponse,
        RemoveDashboardsResponse, TeamDashboardSpec,
    },
};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{
    api::{ApiClient, ApiClientError},
    notifications::NotificationHub,
};

/// Talks to the dashboard deployment service. Calls are made once; a
/// failure is reported to the operator and returned.
pub struct OrchestrationClient {
    api: Arc<ApiClient>,
    alerts: Option<NotificationHub>,
}

impl OrchestrationClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, alerts: None }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn with_alerts(mut self, hub: NotificationHub) -> Self {
        self.alerts = Some(hub);
        self
    }

    fn alert(&self, title: &str, err: &ApiClientError) {
        error!("orchestration: {title}: {err}");
        if let Some(hub) = &self.alerts {
            hub.error(title, Some(err.to_string()));
        }
    }

    pub async fn deploy_dashboards(
        &self,
        request: &DeployDashboardsRequest,
    ) -> Result<DeployDashboardsResponse, ApiClientError> {
        match self
            .api
            .post::<_, DeployDashboardsResponse>("/dashboards/deploy", request)
            .await
        {
            Ok(response) => {
                info!(
                    "orchestration: deployed exercise={} dashboards={}",
                    response.exercise_id,
                    response.dashboards.len()
                );
                if let Some(hub) = &self.alerts {
                    hub.success(
                        "Dashboards deployed",
                        Some(format!(
                            "{} team dashboards for {}",
                            response.dashboards.len(),
                            response.exercise_id
                        )),
                    );
                }
                Ok(response)
            }
            Err(err) => {
                self.alert("Dashboard deployment failed", &err);
                Err(err)
            }
        }
    }

    pub async fn remove_dashboards(
        &self,
        exercise_id: &ExerciseId,
    ) -> Result<RemoveDashboardsResponse, ApiClientError> {
        let path = format!("/dashboards/exercise/{exercise_id}");
        match self.api.delete::<RemoveDashboardsResponse>(&path).await {
            Ok(response) => {
                info!(
                    "orchestration: removed exercise={} dashboards={}",
                    response.exercise_id, response.removed
                );
                Ok(response)
            }
            Err(err) => {
                self.alert("Dashboard removal failed", &err);
                Err(err)
            }
        }
    }

    pub async fn list_dashboards(&self) -> Result<Vec<DashboardInfo>, ApiClientError> {
        self.fetch_dashboards().await.inspect_err(|err| {
            self.alert("Dashboard list failed", err);
        })
    }

    /// Background refreshes report through the snapshot, not as alerts.
    async fn fetch_dashboards(&self) -> Result<Vec<DashboardInfo>, ApiClientError> {
        self.api.get("/dashboards/list").await
    }
}

pub fn deploy_request(
    exercise_id: ExerciseId,
    organization_id: OrganizationId,
    teams: &[TeamConfig],
) -> DeployDashboardsRequest {
    DeployDashboardsRequest {
        exercise_id,
        organization_id,
        teams: teams
            .iter()
            .map(|team| TeamDashboardSpec {
                team_id: team.team_id.clone(),
                team_name: team.team_name.clone(),
                color: team.color.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub dashboards: Vec<DashboardInfo>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Last refresh error; the previous list is kept alongside it.
    pub error: Option<String>,
}

/// Re-fetches the dashboard list on a fixed interval until stopped.
pub struct DashboardPoller {
    snapshots: watch::Receiver<DashboardSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl DashboardPoller {
    pub fn start(client: Arc<OrchestrationClient>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(DashboardSnapshot::default());
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = client.fetch_dashboards().await;
                tx.send_modify(|snapshot| match result {
                    Ok(dashboards) => {
                        snapshot.dashboards = dashboards;
                        snapshot.refreshed_at = Some(Utc::now());
                        snapshot.error = None;
                    }
                    Err(err) => {
                        warn!("orchestration: dashboard refresh failed: {err}");
                        snapshot.error = Some(err.to_string());
                    }
                });
                if tx.is_closed() {
                    return;
                }
            }
        });
        Self {
            snapshots: rx,
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
