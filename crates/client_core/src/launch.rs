use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::{ExerciseId, ExerciseStatus};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pending,
    Checking,
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    /// Advisory items never block the launch gate.
    pub required: bool,
    pub state: CheckState,
    pub message: Option<String>,
}

impl ChecklistItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, required: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required,
            state: CheckState::Pending,
            message: None,
        }
    }
}

pub fn default_checklist() -> Vec<ChecklistItem> {
    vec![
        ChecklistItem::new("infrastructure", "Infrastructure provisioned", true),
        ChecklistItem::new("networking", "Network segments reachable", true),
        ChecklistItem::new("scenario-files", "Scenario files deployed", true),
        ChecklistItem::new("team-assignments", "Teams assigned", true),
        ChecklistItem::new("monitoring", "Monitoring dashboards online", false),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed(String),
}

/// Performs one pre-launch check. Implementations decide what "healthy"
/// means; the controller only records the outcome.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(&self, item: &ChecklistItem) -> CheckOutcome;
}

/// Deterministic runner: every item passes unless registered as failing.
#[derive(Debug, Clone, Default)]
pub struct StaticCheckRunner {
    failures: HashMap<String, String>,
    delay: Duration,
}

impl StaticCheckRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(id.into(), message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl CheckRunner for StaticCheckRunner {
    async fn run(&self, item: &ChecklistItem) -> CheckOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failures.get(&item.id) {
            Some(message) => CheckOutcome::Failed(message.clone()),
            None => CheckOutcome::Passed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("exercise already {0}; no further transitions")]
    Terminal(ExerciseStatus),
    #[error("cannot move exercise from {from} to {to}")]
    IllegalTransition {
        from: ExerciseStatus,
        to: ExerciseStatus,
    },
    #[error("required checks not passed: {}", .0.join(", "))]
    ChecklistIncomplete(Vec<String>),
    #[error("checklist is locked while exercise is {0}")]
    ChecklistLocked(ExerciseStatus),
    #[error("unknown checklist item '{0}'")]
    UnknownCheck(String),
    #[error("check '{0}' has not failed and cannot be retried")]
    NotRetryable(String),
    #[error("launch countdown already running")]
    CountdownActive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    StatusChanged {
        from: ExerciseStatus,
        to: ExerciseStatus,
    },
    CheckUpdated(ChecklistItem),
    CountdownTick {
        remaining: u32,
    },
    CountdownCancelled,
}

/// Drives one exercise through its launch lifecycle.
#[derive(Clone)]
pub struct LaunchController {
    inner: Arc<LaunchInner>,
}

struct LaunchInner {
    exercise_id: ExerciseId,
    runner: Arc<dyn CheckRunner>,
    countdown_seconds: u32,
    events: broadcast::Sender<LaunchEvent>,
    state: Mutex<LaunchState>,
}

struct LaunchState {
    status: ExerciseStatus,
    checklist: Vec<ChecklistItem>,
    countdown: Option<JoinHandle<()>>,
}

impl Drop for LaunchInner {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().countdown.take() {
            task.abort();
        }
    }
}

impl LaunchInner {
    async fn transition(&self, to: ExerciseStatus) -> Result<ExerciseStatus, LaunchError> {
        let mut state = self.state.lock().await;
        self.transition_locked(&mut state, to)
    }

    /// Like [`Self::transition`] but only from `expected`.
    async fn transition_from(
        &self,
        expected: ExerciseStatus,
        to: ExerciseStatus,
    ) -> Result<ExerciseStatus, LaunchError> {
        let mut state = self.state.lock().await;
        let from = state.status;
        if !from.is_terminal() && from != expected {
            return Err(LaunchError::IllegalTransition { from, to });
        }
        self.transition_locked(&mut state, to)
    }

    fn transition_locked(
        &self,
        state: &mut LaunchState,
        to: ExerciseStatus,
    ) -> Result<ExerciseStatus, LaunchError> {
        let from = state.status;
        if from.is_terminal() {
            warn!(
                "launch: ignored transition exercise={} from={from} to={to}",
                self.exercise_id
            );
            return Err(LaunchError::Terminal(from));
        }
        if !from.can_transition_to(to) {
            return Err(LaunchError::IllegalTransition { from, to });
        }
        if to == ExerciseStatus::Ready {
            let blocking = blocking_checks(&state.checklist);
            if !blocking.is_empty() {
                return Err(LaunchError::ChecklistIncomplete(blocking));
            }
        }
        if to != ExerciseStatus::Ready {
            if let Some(task) = state.countdown.take() {
                task.abort();
            }
        }

        state.status = to;
        info!(
            "launch: status changed exercise={} from={from} to={to}",
            self.exercise_id
        );
        let _ = self.events.send(LaunchEvent::StatusChanged { from, to });
        Ok(to)
    }
}

fn blocking_checks(checklist: &[ChecklistItem]) -> Vec<String> {
    checklist
        .iter()
        .filter(|item| item.required && item.state != CheckState::Passed)
        .map(|item| item.id.clone())
        .collect()
}

impl LaunchController {
    pub fn new(
        exercise_id: ExerciseId,
        checklist: Vec<ChecklistItem>,
        runner: Arc<dyn CheckRunner>,
        countdown_seconds: u32,
    ) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            inner: Arc::new(LaunchInner {
                exercise_id,
                runner,
                countdown_seconds,
                events,
                state: Mutex::new(LaunchState {
                    status: ExerciseStatus::Configured,
                    checklist,
                    countdown: None,
                }),
            }),
        }
    }

    pub fn exercise_id(&self) -> &ExerciseId {
        &self.inner.exercise_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.inner.events.subscribe()
    }

    pub async fn status(&self) -> ExerciseStatus {
        self.inner.state.lock().await.status
    }

    pub async fn checklist(&self) -> Vec<ChecklistItem> {
        self.inner.state.lock().await.checklist.clone()
    }

    /// True when every required item has passed.
    pub async fn can_launch(&self) -> bool {
        blocking_checks(&self.inner.state.lock().await.checklist).is_empty()
    }

    pub async fn countdown_active(&self) -> bool {
        self.inner.state.lock().await.countdown.is_some()
    }

    /// Runs a pending or failed check. A passed check is returned as is.
    pub async fn run_check(&self, id: &str) -> Result<ChecklistItem, LaunchError> {
        let item = {
            let mut state = self.inner.state.lock().await;
            if state.status != ExerciseStatus::Configured {
                return Err(LaunchError::ChecklistLocked(state.status));
            }
            let item = state
                .checklist
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| LaunchError::UnknownCheck(id.to_string()))?;
            if matches!(item.state, CheckState::Passed | CheckState::Checking) {
                return Ok(item.clone());
            }
            item.state = CheckState::Checking;
            item.message = None;
            let _ = self.inner.events.send(LaunchEvent::CheckUpdated(item.clone()));
            item.clone()
        };

        let outcome = self.inner.runner.run(&item).await;

        let mut state = self.inner.state.lock().await;
        if state.status != ExerciseStatus::Configured {
            warn!(
                "launch: dropped check result exercise={} check={id} status={}",
                self.inner.exercise_id, state.status
            );
            return Err(LaunchError::ChecklistLocked(state.status));
        }
        let item = state
            .checklist
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| LaunchError::UnknownCheck(id.to_string()))?;
        match outcome {
            CheckOutcome::Passed => {
                item.state = CheckState::Passed;
                item.message = None;
            }
            CheckOutcome::Failed(message) => {
                warn!(
                    "launch: check failed exercise={} check={id} reason={message}",
                    self.inner.exercise_id
                );
                item.state = CheckState::Failed;
                item.message = Some(message);
            }
        }
        let _ = self.inner.events.send(LaunchEvent::CheckUpdated(item.clone()));
        Ok(item.clone())
    }

    pub async fn retry_check(&self, id: &str) -> Result<ChecklistItem, LaunchError> {
        {
            let state = self.inner.state.lock().await;
            let item = state
                .checklist
                .iter()
                .find(|item| item.id == id)
                .ok_or_else(|| LaunchError::UnknownCheck(id.to_string()))?;
            if item.state != CheckState::Failed {
                return Err(LaunchError::NotRetryable(id.to_string()));
            }
        }
        self.run_check(id).await
    }

    /// Runs every pending or failed item one after another.
    pub async fn run_all_checks(&self) -> Result<Vec<ChecklistItem>, LaunchError> {
        let ids: Vec<String> = self
            .checklist()
            .await
            .into_iter()
            .filter(|item| matches!(item.state, CheckState::Pending | CheckState::Failed))
            .map(|item| item.id)
            .collect();
        for id in ids {
            self.run_check(&id).await?;
        }
        Ok(self.checklist().await)
    }

    pub async fn mark_ready(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner.transition(ExerciseStatus::Ready).await
    }

    /// Starts the automatic `ready → running` countdown. With a zero
    /// countdown the exercise launches immediately.
    pub async fn start_countdown(&self) -> Result<(), LaunchError> {
        let mut state = self.inner.state.lock().await;
        if state.status.is_terminal() {
            return Err(LaunchError::Terminal(state.status));
        }
        if state.status != ExerciseStatus::Ready {
            return Err(LaunchError::IllegalTransition {
                from: state.status,
                to: ExerciseStatus::Running,
            });
        }
        if state.countdown.is_some() {
            return Err(LaunchError::CountdownActive);
        }
        if self.inner.countdown_seconds == 0 {
            self.inner
                .transition_locked(&mut state, ExerciseStatus::Running)?;
            return Ok(());
        }

        let weak: Weak<LaunchInner> = Arc::downgrade(&self.inner);
        let seconds = self.inner.countdown_seconds;
        info!(
            "launch: countdown started exercise={} seconds={seconds}",
            self.inner.exercise_id
        );
        state.countdown = Some(tokio::spawn(async move {
            for remaining in (1..=seconds).rev() {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let _ = inner.events.send(LaunchEvent::CountdownTick { remaining });
                drop(inner);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.state.lock().await;
            // Detach our own handle so the transition does not abort this task.
            state.countdown = None;
            let _ = inner.events.send(LaunchEvent::CountdownTick { remaining: 0 });
            if let Err(err) = inner.transition_locked(&mut state, ExerciseStatus::Running) {
                warn!(
                    "launch: countdown finished without launch exercise={} error={err}",
                    inner.exercise_id
                );
            }
        }));
        Ok(())
    }

    pub async fn cancel_countdown(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        match state.countdown.take() {
            Some(task) => {
                task.abort();
                let _ = self.inner.events.send(LaunchEvent::CountdownCancelled);
                true
            }
            None => false,
        }
    }

    /// Manual override: launch from `ready` without waiting.
    pub async fn launch_now(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner
            .transition_from(ExerciseStatus::Ready, ExerciseStatus::Running)
            .await
    }

    pub async fn pause(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner.transition(ExerciseStatus::Paused).await
    }

    pub async fn resume(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner
            .transition_from(ExerciseStatus::Paused, ExerciseStatus::Running)
            .await
    }

    /// Terminal. Callers confirm with the operator before invoking.
    pub async fn complete(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner.transition(ExerciseStatus::Completed).await
    }

    pub async fn cancel(&self) -> Result<ExerciseStatus, LaunchError> {
        self.inner.transition(ExerciseStatus::Cancelled).await
    }

    /// Aborts the countdown timer, if any, without changing status.
    pub async fn shutdown(&self) {
        if let Some(task) = self.inner.state.lock().await.countdown.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/launch_tests.rs"]
mod tests;
