use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::domain::{Notification, NotificationId, NotificationKind};
use tokio::{
    runtime::Handle,
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Notifications published before anyone subscribes are held here, oldest
/// evicted first.
pub const PENDING_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Added(Notification),
    Dismissed(NotificationId),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    pub duration: Option<Duration>,
    pub persistent: bool,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: None,
            duration: None,
            persistent: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// Process-wide publish/subscribe channel for transient user-facing
/// messages. Any number of surfaces may subscribe; publishing never fails.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    events: broadcast::Sender<NotificationEvent>,
    default_duration: Duration,
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    active: Vec<Notification>,
    pending: VecDeque<Notification>,
    timers: HashMap<NotificationId, JoinHandle<()>>,
}

impl HubInner {
    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: &NotificationId) -> bool {
        let mut state = self.state();
        if let Some(timer) = state.timers.remove(id) {
            timer.abort();
        }
        state.pending.retain(|n| &n.id != id);
        let before = state.active.len();
        state.active.retain(|n| &n.id != id);
        let removed = state.active.len() != before;
        if removed {
            let _ = self.events.send(NotificationEvent::Dismissed(id.clone()));
        }
        removed
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }
}

impl NotificationHub {
    pub fn new(default_duration: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                events,
                default_duration,
                state: Mutex::new(HubState::default()),
            }),
        }
    }

    pub fn add_notification(&self, draft: NotificationDraft) -> NotificationId {
        let notification = Notification {
            id: NotificationId::new(Uuid::new_v4().to_string()),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            duration_ms: draft
                .duration
                .unwrap_or(self.inner.default_duration)
                .as_millis()
                .try_into()
                .unwrap_or(u64::MAX),
            persistent: draft.persistent,
        };
        let id = notification.id.clone();

        {
            let mut state = self.inner.state();
            state.active.push(notification.clone());
            if self.inner.events.receiver_count() == 0 {
                if state.pending.len() == PENDING_CAPACITY {
                    state.pending.pop_front();
                }
                state.pending.push_back(notification.clone());
                debug!("notifications: buffered id={id} pending={}", state.pending.len());
            }
            if !notification.persistent {
                if let Some(timer) = self.spawn_dismiss_timer(&id, notification.duration_ms) {
                    state.timers.insert(id.clone(), timer);
                }
            }
            // Sent under the lock so a concurrent subscribe sees it exactly once.
            let _ = self.inner.events.send(NotificationEvent::Added(notification));
        }

        id
    }

    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.add_with(NotificationKind::Success, title, message)
    }

    pub fn error(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.add_with(NotificationKind::Error, title, message)
    }

    pub fn warning(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.add_with(NotificationKind::Warning, title, message)
    }

    pub fn info(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.add_with(NotificationKind::Info, title, message)
    }

    fn add_with(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: Option<String>,
    ) -> NotificationId {
        let mut draft = NotificationDraft::new(kind, title);
        draft.message = message;
        self.add_notification(draft)
    }

    pub fn remove_notification(&self, id: &NotificationId) -> bool {
        self.inner.remove(id)
    }

    pub fn clear(&self) {
        let mut state = self.inner.state();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.active.clear();
        state.pending.clear();
        let _ = self.inner.events.send(NotificationEvent::Cleared);
    }

    pub fn active(&self) -> Vec<Notification> {
        self.inner.state().active.clone()
    }

    /// Subscribes a new consumer. The first subscriber after a quiet period
    /// also receives whatever was buffered while nobody was listening.
    pub fn subscribe(&self) -> NotificationSubscription {
        let mut state = self.inner.state();
        let receiver = self.inner.events.subscribe();
        let backlog = state
            .pending
            .drain(..)
            .map(NotificationEvent::Added)
            .collect();
        NotificationSubscription { backlog, receiver }
    }

    /// Cancels every pending auto-dismiss timer. Active notifications stay.
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }

    fn spawn_dismiss_timer(&self, id: &NotificationId, duration_ms: u64) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!("notifications: no runtime, auto-dismiss disabled id={id}");
            return None;
        };
        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        let id = id.clone();
        Some(handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
            if let Some(hub) = hub.upgrade() {
                hub.state().timers.remove(&id);
                hub.remove(&id);
            }
        }))
    }
}

pub struct NotificationSubscription {
    backlog: VecDeque<NotificationEvent>,
    receiver: broadcast::Receiver<NotificationEvent>,
}

impl NotificationSubscription {
    /// Next event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<NotificationEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("notifications: subscriber lagged skipped={skipped}");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<NotificationEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
