use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{
    domain::{Organization, OrganizationId, User, UserId, UserRole},
    protocol::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse},
};
use storage::{load_json, save_json, KeyValueStore, AUTH_STORE_KEY};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{api::ApiClient, config::AuthMode};

pub const DEMO_TOKEN: &str = "demo-token";

/// The part of [`AuthState`] that survives restarts. Loading and error
/// flags are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub organization: Option<Organization>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub organization: Option<Organization>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            user: self.user.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            organization: self.organization.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn from_snapshot(snapshot: AuthSnapshot) -> Self {
        Self {
            user: snapshot.user,
            access_token: snapshot.access_token,
            refresh_token: snapshot.refresh_token,
            organization: snapshot.organization,
            is_authenticated: snapshot.is_authenticated,
            is_loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub fn demo_session() -> LoginResponse {
    let organization_id = OrganizationId::new("demo-org");
    LoginResponse {
        user: User {
            id: UserId::new("demo-user"),
            email: "demo@scip.local".into(),
            name: "Demo Operator".into(),
            role: UserRole::Admin,
            organization_id: Some(organization_id.clone()),
            permissions: vec!["*".into()],
        },
        access_token: DEMO_TOKEN.into(),
        refresh_token: Some("demo-refresh-token".into()),
        organization: Some(Organization {
            id: organization_id,
            name: "SCIP Demo Organization".into(),
            slug: "demo".into(),
            branding: None,
        }),
    }
}

/// Current user, organization and tokens. Every failed server check clears
/// the session.
pub struct AuthStore {
    mode: AuthMode,
    api: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    pub fn new(mode: AuthMode, api: Arc<ApiClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            mode,
            api,
            store,
            state: RwLock::new(AuthState::default()),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated
    }

    /// Rehydrates from the persisted snapshot. An unreadable snapshot is
    /// discarded.
    pub async fn restore(&self) -> Result<()> {
        let snapshot = match load_json::<AuthSnapshot>(self.store.as_ref(), AUTH_STORE_KEY).await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(err) => {
                warn!("auth: discarding unreadable session snapshot: {err:#}");
                self.store.remove(AUTH_STORE_KEY).await?;
                AuthSnapshot::default()
            }
        };
        self.api.set_token(snapshot.access_token.clone()).await;
        *self.state.write().await = AuthState::from_snapshot(snapshot);
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.state.write().await.is_loading = true;

        let session = match self.mode {
            AuthMode::Demo => Ok(demo_session()),
            AuthMode::Remote => {
                self.api
                    .post::<_, LoginResponse>(
                        "/auth/login",
                        &LoginRequest {
                            email: email.to_string(),
                            password: password.to_string(),
                        },
                    )
                    .await
            }
        };

        match session {
            Ok(session) => {
                let user = session.user.clone();
                self.install(session).await;
                info!("auth: logged in user={} mode={}", user.id, self.mode);
                Ok(user)
            }
            Err(err) => {
                error!("auth: login failed mode={} error={err}", self.mode);
                {
                    let mut state = self.state.write().await;
                    *state = AuthState {
                        error: Some(err.to_string()),
                        ..AuthState::default()
                    };
                }
                self.api.set_token(None).await;
                Err(err.into())
            }
        }
    }

    async fn install(&self, session: LoginResponse) {
        self.api.set_token(Some(session.access_token.clone())).await;
        let snapshot = {
            let mut state = self.state.write().await;
            *state = AuthState {
                user: Some(session.user),
                access_token: Some(session.access_token),
                refresh_token: session.refresh_token,
                organization: session.organization,
                is_authenticated: true,
                is_loading: false,
                error: None,
            };
            state.snapshot()
        };
        self.persist(&snapshot).await;
    }

    async fn persist(&self, snapshot: &AuthSnapshot) {
        if let Err(err) = save_json(self.store.as_ref(), AUTH_STORE_KEY, snapshot).await {
            warn!("auth: failed to persist session: {err:#}");
        }
    }

    /// Tells the server (best effort) and always clears local state.
    pub async fn logout(&self) {
        let token = self.state.read().await.access_token.clone();
        if self.mode == AuthMode::Remote && token.is_some() {
            if let Err(err) = self.api.post_ack("/auth/logout", &json!({})).await {
                warn!("auth: logout notification failed: {err}");
            }
        }
        self.clear_session().await;
        info!("auth: logged out");
    }

    async fn clear_session(&self) {
        *self.state.write().await = AuthState::default();
        self.api.set_token(None).await;
        if let Err(err) = self.store.remove(AUTH_STORE_KEY).await {
            warn!("auth: failed to clear persisted session: {err:#}");
        }
    }

    /// Exchanges the refresh token for a new access token; any failure
    /// logs the user out.
    pub async fn refresh_token(&self) -> Result<()> {
        if self.mode == AuthMode::Demo {
            return Ok(());
        }
        let Some(refresh_token) = self.state.read().await.refresh_token.clone() else {
            self.clear_session().await;
            return Err(anyhow!("no refresh token available"));
        };

        let refreshed = self
            .api
            .post::<_, RefreshResponse>("/auth/refresh", &RefreshRequest { refresh_token })
            .await;
        match refreshed {
            Ok(refreshed) => {
                self.api.set_token(Some(refreshed.access_token.clone())).await;
                let snapshot = {
                    let mut state = self.state.write().await;
                    state.access_token = Some(refreshed.access_token);
                    if refreshed.refresh_token.is_some() {
                        state.refresh_token = refreshed.refresh_token;
                    }
                    state.snapshot()
                };
                self.persist(&snapshot).await;
                Ok(())
            }
            Err(err) => {
                warn!("auth: token refresh failed, logging out: {err}");
                self.logout().await;
                Err(err.into())
            }
        }
    }

    /// Fail-closed session check: a missing token, thrown error or
    /// non-success response all clear the session.
    pub async fn check_auth_status(&self) -> bool {
        let token = self.state.read().await.access_token.clone();
        let Some(token) = token else {
            self.clear_session().await;
            return false;
        };

        if self.mode == AuthMode::Demo {
            if token == DEMO_TOKEN {
                self.state.write().await.is_authenticated = true;
                return true;
            }
            self.clear_session().await;
            return false;
        }

        self.state.write().await.is_loading = true;
        match self.api.get::<User>("/auth/me").await {
            Ok(user) => {
                let snapshot = {
                    let mut state = self.state.write().await;
                    state.user = Some(user);
                    state.is_authenticated = true;
                    state.is_loading = false;
                    state.snapshot()
                };
                self.persist(&snapshot).await;
                true
            }
            Err(err) => {
                warn!("auth: session check failed: {err}");
                self.clear_session().await;
                false
            }
        }
    }

    pub async fn update_user(&self, patch: UserPatch) -> Option<User> {
        let (user, snapshot) = {
            let mut state = self.state.write().await;
            let user = state.user.as_mut()?;
            if let Some(name) = patch.name {
                user.name = name;
            }
            if let Some(email) = patch.email {
                user.email = email;
            }
            let user = user.clone();
            (user, state.snapshot())
        };
        self.persist(&snapshot).await;
        Some(user)
    }

    pub async fn set_organization(&self, organization: Organization) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.organization = Some(organization);
            state.snapshot()
        };
        self.persist(&snapshot).await;
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn has_role(&self, role: UserRole) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(|user| user.role == role)
    }

    /// Admins hold every permission; everyone else needs an explicit grant
    /// or the `*` wildcard.
    pub async fn has_permission(&self, permission: &str) -> bool {
        self.state.read().await.user.as_ref().is_some_and(|user| {
            user.role == UserRole::Admin
                || user.permissions.iter().any(|p| p == "*" || p == permission)
        })
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
