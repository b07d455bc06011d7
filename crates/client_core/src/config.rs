use std::{collections::HashMap, fmt, fs, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "scip.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Authenticate against the backend; failures surface as errors.
    Remote,
    /// Install the built-in demo identity without any network traffic.
    Demo,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(AuthMode::Remote),
            "demo" => Ok(AuthMode::Demo),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Remote => f.write_str("remote"),
            AuthMode::Demo => f.write_str("demo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub orchestration_url: String,
    pub auth_mode: AuthMode,
    pub database_url: String,
    pub countdown_seconds: u32,
    pub notification_duration_ms: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".into(),
            orchestration_url: "http://localhost:8000/api/v1".into(),
            auth_mode: AuthMode::Demo,
            database_url: "sqlite://./data/scip.db".into(),
            countdown_seconds: 10,
            notification_duration_ms: 5000,
            poll_interval_secs: 30,
            request_timeout_secs: 15,
        }
    }
}

impl Settings {
    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Applies a flat `key = "value"` TOML document. Unknown keys are ignored.
    pub fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!("config: ignoring unparseable {SETTINGS_FILE}: {err}");
                return;
            }
        };

        let lookup = |key: &str| {
            file_cfg.get(key).map(|value| match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };

        self.apply_lookup(&[], lookup);
    }

    /// Applies `SCIP_*` variables, then their `APP__*` aliases.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_lookup(&["SCIP_", "APP__"], |key| {
            lookup(&key.to_ascii_uppercase())
        });
    }

    fn apply_lookup<F>(&mut self, prefixes: &[&str], lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys: &[(&str, &str)] = &[
            ("api_url", "api_base_url"),
            ("orchestration_url", "orchestration_url"),
            ("auth_mode", "auth_mode"),
            ("database_url", "database_url"),
            ("countdown_seconds", "countdown_seconds"),
            ("notification_duration_ms", "notification_duration_ms"),
            ("poll_interval_secs", "poll_interval_secs"),
            ("request_timeout_secs", "request_timeout_secs"),
        ];

        let candidates = |key: &str| -> Vec<String> {
            if prefixes.is_empty() {
                vec![key.to_string()]
            } else {
                prefixes.iter().map(|p| format!("{p}{key}")).collect()
            }
        };

        for (env_key, field) in keys {
            for candidate in candidates(env_key) {
                if let Some(value) = lookup(&candidate) {
                    self.set_field(field, value.trim());
                }
            }
        }
    }

    fn set_field(&mut self, field: &str, value: &str) {
        match field {
            "api_base_url" => self.api_base_url = value.to_string(),
            "orchestration_url" => self.orchestration_url = value.to_string(),
            "database_url" => self.database_url = normalize_database_url(value),
            "auth_mode" => match value.parse() {
                Ok(mode) => self.auth_mode = mode,
                Err(err) => warn!("config: {err}, keeping auth_mode={}", self.auth_mode),
            },
            "countdown_seconds" => {
                if let Ok(parsed) = value.parse() {
                    self.countdown_seconds = parsed;
                }
            }
            "notification_duration_ms" => {
                if let Ok(parsed) = value.parse() {
                    self.notification_duration_ms = parsed;
                }
            }
            "poll_interval_secs" => {
                if let Ok(parsed) = value.parse() {
                    self.poll_interval_secs = parsed;
                }
            }
            "request_timeout_secs" => {
                if let Ok(parsed) = value.parse() {
                    self.request_timeout_secs = parsed;
                }
            }
            _ => {}
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        settings.apply_file(&raw);
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

/// Normalises `raw_database_url` and creates the sqlite file's parent directory.
pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.replace('\\', "/");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
