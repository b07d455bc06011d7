use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

id_newtype!(ScenarioId);
id_newtype!(ExerciseId);
id_newtype!(TeamId);
id_newtype!(UserId);
id_newtype!(OrganizationId);
id_newtype!(NotificationId);

/// Implements `as_str`, `Display` and `FromStr` over the serde wire names.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(ValidationError::UnknownVariant {
                        kind: stringify!($name),
                        value: raw.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Simulation,
    Tabletop,
    LiveFire,
    Hybrid,
}

wire_enum!(ScenarioType {
    Simulation => "simulation",
    Tabletop => "tabletop",
    LiveFire => "live_fire",
    Hybrid => "hybrid",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Draft,
    Published,
    Archived,
}

wire_enum!(ScenarioStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

wire_enum!(Difficulty {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

/// Lifecycle of a launched exercise.
///
/// `configured → ready → running ⇄ paused → completed`, with `cancelled`
/// reachable before the exercise starts. `completed` and `cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
    Configured,
    Ready,
    Running,
    Paused,
    Completed,
    Cancelled,
}

wire_enum!(ExerciseStatus {
    Configured => "configured",
    Ready => "ready",
    Running => "running",
    Paused => "paused",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl ExerciseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExerciseStatus::Completed | ExerciseStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ExerciseStatus) -> bool {
        use ExerciseStatus::*;
        matches!(
            (self, next),
            (Configured, Ready)
                | (Configured, Cancelled)
                | (Ready, Running)
                | (Ready, Cancelled)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Completed)
                | (Paused, Completed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub status: ScenarioStatus,
    pub difficulty: Difficulty,
    /// Minutes.
    pub duration: u32,
    pub teams_required: u32,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::Field {
                field: "id",
                message: "must not be empty".into(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Field {
                field: "name",
                message: "must not be empty".into(),
            });
        }
        if self.duration == 0 {
            return Err(ValidationError::Field {
                field: "duration",
                message: "must be greater than zero minutes".into(),
            });
        }
        if self.teams_required == 0 {
            return Err(ValidationError::Field {
                field: "teamsRequired",
                message: "at least one team is required".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scenario_id: ScenarioId,
    #[serde(default)]
    pub scenario_name: String,
    pub status: ExerciseStatus,
    pub participant_count: u32,
    #[serde(default)]
    pub teams: Vec<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_id: TeamId,
    pub team_name: String,
    pub color: String,
    pub exercise_id: ExerciseId,
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

wire_enum!(NotificationKind {
    Success => "success",
    Error => "error",
    Warning => "warning",
    Info => "info",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationBranding {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub surface_color: String,
    pub text_color: String,
    pub text_secondary_color: String,
    pub border_color: String,
    pub success_color: String,
    pub warning_color: String,
    pub error_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
}

impl Default for OrganizationBranding {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".into(),
            secondary_color: "#64748b".into(),
            accent_color: "#8b5cf6".into(),
            background_color: "#0f172a".into(),
            surface_color: "#1e293b".into(),
            text_color: "#f8fafc".into(),
            text_secondary_color: "#94a3b8".into(),
            border_color: "#334155".into(),
            success_color: "#10b981".into(),
            warning_color: "#f59e0b".into(),
            error_color: "#ef4444".into(),
            font_family: None,
            logo_url: None,
            favicon_url: None,
            custom_css: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Instructor,
    Analyst,
    Participant,
}

wire_enum!(UserRole {
    Admin => "admin",
    Instructor => "instructor",
    Analyst => "analyst",
    Participant => "participant",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<OrganizationBranding>,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
