use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use shared::{
    domain::{Exercise, ExerciseStatus, Scenario, ScenarioId, ScenarioStatus},
    error::ValidationError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    /// `None` sorts before every timestamp.
    Date(Option<DateTime<Utc>>),
    Text(String),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// A record that can be searched, filtered by status and sorted.
pub trait CollectionRecord: Clone {
    type Status: Copy + PartialEq + fmt::Debug;
    type Field: Copy + PartialEq + fmt::Debug;

    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn status(&self) -> Self::Status;
    fn sort_value(&self, field: Self::Field) -> SortValue;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortState<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Copy + PartialEq> SortState<F> {
    pub fn new(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    /// Same field flips the direction; a new field starts ascending.
    pub fn toggle(&mut self, field: F) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Ascending;
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionQuery<R: CollectionRecord> {
    pub search: String,
    /// `None` means "all".
    pub status: Option<R::Status>,
    pub sort: SortState<R::Field>,
}

impl<R: CollectionRecord> CollectionQuery<R> {
    pub fn new(sort_field: R::Field) -> Self {
        Self {
            search: String::new(),
            status: None,
            sort: SortState::new(sort_field),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: Option<R::Status>) -> Self {
        self.status = status;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.sort.direction = direction;
        self
    }

    pub fn matches(&self, record: &R) -> bool {
        let status_ok = self.status.map_or(true, |status| record.status() == status);
        if !status_ok {
            return false;
        }
        let needle = self.search.to_lowercase();
        needle.is_empty()
            || record.name().to_lowercase().contains(&needle)
            || record.description().to_lowercase().contains(&needle)
    }

    /// Filters then stable-sorts. Ties keep their input order in both
    /// directions.
    pub fn apply(&self, records: &[R]) -> Vec<R> {
        let mut out: Vec<R> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();
        let field = self.sort.field;
        out.sort_by(|a, b| {
            let ordering = a.sort_value(field).compare(&b.sort_value(field));
            match self.sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        out
    }
}

/// Parses a status filter where `all` (or empty) means no filter.
pub fn parse_status_filter<S>(raw: &str) -> Result<Option<S>, ValidationError>
where
    S: FromStr<Err = ValidationError>,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioSortField {
    Name,
    Type,
    Status,
    Difficulty,
    Duration,
    TeamsRequired,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for ScenarioSortField {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], "");
        Ok(match normalized.as_str() {
            "name" => ScenarioSortField::Name,
            "type" => ScenarioSortField::Type,
            "status" => ScenarioSortField::Status,
            "difficulty" => ScenarioSortField::Difficulty,
            "duration" => ScenarioSortField::Duration,
            "teamsrequired" | "teams" => ScenarioSortField::TeamsRequired,
            "createdat" | "created" => ScenarioSortField::CreatedAt,
            "updatedat" | "updated" => ScenarioSortField::UpdatedAt,
            _ => {
                return Err(ValidationError::UnknownVariant {
                    kind: "scenario sort field",
                    value: raw.to_string(),
                })
            }
        })
    }
}

impl CollectionRecord for Scenario {
    type Status = ScenarioStatus;
    type Field = ScenarioSortField;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn status(&self) -> ScenarioStatus {
        self.status
    }

    fn sort_value(&self, field: ScenarioSortField) -> SortValue {
        match field {
            ScenarioSortField::Name => SortValue::Text(self.name.clone()),
            ScenarioSortField::Type => SortValue::Text(self.scenario_type.as_str().to_string()),
            ScenarioSortField::Status => SortValue::Text(self.status.as_str().to_string()),
            ScenarioSortField::Difficulty => {
                SortValue::Text(self.difficulty.as_str().to_string())
            }
            ScenarioSortField::Duration => SortValue::Number(f64::from(self.duration)),
            ScenarioSortField::TeamsRequired => {
                SortValue::Number(f64::from(self.teams_required))
            }
            ScenarioSortField::CreatedAt => SortValue::Date(Some(self.created_at)),
            ScenarioSortField::UpdatedAt => SortValue::Date(Some(self.updated_at)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseSortField {
    Name,
    Status,
    ParticipantCount,
    ScheduledStart,
    EstimatedEnd,
}

impl FromStr for ExerciseSortField {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], "");
        Ok(match normalized.as_str() {
            "name" => ExerciseSortField::Name,
            "status" => ExerciseSortField::Status,
            "participantcount" | "participants" => ExerciseSortField::ParticipantCount,
            "scheduledstart" | "start" => ExerciseSortField::ScheduledStart,
            "estimatedend" | "end" => ExerciseSortField::EstimatedEnd,
            _ => {
                return Err(ValidationError::UnknownVariant {
                    kind: "exercise sort field",
                    value: raw.to_string(),
                })
            }
        })
    }
}

impl CollectionRecord for Exercise {
    type Status = ExerciseStatus;
    type Field = ExerciseSortField;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn status(&self) -> ExerciseStatus {
        self.status
    }

    fn sort_value(&self, field: ExerciseSortField) -> SortValue {
        match field {
            ExerciseSortField::Name => SortValue::Text(self.name.clone()),
            ExerciseSortField::Status => SortValue::Text(self.status.as_str().to_string()),
            ExerciseSortField::ParticipantCount => {
                SortValue::Number(f64::from(self.participant_count))
            }
            ExerciseSortField::ScheduledStart => SortValue::Date(self.scheduled_start),
            ExerciseSortField::EstimatedEnd => SortValue::Date(self.estimated_end),
        }
    }
}

/// In-memory scenario collection. Records are replaced whole; ids never
/// change once stored.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn demo() -> Self {
        Self::new(crate::demo::demo_scenarios())
    }

    pub fn all(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    /// Inserts a new scenario or replaces the one with the same id in place.
    pub fn upsert(&mut self, scenario: Scenario) -> Result<(), ValidationError> {
        scenario.validate()?;
        match self.scenarios.iter_mut().find(|s| s.id == scenario.id) {
            Some(existing) => *existing = scenario,
            None => self.scenarios.push(scenario),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &ScenarioId) -> Option<Scenario> {
        let index = self.scenarios.iter().position(|s| &s.id == id)?;
        Some(self.scenarios.remove(index))
    }

    pub fn query(&self, query: &CollectionQuery<Scenario>) -> Vec<Scenario> {
        query.apply(&self.scenarios)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExerciseStats {
    pub total: usize,
    pub configured: usize,
    pub ready: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Participants in running or paused exercises.
    pub active_participants: u32,
}

pub fn exercise_stats(exercises: &[Exercise]) -> ExerciseStats {
    let mut stats = ExerciseStats {
        total: exercises.len(),
        ..ExerciseStats::default()
    };
    for exercise in exercises {
        match exercise.status {
            ExerciseStatus::Configured => stats.configured += 1,
            ExerciseStatus::Ready => stats.ready += 1,
            ExerciseStatus::Running => stats.running += 1,
            ExerciseStatus::Paused => stats.paused += 1,
            ExerciseStatus::Completed => stats.completed += 1,
            ExerciseStatus::Cancelled => stats.cancelled += 1,
        }
        if matches!(
            exercise.status,
            ExerciseStatus::Running | ExerciseStatus::Paused
        ) {
            stats.active_participants += exercise.participant_count;
        }
    }
    stats
}

#[cfg(test)]
#[path = "tests/collections_tests.rs"]
mod tests;
