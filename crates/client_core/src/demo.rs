//! Fixture data served when no backend is configured.

use chrono::{DateTime, TimeZone, Utc};
use shared::domain::{
    Difficulty, Exercise, ExerciseId, ExerciseStatus, Scenario, ScenarioId, ScenarioStatus,
    ScenarioType, TeamId,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn demo_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id: ScenarioId::new("scenario-ransomware"),
            name: "Ransomware Outbreak".into(),
            description: "Contain a spreading ransomware infection across a corporate network."
                .into(),
            scenario_type: ScenarioType::Simulation,
            status: ScenarioStatus::Published,
            difficulty: Difficulty::Intermediate,
            duration: 120,
            teams_required: 2,
            objectives: strings(&[
                "Identify patient zero",
                "Isolate infected hosts",
                "Restore from backups",
            ]),
            prerequisites: strings(&["Windows forensics basics"]),
            tags: strings(&["ransomware", "incident-response"]),
            created_at: at(1, 9),
            updated_at: at(4, 15),
        },
        Scenario {
            id: ScenarioId::new("scenario-apt"),
            name: "APT Lateral Movement".into(),
            description: "Hunt a persistent adversary moving laterally through Active Directory."
                .into(),
            scenario_type: ScenarioType::LiveFire,
            status: ScenarioStatus::Published,
            difficulty: Difficulty::Expert,
            duration: 240,
            teams_required: 3,
            objectives: strings(&["Detect credential theft", "Map attacker foothold"]),
            prerequisites: strings(&["Threat hunting", "SIEM querying"]),
            tags: strings(&["apt", "active-directory"]),
            created_at: at(2, 10),
            updated_at: at(6, 11),
        },
        Scenario {
            id: ScenarioId::new("scenario-phishing"),
            name: "Phishing Response Tabletop".into(),
            description: "Walk through escalation and communication after a phishing campaign."
                .into(),
            scenario_type: ScenarioType::Tabletop,
            status: ScenarioStatus::Draft,
            difficulty: Difficulty::Beginner,
            duration: 60,
            teams_required: 1,
            objectives: strings(&["Practice escalation paths"]),
            prerequisites: Vec::new(),
            tags: strings(&["phishing", "communications"]),
            created_at: at(3, 8),
            updated_at: at(3, 8),
        },
        Scenario {
            id: ScenarioId::new("scenario-ics"),
            name: "Industrial Control Intrusion".into(),
            description: "Defend a simulated water treatment plant from an OT intrusion.".into(),
            scenario_type: ScenarioType::Hybrid,
            status: ScenarioStatus::Archived,
            difficulty: Difficulty::Advanced,
            duration: 180,
            teams_required: 4,
            objectives: strings(&["Protect PLC logic", "Maintain safe operations"]),
            prerequisites: strings(&["ICS protocols"]),
            tags: strings(&["ics", "ot"]),
            created_at: at(5, 14),
            updated_at: at(9, 16),
        },
    ]
}

pub fn demo_exercises() -> Vec<Exercise> {
    vec![
        Exercise {
            id: ExerciseId::new("exercise-spring-red"),
            name: "Spring Red/Blue".into(),
            description: "Quarterly red versus blue exercise.".into(),
            scenario_id: ScenarioId::new("scenario-apt"),
            scenario_name: "APT Lateral Movement".into(),
            status: ExerciseStatus::Running,
            participant_count: 18,
            teams: vec![TeamId::new("team-1"), TeamId::new("team-2")],
            scheduled_start: Some(at(12, 9)),
            estimated_end: Some(at(12, 13)),
        },
        Exercise {
            id: ExerciseId::new("exercise-onboarding"),
            name: "Analyst Onboarding".into(),
            description: "Introductory ransomware drill for new analysts.".into(),
            scenario_id: ScenarioId::new("scenario-ransomware"),
            scenario_name: "Ransomware Outbreak".into(),
            status: ExerciseStatus::Configured,
            participant_count: 6,
            teams: vec![TeamId::new("team-1")],
            scheduled_start: Some(at(20, 10)),
            estimated_end: None,
        },
        Exercise {
            id: ExerciseId::new("exercise-board"),
            name: "Board Tabletop".into(),
            description: String::new(),
            scenario_id: ScenarioId::new("scenario-phishing"),
            scenario_name: "Phishing Response Tabletop".into(),
            status: ExerciseStatus::Completed,
            participant_count: 9,
            teams: vec![TeamId::new("team-1")],
            scheduled_start: None,
            estimated_end: None,
        },
    ]
}
