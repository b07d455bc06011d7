use super::*;
use crate::MemoryStore;
use shared::domain::{ExerciseId, OrganizationId};

fn team(id: &str, name: &str, color: &str) -> TeamConfig {
    TeamConfig {
        team_id: TeamId::new(id),
        team_name: name.to_string(),
        color: color.to_string(),
        exercise_id: ExerciseId::new("exercise-1"),
        organization_id: OrganizationId::new("org-1"),
    }
}

fn repository() -> (Arc<MemoryStore>, StoreTeamRepository) {
    let store = Arc::new(MemoryStore::new());
    let repo = StoreTeamRepository::new(store.clone());
    (store, repo)
}

#[tokio::test]
async fn empty_store_lists_no_teams() {
    let (_, repo) = repository();
    assert!(repo.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn set_inserts_then_replaces_in_place() {
    let (_, repo) = repository();
    repo.set(team("team-1", "Red", "#ef4444")).await.expect("set");
    repo.set(team("team-2", "Blue", "#3b82f6")).await.expect("set");
    repo.set(team("team-1", "Crimson", "#ef4444"))
        .await
        .expect("replace");

    let teams = repo.list().await.expect("list");
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].team_name, "Crimson");
    assert_eq!(teams[1].team_name, "Blue");
}

#[tokio::test]
async fn persists_under_team_configs_key() {
    let (store, repo) = repository();
    repo.save_all(&[team("team-1", "Red", "#ef4444")])
        .await
        .expect("save");

    let raw = store
        .get(TEAM_CONFIGS_KEY)
        .await
        .expect("get")
        .expect("stored");
    assert!(raw.contains("\"team_id\":\"team-1\""));
}

#[tokio::test]
async fn remove_reports_whether_team_existed() {
    let (_, repo) = repository();
    repo.set(team("team-1", "Red", "#ef4444")).await.expect("set");
    repo.set(team("team-2", "Blue", "#3b82f6")).await.expect("set");

    assert!(repo.remove(&TeamId::new("team-1")).await.expect("remove"));
    assert!(!repo.remove(&TeamId::new("team-1")).await.expect("remove"));
    assert_eq!(repo.get(&TeamId::new("team-1")).await.expect("get"), None);
}

#[tokio::test]
async fn refuses_to_remove_the_last_team() {
    let (_, repo) = repository();
    repo.set(team("team-1", "Red", "#ef4444")).await.expect("set");

    let err = repo
        .remove(&TeamId::new("team-1"))
        .await
        .expect_err("last team");
    assert!(err.to_string().contains("last team"));
    assert_eq!(repo.list().await.expect("list").len(), 1);
}
