use super::*;
use storage::{MemoryStore, StoreTeamRepository, TEAM_CONFIGS_KEY};

fn manager() -> (Arc<MemoryStore>, TeamConfigManager) {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(StoreTeamRepository::new(store.clone()));
    let manager = TeamConfigManager::new(
        repo,
        ExerciseId::new("exercise-1"),
        OrganizationId::new("org-1"),
    );
    (store, manager)
}

#[tokio::test]
async fn load_seeds_single_default_team() {
    let (_, manager) = manager();
    let teams = manager.load().await.expect("load");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].team_id, TeamId::new("team-1"));
    assert_eq!(teams[0].color, TEAM_COLOR_PALETTE[0]);
}

#[tokio::test]
async fn corrupt_store_falls_back_to_default_team() {
    let (store, manager) = manager();
    store.set(TEAM_CONFIGS_KEY, "[{broken").await.expect("set");
    let teams = manager.load().await.expect("load");
    assert_eq!(teams.len(), 1);
}

#[tokio::test]
async fn added_teams_take_first_unused_colour() {
    let (_, manager) = manager();
    let blue = manager.add_team("Blue Team").await.expect("add");
    assert_eq!(blue.team_id, TeamId::new("team-2"));
    assert_eq!(blue.color, TEAM_COLOR_PALETTE[1]);

    let green = manager.add_team("Green Team").await.expect("add");
    assert_eq!(green.color, TEAM_COLOR_PALETTE[2]);

    manager.remove_team(&blue.team_id).await.expect("remove");
    let next = manager.add_team("Purple Team").await.expect("add");
    assert_eq!(next.color, TEAM_COLOR_PALETTE[1], "freed colour is reused");
    assert_eq!(next.team_id, TeamId::new("team-4"));
}

#[tokio::test]
async fn colours_cycle_when_palette_exhausted() {
    let (_, manager) = manager();
    for i in 0..TEAM_COLOR_PALETTE.len() - 1 {
        manager.add_team(&format!("Team {}", i + 2)).await.expect("add");
    }
    let teams = manager.load().await.expect("load");
    assert_eq!(teams.len(), TEAM_COLOR_PALETTE.len());
    assert_eq!(next_team_color(&teams), TEAM_COLOR_PALETTE[0]);
}

#[tokio::test]
async fn last_team_cannot_be_removed() {
    let (_, manager) = manager();
    let teams = manager.load().await.expect("load");
    let err = manager
        .remove_team(&teams[0].team_id)
        .await
        .expect_err("last team");
    assert!(matches!(err, TeamConfigError::LastTeam));
    assert_eq!(manager.load().await.expect("load").len(), 1);
}

#[tokio::test]
async fn unknown_team_is_reported() {
    let (_, manager) = manager();
    let err = manager
        .remove_team(&TeamId::new("team-99"))
        .await
        .expect_err("unknown");
    assert!(matches!(err, TeamConfigError::UnknownTeam(_)));
}

#[tokio::test]
async fn update_renames_and_recolours() {
    let (_, manager) = manager();
    let updated = manager
        .update_team(&TeamId::new("team-1"), Some(" Red Team "), Some("#000000"))
        .await
        .expect("update");
    assert_eq!(updated.team_name, "Red Team");
    assert_eq!(updated.color, "#000000");

    let err = manager
        .update_team(&TeamId::new("team-1"), Some("  "), None)
        .await
        .expect_err("empty");
    assert!(matches!(err, TeamConfigError::EmptyName));
}

#[tokio::test]
async fn reset_restores_default_and_clears_dashboard_state() {
    let (store, manager) = manager();
    manager.add_team("Blue").await.expect("add");
    store.set(TEAM_DASHBOARD_KEY, "{\"tab\":2}").await.expect("set");

    let teams = manager.reset().await.expect("reset");
    reset_team_dashboard(store.as_ref()).await.expect("clear");

    assert_eq!(teams.len(), 1);
    assert_eq!(store.get(TEAM_DASHBOARD_KEY).await.expect("get"), None);
}
