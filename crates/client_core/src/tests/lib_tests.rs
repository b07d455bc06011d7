use super::*;
use storage::MemoryStore;

fn context(settings: Settings) -> ScipContext {
    ScipContext::new(settings, Arc::new(MemoryStore::new())).expect("context")
}

#[tokio::test]
async fn demo_login_token_reaches_separate_orchestration_host() {
    let ctx = context(Settings {
        orchestration_url: "http://127.0.0.1:9/orchestrator".into(),
        ..Settings::default()
    });

    ctx.auth.login("anyone@example.com", "pw").await.expect("demo login");
    assert_eq!(ctx.orchestration.api().token().await, None);

    ctx.share_token().await;
    assert_eq!(
        ctx.orchestration.api().token().await.as_deref(),
        Some(auth::DEMO_TOKEN)
    );
}

#[tokio::test]
async fn restored_session_is_shared_with_every_client() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = ScipContext::new(Settings::default(), store.clone()).expect("context");
    first.auth.login("a@b.c", "pw").await.expect("demo login");

    let second = ScipContext::new(Settings::default(), store).expect("context");
    second.restore_session().await.expect("restore");
    assert!(second.auth.is_authenticated().await);
    assert_eq!(second.api.token().await.as_deref(), Some(auth::DEMO_TOKEN));
}

#[tokio::test]
async fn team_manager_uses_context_store() {
    let ctx = context(Settings::default());
    let manager = ctx.team_manager(ExerciseId::new("ex-1"), OrganizationId::new("org-1"));
    let teams = manager.load().await.expect("load");
    assert_eq!(teams.len(), 1);
    assert!(ctx
        .store
        .get(storage::TEAM_CONFIGS_KEY)
        .await
        .expect("read")
        .is_some());
}

#[test]
fn rejects_unparseable_api_url() {
    let result = ScipContext::new(
        Settings {
            api_base_url: "not a url".into(),
            ..Settings::default()
        },
        Arc::new(MemoryStore::new()),
    );
    assert!(result.is_err());
}
