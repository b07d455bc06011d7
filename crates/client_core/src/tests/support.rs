use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral loopback port and returns its base url.
pub(crate) async fn spawn_router(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api/v1"))
}
