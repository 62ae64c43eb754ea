use smart_diet::{AppState, GeminiClient, Settings, load_data, router};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    info!(data_dir = %settings.data_dir.display(), gemini = ?settings.gemini, "starting SmartDiet");

    fs::create_dir_all(&settings.data_dir).await?;
    let data = load_data(&settings.data_dir).await?;
    info!(
        set_up = data.is_set_up(),
        meals = data.meals.len(),
        weights = data.weight_history.len(),
        "loaded saved data"
    );

    let advisor = GeminiClient::new(&settings.gemini)?;
    let state = AppState::new(settings.data_dir.clone(), data, Arc::new(advisor));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
