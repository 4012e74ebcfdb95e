use portal_backend::config::ServerConfig;
use portal_backend::domain::seed::seed_demo_data;
use portal_backend::{create_router, initialize_backend};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    info!("Starting portal backend with {:?}", config);

    let app_state = initialize_backend(&config)?;
    if config.seed_demo {
        let demo = seed_demo_data(&app_state)?;
        info!(
            "Demo sessions: parent user_id={:?}, teacher user_id={:?} (year group {:?})",
            demo.parent.user_id, demo.teacher.user_id, demo.teacher.year_group_id
        );
    }

    let app = create_router(app_state, &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
