use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidtube_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    routes::build_router,
    services::media::media_store_from_config,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidtube_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        access_token_secret = %mask_secret(&config.access_token_secret),
        access_token_expiry_minutes = config.access_token_expiry_minutes,
        refresh_token_secret = %mask_secret(&config.refresh_token_secret),
        refresh_token_expiry_days = config.refresh_token_expiry_days,
        cors_allow_origins = ?config.cors_allow_origins,
        media_store = if config.cloudinary.is_some() { "cloudinary" } else { "disk" },
        rate_limit_enabled = config.rate_limit_enabled,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let media = media_store_from_config(&config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = build_router(AppState::new(pool, config, media))?;

    // Start server
    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
