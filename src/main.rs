//! Login Sentinel server binary

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use login_sentinel::storage::PgLedger;
use login_sentinel::{config::Config, create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_sentinel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Login Sentinel starting...");
    if config.load_test_mode {
        tracing::warn!("LOAD_TEST_MODE is on: rate limiters are disabled");
    }

    // Initialize database pool and schema
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let ledger = Arc::new(PgLedger::new(pool));
    db::seed_admin(ledger.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("admin seeding failed: {e}"))?;

    // Build application state and router
    let state = AppState::new(config.clone(), ledger);
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
