use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saylogix_backend::config::AppConfig;
use saylogix_backend::jobs::{manifest_reconcile, verification_sweep};
use saylogix_backend::router::app_router;
use saylogix_backend::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saylogix_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    verification_sweep::start_verification_sweep_job(
        db.clone(),
        config.verification_pending_ttl_secs,
        config.verification_sweep_interval_secs,
    )
    .await;
    manifest_reconcile::start_manifest_reconcile_job(
        db.clone(),
        config.manifest_reconcile_interval_secs,
    )
    .await;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db, config).expect("Failed to build address provider clients");

    let app = app_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");
}
