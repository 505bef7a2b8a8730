use std::env;

use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saylogix_backend::services::manifests::reconcile_manifest_counts;

/// One-off manifest counter repair, for use outside the server's schedule
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saylogix_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    let drifts = reconcile_manifest_counts(&db).await?;

    if drifts.is_empty() {
        tracing::info!("All manifest counters are consistent");
    } else {
        for drift in &drifts {
            tracing::info!(
                "Manifest {}: total_packages {} -> {}",
                drift.manifest_id,
                drift.recorded,
                drift.actual
            );
        }
        tracing::info!("Repaired {} manifest counters", drifts.len());
    }

    Ok(())
}
