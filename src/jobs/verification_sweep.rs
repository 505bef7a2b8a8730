//! Pending Verification Sweep Job
//!
//! A verification attempt whose caller went away mid-lookup would stay
//! `pending` forever. This job fails every attempt older than the TTL.
//! Supports graceful shutdown via SIGINT.

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, error, info};

use crate::services::address_verification::sweep_pending_verifications;

/// Start the pending verification sweep
///
/// # Arguments
///
/// * `db` - Database connection
/// * `ttl_secs` - Age after which a pending attempt is expired
/// * `interval_secs` - Time between sweeps
pub async fn start_verification_sweep_job(db: DatabaseConnection, ttl_secs: i64, interval_secs: u64) {
    tokio::spawn(async move {
        info!(ttl_secs, interval_secs, "Verification sweep job started");

        let mut interval = interval(TokioDuration::from_secs(interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping verification sweep job");
                    break;
                }
                _ = interval.tick() => {
                    match sweep_pending_verifications(&db, ttl_secs).await {
                        Ok(0) => debug!("No stale verifications"),
                        Ok(expired) => info!(expired, "Verification sweep complete"),
                        Err(e) => error!(error = %e, "Verification sweep failed"),
                    }
                }
            }
        }
    });
}
