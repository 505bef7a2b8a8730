//! Manifest Counter Reconciliation Job
//!
//! Recounts manifest items and repairs `total_packages` where it drifted.

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{error, info};

use crate::services::manifests::reconcile_manifest_counts;

pub async fn start_manifest_reconcile_job(db: DatabaseConnection, interval_secs: u64) {
    tokio::spawn(async move {
        info!(interval_secs, "Manifest reconcile job started");

        let mut interval = interval(TokioDuration::from_secs(interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping manifest reconcile job");
                    break;
                }
                _ = interval.tick() => {
                    match reconcile_manifest_counts(&db).await {
                        Ok(drifts) if drifts.is_empty() => info!("Manifest counters consistent"),
                        Ok(drifts) => info!(repaired = drifts.len(), "Manifest counters repaired"),
                        Err(e) => error!(error = %e, "Manifest reconciliation failed"),
                    }
                }
            }
        }
    });
}
