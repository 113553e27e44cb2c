//! Out-of-band orphan cleanup.
//!
//! Two kinds of orphan can outlive a crash or a failed compensating delete:
//! blobs that no row references, and rows whose blob is gone. The sweep
//! removes the former once they are older than a grace period (an upload's
//! blob exists briefly before its row) and reports or prunes the latter.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, warn};

use super::coordinator::DocumentCoordinator;
use super::error::DocumentError;
use crate::config::SweepConfig;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub blobs_scanned: u64,
    pub orphan_blobs_removed: u64,
    /// Ids of rows whose blob is missing.
    pub dangling_rows: Vec<i32>,
    pub dangling_rows_pruned: u64,
    /// Individual removals that failed; the sweep carries on past them.
    pub errors: u64,
}

impl DocumentCoordinator {
    /// Reconcile the blob store with the index.
    pub async fn sweep_orphans(
        &self,
        grace: Duration,
        prune_dangling: bool,
    ) -> Result<SweepReport, DocumentError> {
        let mut report = SweepReport::default();

        // Blobs first: a row committed after this listing always points at a
        // blob that is either listed or younger than the cutoff.
        let blobs = self.blobs.list().await.map_err(DocumentError::Blob)?;
        let documents = self.index.list().await.map_err(DocumentError::Index)?;

        let referenced: HashSet<_> = documents.iter().map(|d| d.location).collect();
        let present: HashSet<_> = blobs.iter().map(|b| b.location).collect();
        let cutoff = cutoff(grace);

        report.blobs_scanned = blobs.len() as u64;

        for blob in blobs
            .iter()
            .filter(|b| !referenced.contains(&b.location) && b.modified_at <= cutoff)
        {
            match self.blobs.delete(&blob.location).await {
                Ok(true) => {
                    info!(location = %blob.location, size = blob.size, "Removed orphaned blob");
                    report.orphan_blobs_removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(location = %blob.location, error = %e, "Failed to remove orphaned blob");
                    report.errors += 1;
                }
            }
        }

        for doc in documents.iter().filter(|d| !present.contains(&d.location)) {
            // The blob may have been written after the listing.
            match self.blobs.exists(&doc.location).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    error!(document_id = doc.id, error = %e, "Failed to check blob");
                    report.errors += 1;
                    continue;
                }
            }

            warn!(document_id = doc.id, location = %doc.location, "Row has no content");
            report.dangling_rows.push(doc.id);

            if prune_dangling {
                match self.index.delete(doc.id).await {
                    Ok(n) => report.dangling_rows_pruned += n,
                    Err(e) => {
                        error!(document_id = doc.id, error = %e, "Failed to prune row");
                        report.errors += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}

fn cutoff(grace: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(grace)
        .ok()
        .and_then(|grace| Utc::now().checked_sub_signed(grace))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run the orphan sweep as a background task.
pub async fn run_sweeper(coordinator: DocumentCoordinator, config: SweepConfig) {
    if config.interval_secs == 0 {
        info!("Orphan sweep disabled");
        return;
    }

    let grace = Duration::from_secs(config.grace_secs);
    info!(
        interval_secs = config.interval_secs,
        grace_secs = config.grace_secs,
        prune_dangling = config.prune_dangling,
        "Starting orphan sweeper"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));

    loop {
        interval.tick().await;

        match coordinator.sweep_orphans(grace, config.prune_dangling).await {
            Ok(report) => info!(
                blobs_scanned = report.blobs_scanned,
                orphan_blobs_removed = report.orphan_blobs_removed,
                dangling_rows = report.dangling_rows.len(),
                dangling_rows_pruned = report.dangling_rows_pruned,
                errors = report.errors,
                "Orphan sweep finished"
            ),
            Err(e) => error!(error = %e, "Orphan sweep failed"),
        }
    }
}
