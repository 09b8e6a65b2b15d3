//! Drawing retention sweeper.
//!
//! Uploaded drawings carry a persisted `expires_at` deadline. The sweeper wakes up on
//! a fixed interval and removes every drawing past its deadline: blob first, then the
//! row. Analyses that referenced the drawing keep their results (`drawing_id` is set
//! to NULL by the foreign key).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::handlers::Drawings;
use crate::storage::DrawingStorage;
use crate::types::abbrev_uuid;

/// Upper bound on drawings removed per pass; the rest wait for the next tick.
const SWEEP_BATCH_SIZE: i64 = 500;

/// Remove every drawing whose deadline is at or before `now`. Returns how many were purged.
///
/// A drawing whose blob cannot be deleted is left in place and retried on the next pass.
pub async fn sweep_once(pool: &PgPool, storage: &dyn DrawingStorage, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let mut conn = pool.acquire().await?;
    let expired = Drawings::new(&mut conn).list_expired(now, SWEEP_BATCH_SIZE).await?;

    let mut purged = 0;
    for drawing in expired {
        if let Err(e) = storage.delete(&drawing.storage_key).await {
            warn!(drawing_id = %abbrev_uuid(&drawing.id), error = %e, "Failed to delete expired drawing blob");
            continue;
        }

        if Drawings::new(&mut conn).purge(drawing.id).await? {
            purged += 1;
            debug!(drawing_id = %abbrev_uuid(&drawing.id), "Purged expired drawing");
        }
    }

    if purged > 0 {
        counter!("machplan_drawings_purged_total").increment(purged as u64);
        info!(purged, "Retention sweep removed expired drawings");
    }

    Ok(purged)
}

/// Run [`sweep_once`] on every tick of `interval` until `shutdown` is cancelled.
///
/// The first pass runs immediately, so deadlines that passed while the service was
/// down are honoured right after startup.
pub async fn run_sweeper(pool: PgPool, storage: Arc<dyn DrawingStorage>, interval: Duration, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!("Starting drawing retention sweeper with {:?} interval", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Drawing retention sweeper shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(&pool, storage.as_ref(), Utc::now()).await {
                    warn!(error = %e, "Drawing retention sweep failed");
                }
            }
        }
    }

    Ok(())
}
