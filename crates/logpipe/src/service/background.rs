use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::stream::StreamRouter;

/// Background task that flushes idle multi-line records.
///
/// The line path only notices an expired buffer when the next line of that
/// stream arrives. A trailing record with no follower would otherwise sit in
/// its buffer forever, so this job polls every stream on a fixed interval.
/// Missed ticks are skipped rather than bunched up.
pub async fn flush_expired_streams(router: Arc<StreamRouter>, interval: Duration) {
    info!("Starting timeout flush job (interval: {:?})", interval);

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut tick_count: u64 = 0;
    let mut flushed_total: u64 = 0;

    loop {
        ticker.tick().await;
        tick_count = tick_count.saturating_add(1);

        let flushed = router.flush_expired();
        if flushed > 0 {
            flushed_total = flushed_total.saturating_add(flushed as u64);
            debug!(flushed, streams = router.len(), "timeout flush");
        }

        if tick_count % 1200 == 0 {
            debug!(tick_count, flushed_total, "flush job heartbeat");
        }
    }
}

pub fn spawn_flush_job(router: Arc<StreamRouter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(flush_expired_streams(router, interval))
}
