// src/ingest/scheduler.rs
//! Optional background scheduler: one interval loop per deployment that
//! runs the three source-type cycles each tick. The three cycles never
//! share an external-id namespace, so they run concurrently.

use tokio::task::JoinHandle;
use tracing::warn;

use crate::ingest::{run_cycle, IngestDeps};
use crate::model::SourceType;

#[derive(Clone, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    pub account_id: String,
}

/// Spawn the interval loop. Cycle failures are logged and the loop keeps
/// ticking; an external scheduler can still trigger cycles over HTTP.
pub fn spawn_cycle_scheduler(deps: IngestDeps, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;

            let (rss, yt, poly) = tokio::join!(
                run_cycle(&deps, SourceType::Rss, &cfg.account_id, None),
                run_cycle(&deps, SourceType::Youtube, &cfg.account_id, None),
                run_cycle(&deps, SourceType::Polymarket, &cfg.account_id, None),
            );
            for (label, result) in [("rss", rss), ("youtube", yt), ("polymarket", poly)] {
                if let Err(e) = result {
                    warn!(error = ?e, cycle = label, "scheduled cycle failed");
                }
            }
        }
    })
}
