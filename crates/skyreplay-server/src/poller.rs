//! The ingest poller.
//!
//! Every tick: make sure the boundary set is fresh, fetch the feed, label
//! each pilot with the airspace it is in, and append the rows as one batch
//! stamped with the cycle time. Every `prune_every` cycles a retention sweep
//! removes unprotected rows older than the retention horizon.
//!
//! [`Poller::run`] awaits each cycle before taking the next tick, so a slow
//! cycle defers the following one rather than overlapping it. A direct call
//! to [`Poller::run_cycle`] while another cycle holds the poller returns
//! [`CycleOutcome::Skipped`].

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use skyreplay_core::{sample::Batch, store::SampleStore};
use skyreplay_geo::BoundaryCache;
use tokio::time::MissedTickBehavior;

use crate::feed::{FeedClient, Origin};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
  pub interval:         Duration,
  pub boundary_max_age: Duration,
  pub retention:        Duration,
  /// `0` disables pruning.
  pub prune_every:      u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
  /// Another cycle was still running.
  Skipped,
  Ingested {
    timestamp: i64,
    rows:      usize,
    origin:    Origin,
  },
  /// The batch could not be written. Already logged.
  Failed,
}

pub struct Poller<S> {
  store:      Arc<S>,
  feed:       Arc<FeedClient>,
  boundaries: Arc<BoundaryCache>,
  settings:   PollSettings,
  running:    tokio::sync::Mutex<()>,
  cycles:     AtomicU64,
}

impl<S: SampleStore + 'static> Poller<S> {
  pub fn new(
    store: Arc<S>,
    feed: Arc<FeedClient>,
    boundaries: Arc<BoundaryCache>,
    settings: PollSettings,
  ) -> Self {
    Self {
      store,
      feed,
      boundaries,
      settings,
      running: tokio::sync::Mutex::new(()),
      cycles: AtomicU64::new(0),
    }
  }

  /// Run one ingest cycle. Never returns an error: failures are logged and
  /// the next cycle starts from scratch.
  pub async fn run_cycle(&self) -> CycleOutcome {
    let Ok(_running) = self.running.try_lock() else {
      tracing::warn!("previous poll cycle still running; skipping");
      return CycleOutcome::Skipped;
    };

    if let Err(e) = self.boundaries.ensure_fresh(self.settings.boundary_max_age).await {
      tracing::warn!(error = %e, "boundary refresh failed; keeping previous set");
    }

    let fetched = self.feed.fetch().await;
    let timestamp = Utc::now().timestamp();
    let boundaries = self.boundaries.current();

    let mut batch = Batch::new(timestamp);
    batch.pilots = fetched
      .snapshot
      .pilots
      .iter()
      .cloned()
      .map(|mut pilot| {
        pilot.airspace = boundaries
          .lookup(pilot.latitude, pilot.longitude)
          .map(str::to_owned);
        pilot
      })
      .collect();
    batch.controllers = fetched.snapshot.controllers.clone();

    let rows = if batch.is_empty() {
      0
    } else {
      match self.store.insert_batch(batch).await {
        Ok(rows) => rows,
        Err(e) => {
          tracing::error!(timestamp, error = %e, "failed to store poll batch");
          return CycleOutcome::Failed;
        }
      }
    };
    tracing::info!(timestamp, rows, origin = ?fetched.origin, "poll cycle complete");

    let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
    if self.settings.prune_every > 0 && cycle % self.settings.prune_every == 0 {
      self.prune(timestamp).await;
    }

    CycleOutcome::Ingested { timestamp, rows, origin: fetched.origin }
  }

  async fn prune(&self, now: i64) {
    let horizon = i64::try_from(self.settings.retention.as_secs()).unwrap_or(i64::MAX);
    let cutoff = now.saturating_sub(horizon);
    match self.store.prune(cutoff).await {
      Ok(deleted) => tracing::info!(cutoff, deleted, "retention sweep complete"),
      Err(e) => tracing::error!(cutoff, error = %e, "retention sweep failed"),
    }
  }

  /// Tick until `shutdown` resolves. A tick that comes due while a cycle is
  /// running fires as soon as it finishes. A cycle in progress at shutdown
  /// is allowed to complete.
  pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
    let mut ticker = tokio::time::interval(self.settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(interval = ?self.settings.interval, "poller started");
    loop {
      tokio::select! {
        biased;
        () = &mut shutdown => break,
        _ = ticker.tick() => {
          self.run_cycle().await;
        }
      }
    }
    tracing::info!("poller stopped");
  }
}
