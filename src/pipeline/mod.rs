//! Poll, route, dispatch
//!
//! Wiring is explicit: [`Pipeline::new`] validates the configuration, prepares
//! the input directory and builds the watcher and the lane consumers.
//! [`Pipeline::run`] drives them from a fixed-delay timer until cancelled;
//! [`Pipeline::run_cycle`] executes a single cycle inline.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod dispatch;
mod lanes;

pub use dispatch::{Disposition, Dispatcher, Outcome};
pub use lanes::LaneWorkers;

use crate::config::{Config, ErrorPolicy};
use crate::error::Result;
use crate::file::FileEvent;
use crate::report::ErrorReporter;
use crate::route::{route, Lane};
use crate::watch::DirectoryWatcher;

/// Counters over the life of a pipeline
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub cycles: u64,
    pub moved_csv: u64,
    pub moved_txt: u64,
    pub reported: u64,
    pub quarantined: u64,
    pub failed: u64,
}

impl PipelineStats {
    pub fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Moved { lane: Lane::Csv, .. } => self.moved_csv += 1,
            Disposition::Moved { lane: Lane::Txt, .. } => self.moved_txt += 1,
            Disposition::Moved { lane: Lane::Error, .. } | Disposition::Quarantined { .. } => {
                self.quarantined += 1
            }
            Disposition::Reported => self.reported += 1,
            Disposition::Failed => self.failed += 1,
        }
    }

    pub fn total_moved(&self) -> u64 {
        self.moved_csv + self.moved_txt
    }

    pub fn print_summary(&self) {
        info!("Pipeline stopped after {} poll cycles:", self.cycles);
        info!("  csv moved: {}", self.moved_csv);
        info!("  txt moved: {}", self.moved_txt);
        info!("  reported: {}", self.reported);
        if self.quarantined > 0 {
            info!("  quarantined: {}", self.quarantined);
        }
        if self.failed > 0 {
            info!("  failed deliveries: {}", self.failed);
        }
    }
}

/// Upper bound on files handed to lane workers and not yet completed
pub const MAX_IN_FLIGHT: usize = Lane::ALL.len();

pub struct Pipeline {
    config: Config,
    watcher: DirectoryWatcher,
    dispatcher: Arc<Dispatcher>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline. Fails only on configuration-level errors.
    pub fn new(config: Config, reporter: Arc<dyn ErrorReporter>) -> Result<Self> {
        config.validate()?;

        let watcher = DirectoryWatcher::new(&config.input_dir)
            .max_per_poll(config.max_files_per_poll)
            .min_file_age(config.min_file_age())
            .ignore_hidden(config.ignore_hidden)
            .report_once(matches!(config.error_policy, ErrorPolicy::Once));
        watcher.prepare()?;

        let dispatcher = Arc::new(Dispatcher::new(&config, reporter));

        Ok(Self {
            config,
            watcher,
            dispatcher,
            stats: PipelineStats::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn input_dir(&self) -> &Path {
        self.watcher.input()
    }

    /// Run one poll cycle, handling admitted files inline
    pub async fn run_cycle(&mut self) -> Vec<Outcome> {
        let batch = self.watcher.poll();
        let mut outcomes = Vec::with_capacity(batch.len());

        for event in batch {
            let lane = route(&event);
            debug!("Routing {} to {} lane", event.name, lane);
            let outcome = self.dispatcher.dispatch(lane, &event).await;
            self.complete(&outcome);
            outcomes.push(outcome);
        }

        self.stats.cycles += 1;
        outcomes
    }

    /// Poll on a fixed delay until `shutdown` is cancelled
    ///
    /// Each lane is consumed by its own worker task. In-flight files are
    /// drained before this returns.
    pub async fn run(mut self, shutdown: CancellationToken) -> PipelineStats {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let lanes = LaneWorkers::spawn(self.dispatcher.clone(), done_tx);

        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watching {} every {:?} (max {} per poll)",
            self.watcher.input().display(),
            self.config.poll_interval(),
            self.config.max_files_per_poll
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            while let Ok(outcome) = done_rx.try_recv() {
                self.complete(&outcome);
            }

            for event in self.admit() {
                let lane = route(&event);
                debug!("Routing {} to {} lane", event.name, lane);
                if let Err(event) = lanes.send(lane, event) {
                    warn!("{} lane is closed, releasing {}", lane, event.path.display());
                    self.watcher.complete(&event.path, &Disposition::Failed);
                }
            }

            self.stats.cycles += 1;
        }

        lanes.shutdown().await;
        while let Ok(outcome) = done_rx.try_recv() {
            self.complete(&outcome);
        }

        self.stats
    }

    /// Poll for new files without exceeding [`MAX_IN_FLIGHT`]
    ///
    /// Files stay in flight from admission until their lane worker reports
    /// back, so a slow lane stops new admissions instead of queueing them.
    fn admit(&mut self) -> Vec<FileEvent> {
        let room = MAX_IN_FLIGHT.saturating_sub(self.watcher.in_flight());
        if room == 0 {
            debug!("{} files in flight, skipping admission", self.watcher.in_flight());
        }
        self.watcher.poll_at_most(room)
    }

    fn complete(&mut self, outcome: &Outcome) {
        self.watcher.complete(&outcome.path, &outcome.disposition);
        self.stats.record(&outcome.disposition);
    }
}
