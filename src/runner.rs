//! Starts N workers and collects one stats record from each

use crate::error::Result;
use crate::interrupt::InterruptFlag;
use crate::model::{Stats, WorkerConfig};
use crate::worker::Worker;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Everything a run produced, in arrival order.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub workers: Vec<Stats>,
    pub total: Stats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Workers that ended without reporting, e.g. by panicking
    pub lost_workers: usize,
}

pub struct Runner {
    config: WorkerConfig,
    interrupt: InterruptFlag,
}

impl Runner {
    pub fn new(config: WorkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            interrupt: InterruptFlag::new(),
        })
    }

    /// Handle for stopping this run from outside, e.g. on Ctrl-C.
    pub fn interrupt(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn stop(&self) {
        self.interrupt.stop();
    }

    pub async fn run(self) -> Result<RunSummary> {
        let concurrency = self.config.concurrency;
        let (tx, mut rx) = mpsc::channel(concurrency);

        let mut workers = Vec::with_capacity(concurrency);
        for rank in 0..concurrency {
            workers.push(Worker::new(
                rank,
                self.config.clone(),
                tx.clone(),
                self.interrupt.clone(),
            )?);
        }
        drop(tx);

        info!(
            url = %self.config.url,
            concurrency,
            duration_s = self.config.duration.as_secs(),
            "starting run"
        );
        let started_at = Utc::now();
        let begin = Instant::now();

        let mut set = JoinSet::new();
        for worker in workers {
            set.spawn(worker.run());
        }

        let mut reports = Vec::with_capacity(concurrency);
        while reports.len() < concurrency {
            match rx.recv().await {
                Some(stats) => reports.push(stats),
                None => break,
            }
        }

        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "worker task did not complete");
            }
        }

        let mut total = Stats::new();
        for stats in &reports {
            total.merge(stats);
        }

        let summary = RunSummary {
            lost_workers: concurrency - reports.len(),
            workers: reports,
            total,
            started_at,
            finished_at: Utc::now(),
            elapsed: begin.elapsed(),
        };
        info!(
            requests = summary.total.num_requests,
            errors = summary.total.num_errs,
            lost_workers = summary.lost_workers,
            "run finished"
        );
        Ok(summary)
    }
}
