use crate::model::Stats;
use crate::runner::RunSummary;
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct WorkerRow {
    /// Arrival order, not the worker's rank
    pub index: usize,
    pub requests: u64,
    pub errors: u64,
    pub bytes: u64,
}

/// Final numbers for the reporting front end.
#[derive(Debug, Serialize)]
pub struct Report {
    pub url: String,
    pub concurrency: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub requests: u64,
    pub errors: u64,
    pub num_2x: u64,
    pub num_5x: u64,
    pub num_other: u64,
    pub bytes: u64,
    pub requests_per_sec: f64,
    pub bytes_per_sec: f64,
    /// Latency figures are absent when nothing succeeded
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub lost_workers: usize,
    pub workers: Vec<WorkerRow>,
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

impl Report {
    pub fn new(url: &str, summary: &RunSummary) -> Self {
        let total: &Stats = &summary.total;
        let succeeded = total.num_requests > 0;
        Self {
            url: url.to_string(),
            concurrency: summary.workers.len() + summary.lost_workers,
            started_at: summary.started_at,
            finished_at: summary.finished_at,
            elapsed_secs: summary.elapsed.as_secs_f64(),
            requests: total.num_requests,
            errors: total.num_errs,
            num_2x: total.num_2x,
            num_5x: total.num_5x,
            num_other: total.num_other,
            bytes: total.resp_size,
            requests_per_sec: per_sec(total.num_requests, summary.elapsed),
            bytes_per_sec: per_sec(total.resp_size, summary.elapsed),
            avg_latency_ms: total.avg_request_time().map(millis),
            min_latency_ms: succeeded.then(|| millis(total.min_request_time)),
            max_latency_ms: succeeded.then(|| millis(total.max_request_time)),
            lost_workers: summary.lost_workers,
            workers: summary
                .workers
                .iter()
                .enumerate()
                .map(|(index, stats)| WorkerRow {
                    index,
                    requests: stats.num_requests,
                    errors: stats.num_errs,
                    bytes: stats.resp_size,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable text; `verbose` adds one line per worker.
    pub fn render(&self, verbose: bool) -> Result<String, std::fmt::Error> {
        let latency = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |ms| format!("{ms:.2}ms"));

        let mut out = String::new();
        writeln!(
            out,
            "{} {} with {} workers for {:.2}s",
            style("target").bold(),
            self.url,
            self.concurrency,
            self.elapsed_secs
        )?;
        writeln!(
            out,
            "{} requests in {:.2}s, {} read",
            style(self.requests).green(),
            self.elapsed_secs,
            human_bytes(self.bytes)
        )?;
        writeln!(out, "requests/sec:  {:.2}", self.requests_per_sec)?;
        writeln!(out, "transfer/sec:  {}", human_bytes(self.bytes_per_sec as u64))?;
        writeln!(out, "avg latency:   {}", latency(self.avg_latency_ms))?;
        writeln!(out, "min latency:   {}", latency(self.min_latency_ms))?;
        writeln!(out, "max latency:   {}", latency(self.max_latency_ms))?;
        writeln!(
            out,
            "2xx: {}  5xx: {}  other: {}  errors: {}",
            self.num_2x,
            style(self.num_5x).yellow(),
            self.num_other,
            style(self.errors).red()
        )?;
        if self.lost_workers > 0 {
            writeln!(
                out,
                "{}",
                style(format!("{} workers did not report", self.lost_workers)).red()
            )?;
        }
        if verbose {
            for row in &self.workers {
                writeln!(
                    out,
                    "  worker {:>3}: {} requests, {} errors, {}",
                    row.index,
                    row.requests,
                    row.errors,
                    human_bytes(row.bytes)
                )?;
            }
        }
        Ok(out)
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2}{}", UNITS[unit])
}
