use std::time::{Duration, Instant};

use chrono::Local;
use tracing::info;

use crate::class::ClassStats;
use crate::engine::DispatchEngine;

/// Per-class activity since the previous snapshot, plus the current backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    pub class: usize,
    pub name: Option<String>,
    pub in_pkts: u64,
    pub drop_pkts: u64,
    pub out_pkts: u64,
    pub out_bytes: u64,
    pub backlog_pkts: usize,
}

/// Periodic per-class counters for a running engine.
pub struct Monitor {
    name: String,
    interval: Duration,
    last_report: Instant,
    last_stats: Vec<ClassStats>,
    last_engine_drops: u64,
}

impl Monitor {
    pub fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            last_report: Instant::now(),
            last_stats: Vec::new(),
            last_engine_drops: 0,
        }
    }

    /// Deltas since the last call, and the engine-level drops in that window.
    pub fn snapshot<T: AsRef<[u8]>>(&mut self, engine: &DispatchEngine<T>) -> (Vec<ClassReport>, u64) {
        let classes = engine.traffic_classes();
        self.last_stats.resize(classes.len(), ClassStats::default());

        let reports = classes
            .iter()
            .zip(self.last_stats.iter_mut())
            .enumerate()
            .map(|(class, (tc, last))| {
                let now = tc.stats();
                let report = ClassReport {
                    class,
                    name: tc.name().map(str::to_string),
                    in_pkts: now.enqueued - last.enqueued,
                    drop_pkts: now.dropped - last.dropped,
                    out_pkts: now.dequeued - last.dequeued,
                    out_bytes: now.dequeued_bytes - last.dequeued_bytes,
                    backlog_pkts: tc.len(),
                };
                *last = now;
                report
            })
            .collect();

        let engine_drops = engine.engine_drops() - self.last_engine_drops;
        self.last_engine_drops = engine.engine_drops();
        (reports, engine_drops)
    }

    /// Logs a report once per interval. Returns whether one was emitted.
    pub fn maybe_report<T: AsRef<[u8]>>(&mut self, engine: &DispatchEngine<T>) -> bool {
        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return false;
        }

        let (reports, engine_drops) = self.snapshot(engine);
        let stamp = Local::now().format("%H:%M:%S").to_string();
        let secs = elapsed.as_secs_f64();

        for r in &reports {
            let mbps = (r.out_bytes as f64 * 8.0) / 1_000_000.0 / secs;
            info!(
                monitor = %self.name,
                time = %stamp,
                class = r.class,
                name = r.name.as_deref().unwrap_or("-"),
                in_pps = r.in_pkts as f64 / secs,
                drop_pps = r.drop_pkts as f64 / secs,
                out_pps = r.out_pkts as f64 / secs,
                mbps = %format!("{mbps:.2}"),
                backlog = r.backlog_pkts,
                "class report"
            );
        }
        info!(
            monitor = %self.name,
            time = %stamp,
            policy = engine.policy_name(),
            backlog = engine.len(),
            engine_drops,
            "engine report"
        );

        self.last_report = Instant::now();
        true
    }
}
