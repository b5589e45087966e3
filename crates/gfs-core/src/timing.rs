//! Opt-in stage timing for a single `gfs` run.
//!
//! Enabled by `--timing` or `GFS_TIMING`. Samples are kept per thread and
//! drained into a [`TimingReport`] at the end of the run.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Aggregated timings, one row per stage name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

/// Timing statistics for one named stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub name: String,
    pub count: usize,
    pub total_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

thread_local! {
    static SAMPLES: RefCell<Vec<(&'static str, Duration)>> = const { RefCell::new(Vec::new()) };
}

static TIMING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns true when `GFS_TIMING` is set to `1`, `true`, `yes` or `on`.
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("GFS_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(&value))
}

pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::Relaxed)
}

pub fn clear_timings() {
    SAMPLES.with(|samples| samples.borrow_mut().clear());
}

/// Run `f`, recording its duration under `stage` when timing is enabled.
pub fn timed<R>(stage: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }

    let started = Instant::now();
    let result = f();
    record(stage, started.elapsed());
    result
}

/// Drain this thread's samples into a report sorted by stage name.
#[must_use]
pub fn collect_report() -> TimingReport {
    let samples = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));

    let mut grouped: BTreeMap<&'static str, Vec<Duration>> = BTreeMap::new();
    for (stage, elapsed) in samples {
        grouped.entry(stage).or_default().push(elapsed);
    }

    let stages = grouped
        .into_iter()
        .map(|(name, mut values)| {
            values.sort_unstable();
            StageTiming {
                name: name.to_string(),
                count: values.len(),
                total_us: micros(values.iter().sum()),
                p50_us: micros(percentile(&values, 50)),
                p95_us: micros(percentile(&values, 95)),
                p99_us: micros(percentile(&values, 99)),
                max_us: micros(values.last().copied().unwrap_or_default()),
            }
        })
        .collect();

    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Plain table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.stages.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("stage              count      total        p50        p95        p99        max\n");
        out.push_str("--------------------------------------------------------------------------------\n");
        for stage in &self.stages {
            let _ = writeln!(
                out,
                "{:<16} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
                stage.name,
                stage.count,
                format_micros(stage.total_us),
                format_micros(stage.p50_us),
                format_micros(stage.p95_us),
                format_micros(stage.p99_us),
                format_micros(stage.max_us),
            );
        }
        out
    }
}

fn record(stage: &'static str, elapsed: Duration) {
    SAMPLES.with(|samples| samples.borrow_mut().push((stage, elapsed)));
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = pct.min(100).saturating_mul(sorted.len()).saturating_add(99) / 100;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn format_micros(micros: u64) -> String {
    if micros >= 1_000_000 {
        format!("{}.{:03}s", micros / 1_000_000, (micros % 1_000_000) / 1_000)
    } else if micros >= 1_000 {
        format!("{}.{:03}ms", micros / 1_000, micros % 1_000)
    } else {
        format!("{micros}µs")
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|truthy| value.trim().eq_ignore_ascii_case(truthy))
}
