//! Grandfather-father-son retention engine.
//!
//! Every configured cycle gets its own [`BoundedSortedSet`] keyed by the
//! cycle's bucket key. All candidate timestamps are streamed, in input order,
//! through every set; afterwards each set holds the latest timestamp of each
//! of its newest buckets. The retained set is the union over all cycles.
//!
//! Sets are created per call, so an engine can be reused for independent
//! batches without any state carrying over.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

use crate::collection::BoundedSortedSet;
use crate::cycle::Cycle;
use crate::date::DateFormat;
use crate::error::GfsError;
use crate::policy::RetentionPolicy;
use crate::timing;

// ---------------------------------------------------------------------------
// Per-cycle results
// ---------------------------------------------------------------------------

/// Survivors of one cycle, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSurvivors<T> {
    pub cycle: Cycle,
    pub capacity: usize,
    pub kept: Vec<T>,
}

/// Survivors of every cycle, in policy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSelection<T> {
    cycles: Vec<CycleSurvivors<T>>,
}

impl<T> CycleSelection<T> {
    /// Survivors of `cycle`, if it is part of the policy.
    #[must_use]
    pub fn get(&self, cycle: &Cycle) -> Option<&[T]> {
        self.cycles
            .iter()
            .find(|survivors| survivors.cycle == *cycle)
            .map(|survivors| survivors.kept.as_slice())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CycleSurvivors<T>> {
        self.cycles.iter()
    }

    /// Apply `f` to every kept value.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> CycleSelection<U> {
        CycleSelection {
            cycles: self
                .cycles
                .into_iter()
                .map(|survivors| CycleSurvivors {
                    cycle: survivors.cycle,
                    capacity: survivors.capacity,
                    kept: survivors.kept.into_iter().map(&mut f).collect(),
                })
                .collect(),
        }
    }
}

impl<T: Ord + Clone> CycleSelection<T> {
    /// Union of all cycles' survivors.
    #[must_use]
    pub fn union(&self) -> BTreeSet<T> {
        self.cycles
            .iter()
            .flat_map(|survivors| survivors.kept.iter().cloned())
            .collect()
    }
}

impl<'a, T> IntoIterator for &'a CycleSelection<T> {
    type Item = &'a CycleSurvivors<T>;
    type IntoIter = std::slice::Iter<'a, CycleSurvivors<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cycles.iter()
    }
}

// ---------------------------------------------------------------------------
// RetentionEngine
// ---------------------------------------------------------------------------

/// Applies a [`RetentionPolicy`] to batches of timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionEngine {
    policy: RetentionPolicy,
}

impl RetentionEngine {
    #[must_use]
    pub const fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Per-cycle survivors of `timestamps`.
    pub fn filter_by_cycle<'t>(
        &self,
        timestamps: impl IntoIterator<Item = &'t NaiveDateTime>,
    ) -> CycleSelection<NaiveDateTime> {
        let mut sets: Vec<_> = self
            .policy
            .iter()
            .map(|(cycle, capacity)| {
                let set = BoundedSortedSet::new(capacity, move |ts: &NaiveDateTime| cycle.key(ts));
                (cycle, capacity, set)
            })
            .collect();

        let mut seen = 0usize;
        for timestamp in timestamps {
            trace!(%timestamp, "bucketing candidate");
            for (_, _, set) in &mut sets {
                set.insert(*timestamp);
            }
            seen += 1;
        }

        let cycles = sets
            .into_iter()
            .map(|(cycle, capacity, set)| {
                debug!(
                    cycle = %cycle,
                    capacity,
                    kept = set.len(),
                    candidates = seen,
                    "cycle filtered"
                );
                CycleSurvivors {
                    cycle: cycle.clone(),
                    capacity,
                    kept: set.into_vec(),
                }
            })
            .collect();

        CycleSelection { cycles }
    }

    /// Retained timestamps: the union of every cycle's survivors.
    pub fn filter<'t>(
        &self,
        timestamps: impl IntoIterator<Item = &'t NaiveDateTime>,
    ) -> BTreeSet<NaiveDateTime> {
        self.filter_by_cycle(timestamps).union()
    }
}

// ---------------------------------------------------------------------------
// Gfs: string-level entry points
// ---------------------------------------------------------------------------

/// Raw input lines split into those to keep and those to remove.
///
/// Both lists preserve input order and the original spelling of each line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub keep: Vec<String>,
    pub remove: Vec<String>,
}

/// A [`RetentionEngine`] bound to a [`DateFormat`] for textual timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gfs {
    format: DateFormat,
    engine: RetentionEngine,
}

impl Gfs {
    #[must_use]
    pub const fn new(format: DateFormat, policy: RetentionPolicy) -> Self {
        Self {
            format,
            engine: RetentionEngine::new(policy),
        }
    }

    #[must_use]
    pub const fn format(&self) -> &DateFormat {
        &self.format
    }

    #[must_use]
    pub const fn engine(&self) -> &RetentionEngine {
        &self.engine
    }

    /// Retained dates, chronologically ascending, rendered with the format.
    ///
    /// # Errors
    ///
    /// Returns [`GfsError::Parse`] for the first input that does not match
    /// the format. No partial result is produced.
    pub fn filter_strings<S: AsRef<str>>(&self, dates: &[S]) -> Result<Vec<String>, GfsError> {
        let parsed = self.parse(dates)?;
        let retained = timing::timed("engine.filter", || self.engine.filter(&parsed));
        Ok(retained.iter().map(|ts| self.format.format(ts)).collect())
    }

    /// Per-cycle retained dates rendered with the format.
    ///
    /// # Errors
    ///
    /// Returns [`GfsError::Parse`] for the first input that does not match
    /// the format.
    pub fn filter_strings_by_cycle<S: AsRef<str>>(
        &self,
        dates: &[S],
    ) -> Result<CycleSelection<String>, GfsError> {
        let parsed = self.parse(dates)?;
        let selection = timing::timed("engine.filter", || self.engine.filter_by_cycle(&parsed));
        Ok(selection.map(|ts| self.format.format(&ts)))
    }

    /// Split raw lines into kept and removed ones.
    ///
    /// Matching happens on parsed values, so every line denoting a retained
    /// timestamp is kept, whatever its spelling.
    ///
    /// # Errors
    ///
    /// Returns [`GfsError::Parse`] for the first line that does not match
    /// the format.
    pub fn partition<S: AsRef<str>>(&self, lines: &[S]) -> Result<Partition, GfsError> {
        let parsed = self.parse(lines)?;
        let retained: HashSet<NaiveDateTime> =
            timing::timed("engine.filter", || self.engine.filter(&parsed))
                .into_iter()
                .collect();

        let mut partition = Partition::default();
        for (line, timestamp) in lines.iter().zip(&parsed) {
            let line = line.as_ref().to_string();
            if retained.contains(timestamp) {
                partition.keep.push(line);
            } else {
                partition.remove.push(line);
            }
        }

        debug!(
            keep = partition.keep.len(),
            remove = partition.remove.len(),
            "partitioned input"
        );
        Ok(partition)
    }

    fn parse<S: AsRef<str>>(&self, dates: &[S]) -> Result<Vec<NaiveDateTime>, GfsError> {
        timing::timed("engine.parse", || {
            self.format
                .parse_all(dates.iter().map(AsRef::as_ref))
                .map_err(GfsError::from)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ErrorCode};

    const FMT: &str = "%Y-%m-%dT%H:%M:%S";

    const HISTORY: [&str; 10] = [
        "2017-05-21T22:00:00",
        "2017-05-21T21:00:00",
        "2017-05-20T20:00:00",
        "2017-05-14T19:00:00",
        "2017-05-13T18:00:00",
        "2017-05-07T17:00:00",
        "2017-04-30T16:00:00",
        "2017-04-23T15:00:00",
        "2016-12-25T14:00:00",
        "2015-12-30T13:00:00",
    ];

    fn two_of_each() -> RetentionPolicy {
        RetentionPolicy::new([
            (Cycle::Yearly, 2),
            (Cycle::Monthly, 2),
            (Cycle::Weekly, 2),
            (Cycle::Daily, 2),
        ])
        .expect("valid policy")
    }

    fn gfs() -> Gfs {
        Gfs::new(DateFormat::new(FMT).expect("valid format"), two_of_each())
    }

    #[test]
    fn per_cycle_survivors() {
        let selection = gfs().filter_strings_by_cycle(&HISTORY).expect("filters");

        assert_eq!(
            selection.get(&Cycle::Yearly),
            Some(&["2016-12-25T14:00:00".to_string(), "2017-05-21T22:00:00".to_string()][..])
        );
        assert_eq!(
            selection.get(&Cycle::Monthly),
            Some(&["2017-04-30T16:00:00".to_string(), "2017-05-21T22:00:00".to_string()][..])
        );
        assert_eq!(
            selection.get(&Cycle::Weekly),
            Some(&["2017-05-14T19:00:00".to_string(), "2017-05-21T22:00:00".to_string()][..])
        );
        assert_eq!(
            selection.get(&Cycle::Daily),
            Some(&["2017-05-20T20:00:00".to_string(), "2017-05-21T22:00:00".to_string()][..])
        );
    }

    #[test]
    fn selection_follows_policy_order() {
        let selection = gfs().filter_strings_by_cycle(&HISTORY).expect("filters");
        let names: Vec<_> = selection.iter().map(|s| s.cycle.name()).collect();
        assert_eq!(names, vec!["yearly", "monthly", "weekly", "daily"]);
        assert!(selection.iter().all(|s| s.capacity == 2));
    }

    #[test]
    fn retained_union() {
        let retained = gfs().filter_strings(&HISTORY).expect("filters");
        assert_eq!(
            retained,
            vec![
                "2016-12-25T14:00:00",
                "2017-04-30T16:00:00",
                "2017-05-14T19:00:00",
                "2017-05-20T20:00:00",
                "2017-05-21T22:00:00",
            ]
        );
    }

    #[test]
    fn partition_preserves_input_order() {
        let partition = gfs().partition(&HISTORY).expect("partitions");
        assert_eq!(
            partition.keep,
            vec![
                "2017-05-21T22:00:00",
                "2017-05-20T20:00:00",
                "2017-05-14T19:00:00",
                "2017-04-30T16:00:00",
                "2016-12-25T14:00:00",
            ]
        );
        assert_eq!(
            partition.remove,
            vec![
                "2017-05-21T21:00:00",
                "2017-05-13T18:00:00",
                "2017-05-07T17:00:00",
                "2017-04-23T15:00:00",
                "2015-12-30T13:00:00",
            ]
        );
    }

    #[test]
    fn bad_date_aborts_the_batch() {
        let mut dates = HISTORY.to_vec();
        dates.insert(3, "2017-06-01X13:00:00");

        let err = gfs().filter_strings(&dates).expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::InvalidDate);
        assert!(err.to_string().contains("2017-06-01X13:00:00"));

        assert!(gfs().partition(&dates).is_err());
        assert!(gfs().filter_strings_by_cycle(&dates).is_err());
    }

    #[test]
    fn empty_input_retains_nothing() {
        let none: [&str; 0] = [];
        assert!(gfs().filter_strings(&none).expect("filters").is_empty());
        assert_eq!(gfs().partition(&none).expect("partitions"), Partition::default());
    }

    #[test]
    fn engine_is_reusable_across_batches() {
        let fmt = DateFormat::new(FMT).expect("valid format");
        let engine = RetentionEngine::new(two_of_each());
        let first = fmt.parse_all(HISTORY).expect("parses");
        let second = fmt
            .parse_all(["2020-01-01T00:00:00"])
            .expect("parses");

        let _ = engine.filter(&first);
        let retained = engine.filter(&second);
        assert_eq!(retained.len(), 1);
    }

    #[test]
    fn custom_cycle_buckets_by_hour() {
        let hourly = Cycle::custom("hourly", "%Y-%m-%dT%H").expect("valid");
        let policy = RetentionPolicy::new([(hourly, 2)]).expect("valid");
        let gfs = Gfs::new(DateFormat::new("%Y-%m-%d %H:%M").expect("valid"), policy);

        let retained = gfs
            .filter_strings(&["2020-01-01 10:05", "2020-01-01 10:55", "2020-01-01 11:10", "2020-01-01 09:30"])
            .expect("filters");
        assert_eq!(retained, vec!["2020-01-01 10:55", "2020-01-01 11:10"]);
    }

    #[test]
    fn policy_errors_surface_before_filtering() {
        let err = RetentionPolicy::from_names([("fortnightly", 2)]).expect_err("unknown");
        let err = GfsError::from(err);
        assert_eq!(err.code(), ErrorCode::PolicyNotAvailable);
        assert!(matches!(err, GfsError::Config(ConfigError::NotAvailable { .. })));
    }
}
