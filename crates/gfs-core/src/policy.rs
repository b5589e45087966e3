//! Retention policy: which cycles to apply and how many buckets each keeps.

use std::num::NonZeroUsize;

use crate::cycle::Cycle;
use crate::error::ConfigError;

/// A validated mapping from [`Cycle`] to the number of buckets it keeps.
///
/// Always holds at least one cycle, and every capacity is at least 1.
/// Cycles iterate in order of first appearance.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    cycles: Vec<(Cycle, NonZeroUsize)>,
}

impl RetentionPolicy {
    /// Build a policy from `(cycle, capacity)` pairs. A repeated cycle takes
    /// the last capacity given for it.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidCapacity`] for any capacity below 1.
    /// - [`ConfigError::NoPolicy`] when no pairs are given.
    pub fn new(cycles: impl IntoIterator<Item = (Cycle, i64)>) -> Result<Self, ConfigError> {
        let mut entries: Vec<(Cycle, NonZeroUsize)> = Vec::new();

        for (cycle, capacity) in cycles {
            let valid = usize::try_from(capacity)
                .ok()
                .and_then(NonZeroUsize::new)
                .ok_or_else(|| ConfigError::InvalidCapacity {
                    cycle: cycle.to_string(),
                    capacity,
                })?;

            match entries.iter_mut().find(|(existing, _)| *existing == cycle) {
                Some(entry) => entry.1 = valid,
                None => entries.push((cycle, valid)),
            }
        }

        if entries.is_empty() {
            return Err(ConfigError::NoPolicy);
        }

        Ok(Self { cycles: entries })
    }

    /// Build a policy from cycle names such as `daily` or `Week`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotAvailable`] for an unrecognized name.
    /// - Any error of [`RetentionPolicy::new`].
    pub fn from_names<S: AsRef<str>>(
        cycles: impl IntoIterator<Item = (S, i64)>,
    ) -> Result<Self, ConfigError> {
        let parsed = cycles
            .into_iter()
            .map(|(name, capacity)| {
                name.as_ref()
                    .parse::<Cycle>()
                    .map(|cycle| (cycle, capacity))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::new(parsed)
    }

    /// Start an incremental builder.
    #[must_use]
    pub const fn builder() -> RetentionPolicyBuilder {
        RetentionPolicyBuilder { cycles: Vec::new() }
    }

    /// Capacity configured for `cycle`, if any.
    #[must_use]
    pub fn capacity(&self, cycle: &Cycle) -> Option<usize> {
        self.cycles
            .iter()
            .find(|(existing, _)| existing == cycle)
            .map(|(_, capacity)| capacity.get())
    }

    /// Configured cycles with their capacities.
    pub fn iter(&self) -> impl Iterator<Item = (&Cycle, usize)> {
        self.cycles
            .iter()
            .map(|(cycle, capacity)| (cycle, capacity.get()))
    }

    /// Number of configured cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Always `false`; an empty policy cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Upper bound on the size of any retained set under this policy.
    #[must_use]
    pub fn total_capacity(&self) -> usize {
        self.cycles
            .iter()
            .map(|(_, capacity)| capacity.get())
            .sum()
    }
}

impl PartialEq for RetentionPolicy {
    /// Order-insensitive: two policies are equal when they map the same
    /// cycles to the same capacities.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(cycle, capacity)| other.capacity(cycle) == Some(capacity))
    }
}

impl Eq for RetentionPolicy {}

/// Incremental construction of a [`RetentionPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicyBuilder {
    cycles: Vec<(Cycle, i64)>,
}

impl RetentionPolicyBuilder {
    /// Keep `capacity` buckets of `cycle`.
    #[must_use]
    pub fn keep(mut self, cycle: Cycle, capacity: i64) -> Self {
        self.cycles.push((cycle, capacity));
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// See [`RetentionPolicy::new`].
    pub fn build(self) -> Result<RetentionPolicy, ConfigError> {
        RetentionPolicy::new(self.cycles)
    }
}
