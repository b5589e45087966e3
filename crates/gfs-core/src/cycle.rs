//! Retention cycles.
//!
//! A cycle maps a timestamp to a bucket key. Timestamps sharing a key fall in
//! the same bucket and only the latest of them survives for that cycle.
//! Keys are `strftime` renderings whose lexical order must follow
//! chronological order (zero-padded, most significant field first).

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ConfigError;

/// A named bucket granularity.
///
/// Two cycles are equal when both the name and the key pattern match, so a
/// custom cycle spelled like a built-in one is the built-in one.
#[derive(Debug, Clone)]
pub enum Cycle {
    Daily,
    /// ISO 8601 week, keyed by ISO week-numbering year so that the last days
    /// of December can share a bucket with the following January.
    Weekly,
    Monthly,
    Yearly,
    Custom { name: String, key_format: String },
}

impl Cycle {
    /// Built-in cycles from the finest to the coarsest granularity.
    pub const BUILTIN: [Self; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly];

    /// Create a custom cycle keyed by a `strftime` pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKeyFormat`] if the pattern is empty or
    /// contains a specifier chrono does not understand.
    pub fn custom(name: impl Into<String>, key_format: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let key_format = key_format.into();

        if !is_valid_pattern(&key_format) {
            return Err(ConfigError::InvalidKeyFormat {
                cycle: name,
                format: key_format,
            });
        }

        Ok(Self::Custom { name, key_format })
    }

    /// Cycle name as used in configuration and output.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Custom { name, .. } => name,
        }
    }

    /// The `strftime` pattern that renders the bucket key.
    #[must_use]
    pub fn key_format(&self) -> &str {
        match self {
            Self::Daily => "%Y-%m-%d",
            Self::Weekly => "%G-W%V",
            Self::Monthly => "%Y-%m",
            Self::Yearly => "%Y",
            Self::Custom { key_format, .. } => key_format,
        }
    }

    /// Bucket key of a timestamp under this cycle.
    #[must_use]
    pub fn key(&self, timestamp: &NaiveDateTime) -> String {
        timestamp.format(self.key_format()).to_string()
    }
}

impl PartialEq for Cycle {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.key_format() == other.key_format()
    }
}

impl Eq for Cycle {}

impl Hash for Cycle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.key_format().hash(state);
    }
}

pub(crate) fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty() && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cycle {
    type Err = ConfigError;

    /// Parse a built-in cycle name. Accepts singular aliases, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            _ => Err(ConfigError::NotAvailable {
                name: s.to_string(),
            }),
        }
    }
}
