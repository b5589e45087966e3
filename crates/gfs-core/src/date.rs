//! Text <-> timestamp adaptation with one shared `strftime` pattern.

use chrono::NaiveDateTime;
use chrono::format::{ParseResult, Parsed, StrftimeItems, parse};
use std::fmt;

use crate::cycle::is_valid_pattern;
use crate::error::{ConfigError, ParseError};

/// Pattern used when neither the command line nor a config file sets one.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated `strftime` pattern used to parse inputs and format outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateFormat {
    pattern: String,
}

impl DateFormat {
    /// Validate and wrap a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDateFormat`] if the pattern is empty or
    /// contains an unknown specifier.
    pub fn new(pattern: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        if !is_valid_pattern(&pattern) {
            return Err(ConfigError::InvalidDateFormat { format: pattern });
        }
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parse one timestamp.
    ///
    /// Fields the pattern does not mention take `strptime` defaults: month
    /// and day 1, hour, minute and second 0.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDate`] carrying the raw input and
    /// chrono's reason when the input does not match the pattern.
    pub fn parse(&self, input: &str) -> Result<NaiveDateTime, ParseError> {
        let mut parsed = Parsed::new();
        parse(&mut parsed, input, StrftimeItems::new(&self.pattern))
            .and_then(|()| fill_defaults(&mut parsed))
            .and_then(|()| parsed.to_naive_datetime_with_offset(0))
            .map_err(|reason| ParseError::InvalidDate {
                input: input.to_string(),
                format: self.pattern.clone(),
                reason,
            })
    }

    /// Parse a batch, stopping at the first invalid input.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] of the first input that fails.
    pub fn parse_all<S: AsRef<str>>(
        &self,
        inputs: impl IntoIterator<Item = S>,
    ) -> Result<Vec<NaiveDateTime>, ParseError> {
        inputs
            .into_iter()
            .map(|input| self.parse(input.as_ref()))
            .collect()
    }

    /// Render a timestamp with this pattern.
    #[must_use]
    pub fn format(&self, timestamp: &NaiveDateTime) -> String {
        timestamp.format(&self.pattern).to_string()
    }
}

/// Fill the fields a pattern left unset. Week- and ordinal-based dates keep
/// chrono's own resolution; Unix timestamps are left alone entirely.
fn fill_defaults(parsed: &mut Parsed) -> ParseResult<()> {
    if parsed.timestamp().is_some() {
        return Ok(());
    }

    let calendar_date = parsed.ordinal().is_none()
        && parsed.isoweek().is_none()
        && parsed.week_from_sun().is_none()
        && parsed.week_from_mon().is_none();
    if calendar_date {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }

    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        // %p without %I
        (Some(_), None) => parsed.set_hour12(12)?,
        // %I without %p
        (None, Some(_)) => parsed.set_ampm(false)?,
        (Some(_), Some(_)) => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    Ok(())
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
