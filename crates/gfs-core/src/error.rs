use std::fmt;

/// Machine-readable error codes for scripts and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PolicyNotAvailable,
    InvalidCapacity,
    NoPolicyConfigured,
    InvalidKeyFormat,
    InvalidDateFormat,
    InvalidDate,
    ConfigParseError,
    InputReadFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PolicyNotAvailable => "E1001",
            Self::InvalidCapacity => "E1002",
            Self::NoPolicyConfigured => "E1003",
            Self::InvalidKeyFormat => "E1004",
            Self::InvalidDateFormat => "E1005",
            Self::InvalidDate => "E2001",
            Self::ConfigParseError => "E3001",
            Self::InputReadFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::PolicyNotAvailable => "Policy not available",
            Self::InvalidCapacity => "Invalid cycle capacity",
            Self::NoPolicyConfigured => "No policy configured",
            Self::InvalidKeyFormat => "Invalid cycle key format",
            Self::InvalidDateFormat => "Invalid date format",
            Self::InvalidDate => "Invalid date",
            Self::ConfigParseError => "Config file parse error",
            Self::InputReadFailed => "Input read failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::PolicyNotAvailable => {
                Some("Use one of: daily/day, weekly/week, monthly/month, yearly/year.")
            }
            Self::InvalidCapacity => Some("Every cycle must keep at least 1 bucket."),
            Self::NoPolicyConfigured => {
                Some("Pass at least one of --daily, --weekly, --monthly, --yearly or --keep.")
            }
            Self::InvalidKeyFormat | Self::InvalidDateFormat => {
                Some("Use strftime specifiers understood by chrono, e.g. %Y-%m-%d.")
            }
            Self::InvalidDate => Some("Fix or remove the offending line and retry."),
            Self::ConfigParseError => Some("Fix syntax in gfs.toml and retry."),
            Self::InputReadFailed => Some("Check that the input file exists and is readable."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while building a retention policy or a date format.
///
/// All of these are detected before any timestamp is filtered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("policy not available: {name}")]
    NotAvailable { name: String },

    #[error("invalid capacity {capacity} for cycle {cycle}: policies only accept a positive value")]
    InvalidCapacity { cycle: String, capacity: i64 },

    #[error("no policy configured")]
    NoPolicy,

    #[error("invalid key format {format:?} for cycle {cycle}")]
    InvalidKeyFormat { cycle: String, format: String },

    #[error("invalid date format {format:?}")]
    InvalidDateFormat { format: String },
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotAvailable { .. } => ErrorCode::PolicyNotAvailable,
            Self::InvalidCapacity { .. } => ErrorCode::InvalidCapacity,
            Self::NoPolicy => ErrorCode::NoPolicyConfigured,
            Self::InvalidKeyFormat { .. } => ErrorCode::InvalidKeyFormat,
            Self::InvalidDateFormat { .. } => ErrorCode::InvalidDateFormat,
        }
    }
}

/// A timestamp string that does not match the configured format.
///
/// chrono reports terse reasons such as "input is out of range" without the
/// input, so the raw string is always carried alongside.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid date '{input}' for format {format:?}: {reason}")]
    InvalidDate {
        input: String,
        format: String,
        reason: chrono::ParseError,
    },
}

impl ParseError {
    /// The raw input that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        match self {
            Self::InvalidDate { input, .. } => input,
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidDate
    }
}

/// Umbrella error for the string-level filtering entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GfsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl GfsError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(err) => err.code(),
            Self::Parse(err) => err.code(),
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
