//! `gfs keep` / `gfs prune`: split backup dates into kept and removed.
//!
//! Also hosts the policy and input plumbing shared with `gfs explain`.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use gfs_core::config::{ProjectConfig, load_project_config};
use gfs_core::{
    ConfigError, Cycle, DateFormat, ErrorCode, Gfs, GfsError, RetentionPolicy, timing,
};
use serde::Serialize;
use tracing::debug;

use crate::output::{CliError, OutputMode, pretty_section, render_error, render_mode};

/// Arguments shared by `gfs keep`, `gfs prune` and `gfs explain`.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Files with one date per line. Reads stdin when empty or `-`.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// strftime pattern used to parse and print dates [default: %Y-%m-%d].
    #[arg(short = 'f', long, value_name = "PATTERN")]
    pub date_format: Option<String>,

    /// Number of daily buckets to keep.
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub daily: Option<i64>,

    /// Number of weekly (ISO week) buckets to keep.
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub weekly: Option<i64>,

    /// Number of monthly buckets to keep.
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub monthly: Option<i64>,

    /// Number of yearly buckets to keep.
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub yearly: Option<i64>,

    /// Keep N buckets of a named cycle, e.g. `--keep week=4`. Repeatable.
    /// Custom cycles from `--cycle` or the config file are matched first.
    #[arg(short, long, value_name = "CYCLE=N")]
    pub keep: Vec<String>,

    /// Define a custom cycle by its bucket key, e.g.
    /// `--cycle 'hourly=%Y-%m-%dT%H'`. Repeatable.
    #[arg(long = "cycle", value_name = "NAME=PATTERN")]
    pub custom: Vec<String>,

    /// Project config file [default: ./gfs.toml if present].
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl FilterArgs {
    /// `(name, capacity)` pairs given on the command line, in flag order
    /// `--daily`, `--weekly`, `--monthly`, `--yearly`, then `--keep`.
    fn cycle_flags(&self) -> Result<Vec<(String, i64)>, CliError> {
        let mut cycles: Vec<(String, i64)> = [
            ("daily", self.daily),
            ("weekly", self.weekly),
            ("monthly", self.monthly),
            ("yearly", self.yearly),
        ]
        .into_iter()
        .filter_map(|(name, capacity)| capacity.map(|n| (name.to_string(), n)))
        .collect();

        for spec in &self.keep {
            cycles.push(parse_keep_spec(spec)?);
        }
        Ok(cycles)
    }
}

fn parse_cycle_def(def: &str) -> Result<Cycle, CliError> {
    let (name, pattern) = def.split_once('=').ok_or_else(|| {
        CliError::with_details(
            format!("invalid --cycle value '{def}'"),
            "use NAME=PATTERN, e.g. --cycle 'hourly=%Y-%m-%dT%H'",
            ErrorCode::InvalidKeyFormat.code(),
        )
    })?;
    Cycle::custom(name.trim(), pattern).map_err(|err| CliError::from(&err))
}

/// Look `name` up among the custom cycles, latest definition first, then
/// among the built-ins.
fn resolve_cycle(name: &str, custom: &[Cycle]) -> Result<Cycle, ConfigError> {
    custom
        .iter()
        .rev()
        .find(|cycle| cycle.name().eq_ignore_ascii_case(name))
        .cloned()
        .map_or_else(|| name.parse::<Cycle>(), Ok)
}

fn parse_keep_spec(spec: &str) -> Result<(String, i64), CliError> {
    let invalid = || {
        CliError::with_details(
            format!("invalid --keep value '{spec}'"),
            "use CYCLE=N, e.g. --keep weekly=4",
            ErrorCode::InvalidCapacity.code(),
        )
    };

    let (name, count) = spec.split_once('=').ok_or_else(invalid)?;
    let count = count.trim().parse::<i64>().map_err(|_| invalid())?;
    Ok((name.trim().to_string(), count))
}

/// Build the filter from the project config and flags. Flags override the
/// file; cycles from both are merged.
fn resolve_gfs(args: &FilterArgs, config: &ProjectConfig) -> Result<Gfs, CliError> {
    let to_cli = |err: ConfigError| CliError::from(&err);

    let mut cycles = config.cycles().map_err(to_cli)?;
    let mut custom: Vec<Cycle> = cycles
        .iter()
        .map(|(cycle, _)| cycle)
        .filter(|cycle| matches!(cycle, Cycle::Custom { .. }))
        .cloned()
        .collect();
    for def in &args.custom {
        custom.push(parse_cycle_def(def)?);
    }

    for (name, capacity) in args.cycle_flags()? {
        let cycle = resolve_cycle(&name, &custom).map_err(to_cli)?;
        cycles.push((cycle, capacity));
    }
    let policy = RetentionPolicy::new(cycles).map_err(to_cli)?;

    let format = match &args.date_format {
        Some(pattern) => DateFormat::new(pattern.clone()).map_err(to_cli)?,
        None => config
            .date_format()
            .map_err(to_cli)?
            .unwrap_or_default(),
    };

    debug!(
        cycles = policy.len(),
        format = format.pattern(),
        "resolved retention policy"
    );
    Ok(Gfs::new(format, policy))
}

/// Read dates from the given files, or stdin. Blank lines are skipped and
/// surrounding whitespace trimmed.
pub fn read_dates(files: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    timing::timed("input.read", || -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();

        if files.is_empty() {
            collect_lines(io::stdin().lock(), &mut lines).context("Failed to read stdin")?;
        }

        for path in files {
            if path.as_os_str() == "-" {
                collect_lines(io::stdin().lock(), &mut lines).context("Failed to read stdin")?;
                continue;
            }
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            collect_lines(io::BufReader::new(file), &mut lines)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }

        debug!(count = lines.len(), "read input dates");
        Ok(lines)
    })
}

fn collect_lines(reader: impl BufRead, lines: &mut Vec<String>) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    Ok(())
}

/// Load the policy and the input, rendering configuration and input
/// failures in the requested output mode.
pub fn prepare(
    args: &FilterArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<(Gfs, Vec<String>)> {
    let config = match load_project_config(args.config.as_deref(), project_root) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    ErrorCode::ConfigParseError.hint().unwrap_or_default(),
                    ErrorCode::ConfigParseError.code(),
                ),
            )?;
            return Err(err);
        }
    };

    let gfs = match resolve_gfs(args, &config) {
        Ok(gfs) => gfs,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };

    let dates = match read_dates(&args.files) {
        Ok(dates) => dates,
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    ErrorCode::InputReadFailed.hint().unwrap_or_default(),
                    ErrorCode::InputReadFailed.code(),
                ),
            )?;
            return Err(err);
        }
    };

    Ok((gfs, dates))
}

/// Render a library error and turn it into the command's failure.
pub fn fail(output: OutputMode, err: &GfsError) -> anyhow::Result<()> {
    render_error(output, &CliError::from(err))?;
    anyhow::bail!("{err}")
}

// ---------------------------------------------------------------------------
// keep / prune
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Keep,
    Prune,
}

#[derive(Debug, Serialize)]
struct FilterReport {
    selection: Selection,
    format: String,
    total: usize,
    dates: Vec<String>,
}

/// Execute `gfs keep` or `gfs prune`.
pub fn run_filter(
    args: &FilterArgs,
    selection: Selection,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let (gfs, dates) = prepare(args, output, project_root)?;

    let partition = match gfs.partition(&dates) {
        Ok(partition) => partition,
        Err(err) => return fail(output, &err),
    };

    let report = FilterReport {
        selection,
        format: gfs.format().pattern().to_string(),
        total: dates.len(),
        dates: match selection {
            Selection::Keep => partition.keep,
            Selection::Prune => partition.remove,
        },
    };

    render_mode(
        output,
        &report,
        |report, w| write_dates(w, &report.dates),
        |report, w| {
            let heading = match report.selection {
                Selection::Keep => "Dates to keep",
                Selection::Prune => "Dates to remove",
            };
            pretty_section(w, &format!("{heading} ({} of {})", report.dates.len(), report.total))?;
            write_dates(w, &report.dates)
        },
    )
}

fn write_dates(w: &mut dyn Write, dates: &[String]) -> io::Result<()> {
    for date in dates {
        writeln!(w, "{date}")?;
    }
    Ok(())
}
