//! `gfs explain`: show which dates each cycle keeps.

use std::path::Path;

use clap::Args;
use gfs_core::{GfsError, timing};
use serde::Serialize;

use crate::cmd::filter::{FilterArgs, fail, prepare};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug, Default, Clone)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Serialize)]
struct CycleReport {
    cycle: String,
    key_format: String,
    capacity: usize,
    kept: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ExplainReport {
    format: String,
    total: usize,
    removed: usize,
    cycles: Vec<CycleReport>,
    retained: Vec<String>,
}

/// Execute `gfs explain`.
pub fn run_explain(args: &ExplainArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let (gfs, dates) = prepare(&args.filter, output, project_root)?;

    let parsed = match gfs.format().parse_all(&dates) {
        Ok(parsed) => parsed,
        Err(err) => return fail(output, &GfsError::from(err)),
    };

    let selection = timing::timed("engine.filter", || gfs.engine().filter_by_cycle(&parsed));
    let retained = selection.union();
    let removed = parsed.iter().filter(|ts| !retained.contains(ts)).count();
    let format = gfs.format();

    let report = ExplainReport {
        format: format.pattern().to_string(),
        total: dates.len(),
        removed,
        cycles: selection
            .iter()
            .map(|survivors| CycleReport {
                cycle: survivors.cycle.to_string(),
                key_format: survivors.cycle.key_format().to_string(),
                capacity: survivors.capacity,
                kept: survivors.kept.iter().map(|ts| format.format(ts)).collect(),
            })
            .collect(),
        retained: retained.iter().map(|ts| format.format(ts)).collect(),
    };

    render_mode(
        output,
        &report,
        |report, w| {
            for cycle in &report.cycles {
                for date in &cycle.kept {
                    writeln!(w, "{}\t{date}", cycle.cycle)?;
                }
            }
            Ok(())
        },
        |report, w| {
            for cycle in &report.cycles {
                pretty_section(
                    w,
                    &format!("{} ({} of {} kept)", cycle.cycle, cycle.kept.len(), cycle.capacity),
                )?;
                for date in &cycle.kept {
                    writeln!(w, "  {date}")?;
                }
                writeln!(w)?;
            }
            pretty_rule(w)?;
            pretty_kv(w, "format", &report.format)?;
            pretty_kv(w, "input", report.total.to_string())?;
            pretty_kv(w, "retained", report.retained.len().to_string())?;
            pretty_kv(w, "removed", report.removed.to_string())
        },
    )
}
