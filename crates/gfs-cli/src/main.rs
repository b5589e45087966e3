#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::filter::Selection;
use gfs_core::config::load_user_config;
use gfs_core::timing;
use output::OutputMode;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gfs: grandfather-father-son backup retention",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format. Overrides `--json`, `FORMAT` and the user config.
    #[arg(long, global = true, value_enum, value_name = "FORMAT")]
    format: Option<OutputMode>,

    /// Suppress headings and counts; print bare dates.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, environment and user config.
    fn output_mode(&self, user_output: Option<&str>) -> OutputMode {
        let mode = output::resolve_output_mode(self.format, self.json, user_output);
        if self.quiet && mode == OutputMode::Pretty {
            OutputMode::Text
        } else {
            mode
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Retention",
        about = "Print the dates to keep",
        after_help = "EXAMPLES:\n    # Keep 7 daily, 4 weekly and 12 monthly backups\n    ls /backups | gfs keep -d 7 -w 4 -m 12\n\n    # Timestamps with hours, keeping one per hour for a day\n    gfs keep -f '%Y-%m-%dT%H' --cycle 'hourly=%Y-%m-%dT%H' --keep hourly=24 dates.txt"
    )]
    Keep(cmd::filter::FilterArgs),

    #[command(
        next_help_heading = "Retention",
        about = "Print the dates to remove",
        after_help = "EXAMPLES:\n    # Delete everything outside the policy\n    ls /backups | gfs prune -d 7 -w 4 | xargs -I{} rm -r /backups/{}"
    )]
    Prune(cmd::filter::FilterArgs),

    #[command(
        next_help_heading = "Retention",
        about = "Show which dates each cycle keeps",
        after_help = "EXAMPLES:\n    # Per-cycle breakdown as JSON\n    gfs explain --json -d 7 -m 12 dates.txt"
    )]
    Explain(cmd::explain::ExplainArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    gfs completions bash > ~/.local/share/bash-completion/completions/gfs"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GFS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "gfs=debug,info"
        } else {
            "gfs=info,warn"
        })
    });

    let format = env::var("GFS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user_config = load_user_config().unwrap_or_else(|err| {
        warn!("ignoring user config: {err:#}");
        gfs_core::config::UserConfig::default()
    });

    let project_root = env::current_dir()?;
    let output = cli.output_mode(user_config.output.as_deref());

    let command_result = match cli.command {
        Commands::Keep(ref args) => timing::timed("cmd.keep", || {
            cmd::filter::run_filter(args, Selection::Keep, output, &project_root)
        }),
        Commands::Prune(ref args) => timing::timed("cmd.prune", || {
            cmd::filter::run_filter(args, Selection::Prune, output, &project_root)
        }),
        Commands::Explain(ref args) => timing::timed("cmd.explain", || {
            cmd::explain::run_explain(args, output, &project_root)
        }),
        Commands::Completions(ref args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    command_result
}
