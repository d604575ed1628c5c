//! Command-line front end for the mutation engine.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::batch::{BatchDriver, BatchOptions, parse_targets};
use crate::app::engine::{ApplyMode, ApplyReport, MutationEngine};
use crate::app::language::LanguageRegistry;
use crate::app::selection::selection_from_parts;
use crate::domain::model::{Action, Marker, Target};
use crate::infra::config::Config;

/// Comment, uncomment, or toggle lines in source files.
#[derive(Debug, Parser)]
#[command(name = "tgcom", version, long_about = None)]
#[command(args_conflicts_with_subcommands = true, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Comma-separated files, each optionally suffixed with `:lines` (reads stdin when omitted)
    #[arg(short, long, value_name = "FILES")]
    pub file: Option<String>,

    /// Line or range to modify, e.g. `5` or `3-10`
    #[arg(short, long, value_name = "LINES")]
    #[arg(conflicts_with_all = ["start_label", "end_label"])]
    pub line: Option<String>,

    /// Modify the lines after the line containing this label
    #[arg(short, long, value_name = "LABEL", requires = "end_label")]
    pub start_label: Option<String>,

    /// Modify the lines before the line containing this label
    #[arg(short, long, value_name = "LABEL", requires = "start_label")]
    pub end_label: Option<String>,

    /// Language of the input, overriding the file extension
    #[arg(short = 'L', long, conflicts_with = "marker")]
    pub language: Option<String>,

    /// Explicit comment marker, e.g. `;;` or `"<!-- -->"`
    #[arg(short, long)]
    pub marker: Option<String>,

    /// What to do with the selected lines [default: toggle]
    #[arg(short, long, value_enum)]
    pub action: Option<Action>,

    /// Print the would-be changes instead of writing them
    #[arg(short, long, overrides_with = "no_dry_run")]
    pub dry_run: bool,

    /// Write changes even when the configuration enables dry runs
    #[arg(long, overrides_with = "dry_run")]
    pub no_dry_run: bool,
}

impl RunArgs {
    /// The command line wins over the configured default in both directions.
    pub fn dry_run(&self, configured: bool) -> bool {
        if self.no_dry_run {
            false
        } else {
            self.dry_run || configured
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List supported languages and their comment markers
    Languages,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Languages) => list_languages(),
        Some(Command::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "tgcom", &mut io::stdout());
            Ok(())
        }
        None => execute(cli.run),
    }
}

fn execute(args: RunArgs) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let registry = LanguageRegistry::from_config(&config)?;

    let labels = args.start_label.as_deref().zip(args.end_label.as_deref());
    let selection = selection_from_parts(args.line.as_deref(), labels)?;
    let marker = args.marker.as_deref().map(Marker::parse).transpose()?;
    let dry_run = args.dry_run(config.defaults.dry_run);

    let mut options = BatchOptions {
        selection,
        language: args.language,
        marker,
        action: args.action.unwrap_or(config.defaults.action),
        dry_run,
    };

    let driver = BatchDriver::new(&registry);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let reports = match args.file {
        Some(list) => {
            let targets = parse_targets(&list)?;
            driver.apply_all(&targets, &options, &mut out)?
        }
        None => {
            if options.language.is_none() {
                options.language = config.defaults.language.clone();
            }
            let run_config = driver.run_config(Target::Stdin, None, &options)?;
            vec![MutationEngine::new().apply(&run_config, &mut out)?]
        }
    };

    out.flush().context("failed to flush stdout")?;
    log_reports(&reports);
    Ok(())
}

fn log_reports(reports: &[ApplyReport]) {
    for report in reports {
        let mode = match report.mode {
            ApplyMode::Commit => "commit",
            ApplyMode::Preview => "preview",
            ApplyMode::Stream => "stream",
        };
        tracing::info!(
            path = %report.target,
            mode,
            scanned = report.lines_scanned,
            selected = report.lines_selected,
            changed = report.lines_changed,
            "done"
        );
    }
}

fn list_languages() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let registry = LanguageRegistry::from_config(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for language in registry.languages() {
        let extensions = language
            .extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(" ");
        let marker = language.marker.to_string();
        writeln!(out, "{:<12} {marker:<10} {extensions}", language.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_label_selection_and_action() {
        let cli = Cli::try_parse_from([
            "tgcom", "-f", "main.go", "-s", "BEGIN", "-e", "END", "-a", "uncomment", "-d",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.start_label.as_deref(), Some("BEGIN"));
        assert_eq!(cli.run.action, Some(Action::Uncomment));
        assert!(cli.run.dry_run);
    }

    #[test]
    fn line_and_labels_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["tgcom", "-f", "a.go", "-l", "1", "-s", "x", "-e", "y"]);
        assert!(result.is_err());
    }

    #[test]
    fn labels_must_come_in_pairs() {
        let result = Cli::try_parse_from(["tgcom", "-f", "a.go", "-s", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_dry_run_overrides_configured_default() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().run;

        let args = parse(&["tgcom", "-l", "1", "--no-dry-run"]);
        assert!(!args.dry_run(true));

        let args = parse(&["tgcom", "-l", "1"]);
        assert!(args.dry_run(true));
        assert!(!args.dry_run(false));

        let args = parse(&["tgcom", "-l", "1", "--no-dry-run", "-d"]);
        assert!(args.dry_run(false));
    }

    #[test]
    fn language_conflicts_with_marker() {
        let result = Cli::try_parse_from(["tgcom", "-l", "1", "-L", "go", "-m", "//"]);
        assert!(result.is_err());
    }
}
