use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "tgcom workspace automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tgcom test suite under cargo nextest
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Format check, clippy with warnings denied, then the test suite
    Ci,
    /// Accept pending insta snapshots after reviewing them
    Snapshots,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile.as_deref(), release),
        Commands::Ci => run_ci(),
        Commands::Snapshots => cargo(&["insta", "review", "--workspace"]),
    }
}

fn run_nextest(profile: Option<&str>, release: bool) -> Result<()> {
    let mut args = vec!["nextest", "run", "-p", "tgcom"];
    if let Some(profile) = profile {
        args.extend(["--profile", profile]);
    }
    if release {
        args.push("--release");
    }
    cargo(&args)
}

fn run_ci() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])?;
    run_nextest(None, false)
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("failed to spawn cargo {}", args.join(" ")))?;
    if !status.success() {
        bail!("cargo {} failed", args.join(" "));
    }
    Ok(())
}
