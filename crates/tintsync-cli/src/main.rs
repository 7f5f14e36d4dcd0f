//! `tintsync`: offline tooling over the preference core.
//!
//! ```text
//! tintsync css prefs.json --system dark        # first-paint <style> contents
//! tintsync resolve prefs.json --format yaml    # the resolved presentation
//! tintsync check record.json                   # validate a stored user record
//! ```
//!
//! Logging goes to stderr and is controlled by `TINTSYNC_LOG` (default `warn`).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{CheckReport, OutputFormat, SystemMode};

/// Render, resolve and check theme preferences.
#[derive(Parser)]
#[command(name = "tintsync", version, about)]
struct Cli {
    /// Config file with class names and palette overrides (YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stylesheet and root classes a server should emit for first paint
    Css {
        /// Preferences JSON, or a user record with a `preferences` field
        input: PathBuf,

        /// System color scheme to assume (default: ask the OS)
        #[arg(long, value_enum)]
        system: Option<SystemArg>,
    },

    /// Print the resolved presentation
    Resolve {
        input: PathBuf,

        #[arg(long, value_enum)]
        system: Option<SystemArg>,

        #[arg(long, short, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
    },

    /// Check a stored user record for malformed preferences and invalid colors
    Check {
        record: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SystemArg {
    Light,
    Dark,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Yaml,
}

impl From<SystemArg> for SystemMode {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::Light => SystemMode::Light,
            SystemArg::Dark => SystemMode::Dark,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TINTSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Css { input, system } => {
            let system = commands::system_mode(system.map(Into::into));
            print!("{}", commands::css(&input, system, &config)?);
        }
        Command::Resolve {
            input,
            system,
            format,
        } => {
            let system = commands::system_mode(system.map(Into::into));
            println!("{}", commands::resolve(&input, system, &config, format.into())?);
        }
        Command::Check { record } => {
            let report: CheckReport = commands::check(&record)?;
            print!("{}", report.render(console::colors_enabled()));
            if !report.is_ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", console::style("error:").red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
