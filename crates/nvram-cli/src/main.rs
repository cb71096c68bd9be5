//! nvram - read and write named fields in CMOS/RTC NVRAM

mod commands;
mod dmi;
mod lock;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use nvram_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE};
use nvram_core::prelude::*;

use crate::commands::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "nvram",
    version = nvram_core::VERSION,
    about = "Operate on the extended NVRAM most PC chipsets offer",
    long_about = "Operate on the extended NVRAM most PC chipsets offer.

Fields are mapped onto NVRAM bytes by the configuration file, which may pick
per-board mappings using the DMI strings of the machine."
)]
struct Cli {
    /// Main configuration file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory relative include paths are resolved against
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// NVRAM checksums will not be updated automatically
    #[arg(short = 'c', long, action = ArgAction::SetTrue)]
    no_checksum_update: bool,

    /// No changes are actually written to NVRAM
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Print informational messages
    #[arg(short = 'v', long, action = ArgAction::SetTrue, conflicts_with_all = ["debug", "quiet"])]
    verbose: bool,

    /// Print informational and debug messages
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    debug: bool,

    /// Only print errors
    #[arg(short = 'q', long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Don't "cook" DMI strings before using them
    #[arg(long, action = ArgAction::SetTrue)]
    raw_dmi: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe BIOS and hardware
    Probe,
    /// List the NVRAM fields available on this computer
    List {
        /// Print the field table as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Get values for the fields specified
    Get {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
    /// Set values for the fields specified
    Set {
        #[arg(value_names = ["NAME", "VALUE"], required = true, num_args = 2..)]
        assignments: Vec<String>,
    },
    /// Verify checksums, all of them if no name is given
    Check {
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },
}

impl Cli {
    fn verbosity(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Info
        } else if self.quiet {
            LogLevel::Error
        } else {
            LogLevel::Warning
        }
    }
}

fn init_logging(verbosity: LogLevel) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(verbosity.as_tracing_level()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("nvram: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let _lock = lock::ProcessLock::acquire()?;

    let descriptor = dmi::read_descriptor(Path::new(dmi::DMI_DIR), !cli.raw_dmi);
    let options = InterpreterOptions {
        verbosity: cli.verbosity(),
        config_dir: cli.config_dir.clone(),
        ..Default::default()
    };
    let config = NvramConfig::load(&cli.config, &descriptor, &options)?;

    let settings = Settings {
        update_checksums: !cli.no_checksum_update,
        write_to_nvram: !cli.dry_run,
    };
    let mut ports = DevPort::new();
    let mut out = std::io::stdout().lock();

    match &cli.command {
        Command::Probe => commands::probe(&mut ports, &descriptor, &mut out),
        Command::List { json } => commands::list(&config, *json, &mut out),
        Command::Get { names } => commands::get(&mut ports, &config, names, &mut out),
        Command::Set { assignments } => commands::set(&mut ports, &config, assignments, &settings),
        Command::Check { names } => commands::check(&mut ports, &config, names, &mut out),
    }
    .with_context(|| format!("{} failed", cli.command.name()))
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Probe => "probe",
            Command::List { .. } => "list",
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Check { .. } => "check",
        }
    }
}
