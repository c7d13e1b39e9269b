//! `mimer FILE...`: print the media type of each file.

use clap::{ArgAction, Parser};
use mimer_config::Config;
use mimer_detect::Detector;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to `mime.cache`. Defaults to the first one found in the XDG data
    /// directories.
    #[arg(long, env = "MIMER_DATABASE", value_name = "PATH")]
    database: Option<PathBuf>,
    /// Log more (repeat for even more). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let database = match database_path(cli.database) {
        Ok(database) => database,
        Err(err) => {
            eprintln!("mimer: {err:?}");
            return ExitCode::FAILURE;
        },
    };
    let detector = match Detector::open(&database) {
        Ok(detector) => detector,
        Err(err) => {
            eprintln!("mimer: {err:?}");
            return ExitCode::FAILURE;
        },
    };

    let mut failed = false;
    for file in &cli.files {
        if !file.exists() {
            println!("{}: [does not exist]", file.display());
            continue;
        }
        match detector.detect_path(file) {
            Ok(mime_type) => println!("{}: {mime_type}", file.display()),
            Err(err) => {
                tracing::error!(file = %file.display(), "Could not read file");
                eprintln!("mimer: {}: {err:?}", file.display());
                failed = true;
            },
        }
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// `--database` overrides whatever the configuration sources say.
fn database_path(explicit: Option<PathBuf>) -> mimer_config::error::Result<PathBuf> {
    let mut config = Config::load()?;
    if explicit.is_some() {
        config.database = explicit;
    }
    config.database_path()
}

fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
