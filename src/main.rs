use clap::Parser;
use std::path::PathBuf;
use std::process;

use participants::config::{default_config_path, load_config, ParticipantsConfig};
use participants::errors::{ParticipantsError, Result};
use participants::observations::apply_observations;
use participants::persistence::{self, check_distinct_paths};
use participants::resolution::IdentityResolver;

/// Groups identifiers (emails, names, profile URIs) into person records.
#[derive(Parser)]
#[command(
    name = "participants",
    about = "Incrementally resolve identifiers into persons with stable IDs",
    override_usage = "participants [OPTIONS] [OLD.json] <NEW.json>"
)]
struct Cli {
    /// Identity file to continue from (optional), then the file to write
    #[arg(value_name = "PATH", num_args = 1..=2, required = true)]
    paths: Vec<PathBuf>,
    /// JSON Lines observation feed to apply (repeatable)
    #[arg(short, long = "observations", value_name = "FILE")]
    observations: Vec<PathBuf>,
    /// Configuration file (default: <config dir>/participants/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log every identifier change
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("participants=debug")
        } else {
            EnvFilter::new("participants=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let (old_path, new_path) = split_paths(cli.paths)?;

    // Must fail before anything is read or written.
    if let Some(old_path) = &old_path {
        check_distinct_paths(old_path, &new_path)?;
    }

    let config = resolve_config(cli.config)?;
    let mut resolver = match &old_path {
        Some(path) => persistence::load(path, config)?,
        None => IdentityResolver::new(config),
    };

    for path in &cli.observations {
        apply_observations(&mut resolver, path)?;
    }

    persistence::save(&mut resolver, &new_path)?;

    let summary = resolver.summary();
    println!("Saved {}", new_path.display());
    println!("  Persons:     {}", summary.active_persons);
    println!("  Tombstones:  {}", summary.tombstones);
    println!("  Identifiers: {}", summary.identifiers);
    Ok(())
}

/// Splits `[OLD] NEW` into the optional input and the output path.
fn split_paths(paths: Vec<PathBuf>) -> Result<(Option<PathBuf>, PathBuf)> {
    let mut paths = paths.into_iter();
    match (paths.next(), paths.next(), paths.next()) {
        (Some(new), None, None) => Ok((None, new)),
        (Some(old), Some(new), None) => Ok((Some(old), new)),
        _ => Err(ParticipantsError::Config {
            message: "expected [OLD.json] NEW.json".to_string(),
        }),
    }
}

/// Loads the explicit config file, else the per-user default, else built-ins.
fn resolve_config(explicit: Option<PathBuf>) -> Result<ParticipantsConfig> {
    match explicit.or_else(default_config_path) {
        Some(path) => load_config(&path),
        None => Ok(ParticipantsConfig::default()),
    }
}
