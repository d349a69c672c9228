//! Seeding and admin entry point.
//!
//! # Commands
//! - `seed`: reconcile the built-in catalog (or a catalog file) into a
//!   database and print one JSON summary per space.
//! - `version`: print the core version.
//!
//! Flags override the matching `CONVENE_*` environment variables.

use clap::{Args, Parser, Subcommand};
use convene_core::{
    builtin_catalog, core_version, init_logging, load_catalog, open_db, open_db_in_memory,
    seed_catalog, BlueprintService, KindRegistry, SeedConfig, SpaceSummary,
};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "convene_cli")]
#[command(about = "Provision Convene spaces from blueprints")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile catalog blueprints into a database
    Seed(SeedArgs),
    /// Print the core version
    Version,
}

#[derive(Args)]
struct SeedArgs {
    /// SQLite database file; an in-memory database when omitted
    #[arg(long = "db", value_name = "PATH")]
    db_path: Option<PathBuf>,
    /// JSON array of client blueprints; the built-in catalog when omitted
    #[arg(long = "catalog", value_name = "FILE")]
    catalog_path: Option<PathBuf>,
    /// Absolute directory for rotating log files; stderr when omitted
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl SeedArgs {
    fn apply_to(self, config: &mut SeedConfig) {
        if let Some(path) = self.db_path {
            config.db_path = Some(path);
        }
        if let Some(path) = self.catalog_path {
            config.catalog_path = Some(path);
        }
        if let Some(dir) = self.log_dir {
            config.log.log_dir = Some(dir);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Seed(args) => seed(args),
        Command::Version => {
            println!("convene_core version={}", core_version());
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn seed(args: SeedArgs) -> Result<(), Box<dyn Error>> {
    let mut config = SeedConfig::from_env()?;
    args.apply_to(&mut config);
    init_logging(&config.log)?;

    let specs = match &config.catalog_path {
        Some(path) => load_catalog(path)?,
        None => builtin_catalog(),
    };
    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let registry = KindRegistry::builtin();
    let service = BlueprintService::for_connection(&conn, &registry)?;
    let reconciled = seed_catalog(&service, &specs)?;
    info!(
        "event=cli_seed module=cli status=ok spaces={}",
        reconciled.len()
    );

    for reconciliation in &reconciled {
        let summary = SpaceSummary::from_reconciliation(reconciliation, &registry);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
