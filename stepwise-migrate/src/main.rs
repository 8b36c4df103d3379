//! Stepwise Migration CLI Tool
//!
//! Operator tool for the PostgreSQL schema store: scaffold new migration
//! files, list schema records and manually resolve `dirty` migrations. Applying migrations is done by the
//! application's own binary through `stepwise_migrate::runner`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stepwise::config::StepwiseConfig;
use stepwise::context::MigrationContext;
use stepwise::postgres::PostgresStore;
use stepwise::store::SchemaStore;
use stepwise_migrate::operator::{self, Resolution, StatusArg};
use stepwise_migrate::output;
use stepwise_migrate::runner::init_logging;
use stepwise_migrate::scaffold;

#[derive(Parser)]
#[command(name = "stepwise-migrate")]
#[command(about = "Inspect and repair the Stepwise schema store")]
#[command(version)]
struct Cli {
    /// Path of the stepwise rc file
    #[arg(long, global = true)]
    rc_path: Option<PathBuf>,

    /// Connection string, overriding the rc file and STEPWISE_URI
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a migration file under the configured path
    New {
        /// Migration name (lowercase, digits and '_')
        name: String,
    },

    /// List every schema record
    Records {
        #[arg(long)]
        json: bool,
    },

    /// Rewrite or delete the record for one version
    Resolve {
        version: String,

        /// Status to record
        #[arg(long, value_enum, conflicts_with = "delete", required_unless_present = "delete")]
        status: Option<StatusArg>,

        /// Remove the record instead
        #[arg(long)]
        delete: bool,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => {
            if !cli.quiet {
                println!("✅ Success");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = StepwiseConfig::load(cli.rc_path.as_deref())?;
    if let Some(uri) = &cli.uri {
        config.uri.clone_from(uri);
    }

    match &cli.command {
        Commands::New { name } => {
            let file = scaffold::new_migration(&config, name, chrono::Utc::now())?;
            println!("✅ Generated migration: {}", file.display());
            println!("   Edit it to implement the forward and backward operations");
        }
        Commands::Records { json } => {
            let (store, ctx) = open_store(&config)?;
            let records = operator::list_records(&store, &ctx)?;
            if *json {
                println!("{}", output::to_json(&records)?);
            } else {
                println!("\n📋 Schema records in {}\n", store.table());
                print!("{}", output::render_records(&records));
            }
        }
        Commands::Resolve {
            version,
            status,
            delete,
        } => {
            let (store, ctx) = open_store(&config)?;
            let resolution = match (status, delete) {
                (Some(status), false) => Resolution::SetStatus((*status).into()),
                _ => Resolution::Delete,
            };
            operator::resolve(&store, &ctx, version, resolution)?;
        }
    }
    Ok(())
}

fn open_store(config: &StepwiseConfig) -> anyhow::Result<(PostgresStore, MigrationContext)> {
    let store = PostgresStore::new(config.uri.as_str(), config.schema_store.as_str())
        .context("invalid schema store settings")?;
    let ctx = MigrationContext::new();
    store
        .ensure(&ctx)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to connect to the schema store")?;
    Ok((store, ctx))
}
