//! Embeddable `up` / `down` / `status` command line
//!
//! Migrations are compiled into the application, so the runner is a library:
//! an application's own binary (often `src/bin/migrate.rs`) builds its
//! [`Migrator`] and hands it to [`run`].
//!
//! ```rust,no_run
//! use stepwise::{Migration, Migrator, PostgresPlugin};
//!
//! fn main() -> std::process::ExitCode {
//!     stepwise_migrate::runner::run(|config| {
//!         let mut migrator = Migrator::new(PostgresPlugin::from_config(config)?);
//!         migrator.register(Migration::new("202401010000", |_| Ok(()), |_| Ok(())));
//!         Ok(migrator)
//!     })
//! }
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use stepwise::config::StepwiseConfig;
use stepwise::context::MigrationContext;
use stepwise::migration::{MigrationStatus, Migrator, SchemaPlugin};

use crate::output;

#[derive(Debug, Parser)]
#[command(about = "Apply or revert the migrations compiled into this binary")]
pub struct RunnerCli {
    /// Path of the stepwise rc file
    #[arg(long, global = true)]
    pub rc_path: Option<PathBuf>,

    /// Abort the run after this many seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: RunnerCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum RunnerCommand {
    /// Apply pending migrations
    Up {
        /// Stop after applying this version (default: all pending)
        #[arg(long)]
        to: Option<String>,
    },

    /// Revert applied migrations, newest first, down to and including VERSION
    Down {
        version: String,
    },

    /// Show the recorded status of every migration
    Status {
        #[arg(long)]
        json: bool,
    },
}

/// What a command did
#[derive(Debug)]
pub enum Outcome {
    Applied(usize),
    Reverted(usize),
    Status { report: MigrationStatus, json: bool },
}

impl Outcome {
    /// Text for stdout
    ///
    /// # Errors
    ///
    /// Fails only if the status report cannot be serialized.
    pub fn render(&self) -> anyhow::Result<String> {
        Ok(match self {
            Outcome::Applied(0) => "✅ No migrations to apply".to_string(),
            Outcome::Applied(n) => format!("✅ Successfully applied {n} migration(s)"),
            Outcome::Reverted(0) => "✅ No migrations to revert".to_string(),
            Outcome::Reverted(n) => format!("✅ Successfully reverted {n} migration(s)"),
            Outcome::Status { report, json: true } => output::to_json(report)?,
            Outcome::Status { report, json: false } => output::render_status(report),
        })
    }
}

/// Initialise `env_logger`: `info` by default, `debug` with `-v`, `error` with `-q`
///
/// `RUST_LOG` still wins when set.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

/// Context for one invocation, bounded by `--timeout-secs` when given
pub fn context_for(cli: &RunnerCli) -> MigrationContext {
    let ctx = MigrationContext::new();
    match cli.timeout_secs {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx,
    }
}

/// Connect `migrator` and execute the parsed command
///
/// # Errors
///
/// Returns the migrator's error with the failing step as context.
pub fn run_with<P: SchemaPlugin>(
    cli: &RunnerCli,
    migrator: &Migrator<P>,
    ctx: &MigrationContext,
) -> anyhow::Result<Outcome> {
    migrator
        .connect(ctx)
        .context("failed to connect to the schema store")?;

    match &cli.command {
        RunnerCommand::Up { to } => {
            log::info!("Applying migrations...");
            let applied = migrator
                .up(ctx, to.as_deref())
                .context("migration up failed")?;
            Ok(Outcome::Applied(applied))
        }
        RunnerCommand::Down { version } => {
            log::info!("Reverting migrations down to {version}...");
            let reverted = migrator
                .down(ctx, version)
                .context("migration down failed")?;
            Ok(Outcome::Reverted(reverted))
        }
        RunnerCommand::Status { json } => {
            let report = migrator
                .status(ctx)
                .context("failed to read migration status")?;
            Ok(Outcome::Status {
                report,
                json: *json,
            })
        }
    }
}

/// Parse the process arguments, load the rc file and run the command
///
/// `build` receives the loaded configuration and returns the application's
/// migrator. Errors are printed to stderr; the exit code is 0 on success
/// and 1 otherwise.
pub fn run<P, F>(build: F) -> ExitCode
where
    P: SchemaPlugin,
    F: FnOnce(&StepwiseConfig) -> anyhow::Result<Migrator<P>>,
{
    dotenv::dotenv().ok();
    let cli = RunnerCli::parse();
    init_logging(cli.verbose, cli.quiet);

    match execute(&cli, build) {
        Ok(text) => {
            if !cli.quiet || matches!(cli.command, RunnerCommand::Status { .. }) {
                println!("{text}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute<P, F>(cli: &RunnerCli, build: F) -> anyhow::Result<String>
where
    P: SchemaPlugin,
    F: FnOnce(&StepwiseConfig) -> anyhow::Result<Migrator<P>>,
{
    let config = StepwiseConfig::load(cli.rc_path.as_deref())?;
    let migrator = build(&config)?;
    let ctx = context_for(cli);
    run_with(cli, &migrator, &ctx)?.render()
}
