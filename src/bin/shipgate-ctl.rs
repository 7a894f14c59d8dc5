//! Operator CLI: release pipeline runs and schema migrations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use shipgate::config::{Environment, ShipConfig};
use shipgate::migrate::{JournalStore, MigrationError, MigrationRunner};
use shipgate::observability::logging;
use shipgate::pipeline::{
    ArtifactBuilder, CommandScanner, PipelineRunner, ProcessExecutor, Revision, RunOutcome,
    SkipReason, Trigger,
};
use shipgate::registry::{HttpRegistry, RegistryToken};

#[derive(Parser)]
#[command(name = "shipgate-ctl")]
#[command(about = "Release pipeline and migration driver", long_about = None)]
struct Cli {
    /// Environment whose configuration set to resolve (defaults to
    /// SHIPGATE_ENV, then dev).
    #[arg(short, long)]
    env: Option<Environment>,

    /// Directory holding per-environment configuration files.
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build → scan → gate → publish pipeline for one revision
    Run {
        /// Source revision (commit hash, 7-40 lowercase hex)
        #[arg(short, long)]
        revision: String,

        /// What caused this run
        #[arg(short, long, value_enum)]
        trigger: TriggerArg,
    },
    /// Apply pending schema migrations
    Migrate,
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerArg {
    PushToMain,
    PullRequest,
}

impl From<TriggerArg> for Trigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::PushToMain => Trigger::PushToMain,
            TriggerArg::PullRequest => Trigger::PullRequest,
        }
    }
}

// Exit codes: 0 success/no-op, 1 expected terminal failures (gate block),
// 2 pipeline/migration step failures, 3 migration lock held.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let environment = match cli.env.map(Ok).unwrap_or_else(Environment::from_env) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let config = match shipgate::config::resolve(environment, &cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    logging::init(&config.observability.log_level);

    match cli.command {
        Commands::Run { revision, trigger } => run_pipeline(&config, &revision, trigger.into()).await,
        Commands::Migrate => run_migrations(&config).await,
    }
}

async fn run_pipeline(config: &ShipConfig, revision: &str, trigger: Trigger) -> ExitCode {
    let revision: Revision = match revision.parse() {
        Ok(revision) => revision,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let endpoint = match url::Url::parse(&config.registry.endpoint) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            eprintln!("error: registry endpoint: {e}");
            return ExitCode::from(2);
        }
    };
    let registry = match HttpRegistry::new(endpoint, Duration::from_secs(30)) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let token = match RegistryToken::from_env(&config.registry.token_var) {
        Some(token) => token,
        None => {
            eprintln!(
                "error: no registry token in {} (short-lived, injected by the invoking environment)",
                config.registry.token_var
            );
            return ExitCode::from(2);
        }
    };

    let executor = ProcessExecutor::new(&config.pipeline);
    let scanner = CommandScanner::new(
        config.pipeline.scanner_command.clone(),
        Duration::from_secs(config.pipeline.step_timeout_secs),
    );
    let runner = PipelineRunner::new(
        ArtifactBuilder::new(&executor, &config.pipeline.build_steps),
        &scanner,
        &registry,
        &config.registry.repository,
    );

    // The CLI drives a single run; nothing supersedes it mid-flight.
    let (_cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);

    match runner.run(&revision, trigger, &token, &cancel_rx).await {
        Ok(RunOutcome::Published(record)) => {
            println!(
                "published {}:{} ({} at {})",
                record.repository, record.tag, record.digest, record.pushed_at
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::SkippedPublish(reason)) => {
            match reason {
                SkipReason::PullRequest => println!("skipped publish: pull-request trigger"),
                SkipReason::AlreadyPublished => println!("skipped publish: already published"),
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Blocked { critical }) => {
            eprintln!("blocked: {} critical finding(s)", critical.len());
            for finding in &critical {
                eprintln!("  {} in {}", finding.id, finding.package);
            }
            ExitCode::from(1)
        }
        Ok(RunOutcome::Cancelled { before }) => {
            println!("cancelled before {} stage", before.as_str());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run_migrations(config: &ShipConfig) -> ExitCode {
    let migrations = match shipgate::migrate::load_dir(std::path::Path::new(
        &config.database.migrations_dir,
    )) {
        Ok(migrations) => migrations,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let store = JournalStore::new(&config.database);
    let runner = MigrationRunner::new(
        &store,
        Duration::from_secs(config.database.lock_timeout_secs),
    );

    match runner.apply(&migrations).await {
        Ok(applied) => {
            println!("applied {applied} migration(s)");
            ExitCode::SUCCESS
        }
        Err(MigrationError::LockHeld) => {
            eprintln!("error: migration lock held by another runner");
            ExitCode::from(3)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
