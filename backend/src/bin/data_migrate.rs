//! Run data migrations against the PostgreSQL document store.
//!
//! Schema migrations are applied first so the command also works against a
//! fresh database.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt};

use workload_backend::domain::entities::MigrationStatus;
use workload_backend::domain::migrations::DataMigrationService;
use workload_backend::domain::store_access::StoreAccess;
use workload_backend::outbound::memory::MemoryDocumentStore;
use workload_backend::outbound::persistence::{
    DbPool, DieselDocumentStore, PoolConfig, run_schema_migrations,
};

const ACTOR: &str = "data-migrate";

/// `data-migrate` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "data-migrate",
    about = "List, run and inspect workload data migrations",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `WORKLOAD_DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the available migrations.
    List,
    /// Run one migration by name.
    Run {
        /// Migration name, as printed by `list`.
        name: String,
    },
    /// Print recorded runs, newest first.
    History {
        /// Maximum number of runs to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(err) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("tracing init failed: {err}");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(execute(args))
}

fn resolve_database_url(explicit: Option<String>) -> Result<String> {
    explicit
        .or_else(|| env::var("WORKLOAD_DATABASE_URL").ok())
        .ok_or_else(|| eyre!("pass --database-url or set WORKLOAD_DATABASE_URL"))
}

async fn connect(database_url: Option<String>) -> Result<DataMigrationService> {
    let database_url = resolve_database_url(database_url)?;
    run_schema_migrations(&database_url)
        .await
        .wrap_err("failed to apply schema migrations")?;
    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .wrap_err("failed to create database pool")?;
    let access = StoreAccess::new(
        Arc::new(DieselDocumentStore::new(pool)),
        Arc::new(DefaultClock),
    );
    Ok(DataMigrationService::with_builtin(access))
}

/// The migration set is compiled in, so listing needs no database.
fn list_migrations() {
    let access = StoreAccess::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(DefaultClock),
    );
    for info in DataMigrationService::with_builtin(access).list() {
        println!("{:<40} {}", info.name, info.description);
    }
}

async fn execute(args: CliArgs) -> Result<()> {
    match args.command {
        Command::List => {
            list_migrations();
            Ok(())
        }
        Command::Run { name } => {
            let service = connect(args.database_url).await?;
            let run = service
                .run(&name, ACTOR)
                .await
                .wrap_err_with(|| format!("failed to run migration `{name}`"))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&run).wrap_err("failed to render run")?
            );
            if run.body.status == MigrationStatus::Failed {
                return Err(eyre!(
                    "migration `{name}` failed: {}",
                    run.body.failure.as_deref().unwrap_or("no reason recorded")
                ));
            }
            Ok(())
        }
        Command::History { limit } => {
            let service = connect(args.database_url).await?;
            let runs = service
                .history(Some(limit))
                .await
                .wrap_err("failed to load migration history")?;
            for run in runs {
                println!(
                    "{}  {:<40} {:?}  scanned={} patched={} errors={} ({})",
                    run.body.started_at.to_rfc3339(),
                    run.body.migration,
                    run.body.status,
                    run.body.scanned,
                    run.body.patched,
                    run.body.errors.len(),
                    run.body.duration_label,
                );
            }
            Ok(())
        }
    }
}
