//! schemaver CLI - versioned, reversible schema migrations.

use clap::{Parser, Subcommand};
use schemaver::{
    load_directory, Config, DatabaseKind, MigrateError, MigrationCatalog, MigrationPlan, Migrator,
    ScriptConnection, TransformationProvider,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "schemaver")]
#[command(about = "Versioned, reversible schema migrations")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the database to a version (latest by default)
    Migrate {
        /// Version to migrate to; overrides migrations.target_version
        #[arg(long, allow_negative_numbers = true)]
        target_version: Option<i64>,

        /// Dry run: show the plan without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// List migrations and whether each is applied
    List,

    /// Generate the SQL a migration would run, without a database
    Script {
        /// SQL dialect: postgres, mssql, mysql, sqlite or oracle
        #[arg(long)]
        dialect: String,

        /// Directory holding the migration scripts
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,

        /// Migration key recorded in the ledger
        #[arg(long, default_value = "")]
        key: String,

        /// Version to generate up to (latest by default)
        #[arg(long, allow_negative_numbers = true)]
        target_version: Option<i64>,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    // Script generation works offline and needs no configuration file
    if let Commands::Script {
        dialect,
        dir,
        key,
        target_version,
    } = &cli.command
    {
        return script(dialect, dir, key, *target_version, cli.output_json).await;
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Script { .. } => unreachable!(), // Handled above
        Commands::Migrate {
            target_version,
            dry_run,
        } => {
            let target = target_version.or(config.migrations.target_version);
            let mut migrator = open_migrator(&config).await?;

            if dry_run {
                let plan = migrator.plan(target).await;
                migrator.close().await?;
                print_plan(&plan?, cli.output_json)?;
                return Ok(());
            }

            let result = migrator.migrate(target).await;
            migrator.close().await?;
            let report = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nMigration completed!");
                println!("  Run ID: {}", report.run_id);
                println!("  Duration: {:.2}s", report.duration_seconds);
                println!(
                    "  Version: {} -> {}",
                    report.start_version, report.final_version
                );
                println!("  Steps: {}", report.steps.len());
                for step in &report.steps {
                    println!("    {:<4} {:>5} {}", step.direction, step.version, step.name);
                }
            }
        }

        Commands::List => {
            let mut migrator = open_migrator(&config).await?;
            let result = migrator.list().await;
            migrator.close().await?;
            let entries = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Migrations (key: {:?}):", migrator.catalog().key());
                for entry in &entries {
                    println!(
                        "  [{}] {:>5} {}{}",
                        if entry.applied { "x" } else { " " },
                        entry.version,
                        entry.name,
                        if entry.without_transaction {
                            " (no transaction)"
                        } else {
                            ""
                        }
                    );
                }
            }
        }

        Commands::HealthCheck => {
            let kind = config.database.kind()?;
            let start = Instant::now();
            let result = health_check(&config).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            if cli.output_json {
                let json = serde_json::json!({
                    "database": kind.as_str(),
                    "connected": result.is_ok(),
                    "latency_ms": latency_ms,
                    "error": result.as_ref().err().map(|e| e.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Database ({}): {} ({}ms)",
                    kind,
                    if result.is_ok() { "OK" } else { "FAILED" },
                    latency_ms
                );
                if let Err(ref err) = result {
                    println!("    Error: {}", err);
                }
            }

            result?;
        }
    }

    Ok(())
}

/// Load the configured scripts and connect.
async fn open_migrator(config: &Config) -> Result<Migrator, MigrateError> {
    let descriptors = load_directory(&config.migrations.directory)?;
    let catalog = MigrationCatalog::new(config.migrations.key.clone(), descriptors)?;
    let provider = TransformationProvider::connect(config).await?;
    Ok(Migrator::new(provider, catalog))
}

async fn health_check(config: &Config) -> Result<(), MigrateError> {
    let mut provider = TransformationProvider::connect(config).await?;
    let result = provider.execute_scalar("SELECT 1").await;
    provider.close().await?;
    result.map(|_| ())
}

/// Run the migrations against a recording connection and print the SQL.
async fn script(
    dialect: &str,
    dir: &Path,
    key: &str,
    target_version: Option<i64>,
    output_json: bool,
) -> Result<(), MigrateError> {
    let kind = DatabaseKind::from_db_type(dialect)?;
    let dialect = kind.dialect();

    let descriptors = load_directory(dir)?;
    let catalog = MigrationCatalog::new(key, descriptors)?;

    let connection = ScriptConnection::for_dialect(dialect.as_ref());
    let buffer = connection.buffer();
    let provider = TransformationProvider::new(Arc::clone(&dialect), Box::new(connection));

    let mut migrator = Migrator::new(provider, catalog);
    let report = migrator.migrate(target_version).await?;
    let sql = buffer.render(dialect.batch_separator());

    if output_json {
        let json = serde_json::json!({
            "dialect": kind.as_str(),
            "report": report,
            "sql": sql,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", sql);
    }

    Ok(())
}

fn print_plan(plan: &MigrationPlan, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    println!("Dry run completed!");
    println!("  Current version: {}", plan.start_version);
    if plan.is_empty() {
        println!("  Nothing to do");
    }
    for &version in &plan.versions {
        let direction = if version <= plan.start_version { "down" } else { "up" };
        println!("    {:<4} {:>5}", direction, version);
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity: {}", other)),
    };

    // stdout carries command output
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format: {}", other)),
    }

    Ok(())
}
