//! sqlite-pg-migrate CLI - batched, idempotent SQLite to PostgreSQL migration.

use clap::{Parser, Subcommand};
use serde_json::json;
use sqlite_pg_migrate::{
    all_tables, Config, MigrateError, MigrationReport, Orchestrator, TableStatus,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "sqlite-pg-migrate")]
#[command(about = "Batched, idempotent SQLite to PostgreSQL migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Read settings from environment variables (over the config file, if it exists)
    #[arg(long)]
    env: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the registered tables
    Run {
        /// Migrate only this table (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,

        /// Override rows per INSERT statement
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override number of tables migrated concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Dry run: count rows and show the plan without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate row counts between source and target
    Validate,

    /// Test database connections
    HealthCheck,

    /// List the registered tables and their conflict keys
    Tables,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, MigrateError> {
    let cli = Cli::parse();

    // The registry is static, so listing it needs no configuration.
    if let Commands::Tables = cli.command {
        print_tables(cli.output_json)?;
        return Ok(0);
    }

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Tables => unreachable!(), // Handled above
        Commands::Run {
            tables,
            batch_size,
            workers,
            dry_run,
        } => {
            // Apply overrides
            if !tables.is_empty() {
                config.migration.tables = tables;
            }
            if let Some(n) = batch_size {
                config.migration.batch_size = n;
            }
            if let Some(w) = workers {
                config.migration.workers = w;
            }
            // Rejects unknown tables before any connection is opened.
            config.validate()?;

            let cancel_token = setup_signal_handler();
            let orchestrator = Orchestrator::new(config).await?;

            let result = if dry_run {
                orchestrator.dry_run().await
            } else {
                orchestrator.run(cancel_token).await
            };
            orchestrator.close().await;
            let report = result?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
            Ok(report.exit_code())
        }

        Commands::Validate => {
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.validate().await;
            orchestrator.close().await;
            let report = result?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("Validation Results:");
                for t in &report.tables {
                    println!(
                        "  {:<18} source={:<8} target={:<8} {}",
                        t.table,
                        t.source,
                        t.target,
                        if t.matches { "OK" } else { "MISMATCH" }
                    );
                }
            }
            Ok(report.exit_code())
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.health_check().await;
            orchestrator.close().await;
            result?;

            if cli.output_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "healthy": true }))?
                );
            } else {
                println!("Health Check Results:");
                println!("  Source (SQLite): OK");
                println!("  Target (PostgreSQL): OK");
            }
            Ok(0)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, MigrateError> {
    let config = if cli.env {
        if cli.config.exists() {
            let mut config = Config::load(&cli.config)?;
            config.apply_env_overrides()?;
            config
        } else {
            Config::from_env()?
        }
    } else {
        Config::load(&cli.config)?
    };

    if cli.config.exists() {
        info!("Loaded configuration from {:?}", cli.config);
    } else {
        info!("Loaded configuration from environment");
    }
    Ok(config)
}

fn print_report(report: &MigrationReport) {
    let status_msg = if report.dry_run {
        "Dry run completed!"
    } else if report.is_success() {
        "Migration completed!"
    } else {
        "Migration finished with problems."
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!(
        "  Tables: {} done, {} degraded, {} failed, {} cancelled (of {})",
        report.tables_done,
        report.tables_degraded,
        report.tables_failed,
        report.tables_cancelled,
        report.tables_total
    );
    println!("  Rows inserted: {}", report.rows_inserted);
    if report.rows_skipped > 0 {
        println!("  Rows skipped: {}", report.rows_skipped);
    }

    for t in &report.tables {
        let counts = match (t.count_source, t.count_delta()) {
            (Some(source), Some(delta)) => format!("source={} delta={}", source, delta),
            (Some(source), None) => format!("source={} target={}", source, t.count_before.unwrap_or(0)),
            _ => String::new(),
        };
        println!("  {:<18} {:<10} {}", t.table, format!("{:?}", t.status), counts);
        if t.status == TableStatus::Degraded && t.batches_failed > 0 {
            println!("    {} of {} batches failed", t.batches_failed, t.batches);
        }
        if let Some(ref err) = t.error {
            println!("    Error: {}", err);
        }
    }
}

fn print_tables(as_json: bool) -> Result<(), MigrateError> {
    if as_json {
        let tables: Vec<_> = all_tables()
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "fields": spec.fields.iter().map(|f| json!({
                        "name": f.name,
                        "type": f.field_type,
                        "nullable": f.nullable,
                    })).collect::<Vec<_>>(),
                    "conflict_key": spec.conflict_key,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    for spec in all_tables() {
        println!(
            "{:<18} ({})  conflict: ({})",
            spec.name,
            spec.column_names().join(", "),
            spec.conflict_key.join(", ")
        );
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json keeps stdout parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Finishing the current batch...", name);
                    token.cancel();
                });
            }
            Err(e) => warn!("Could not install {} handler: {}", name, e),
        }
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing the current batch...");
            token.cancel();
        }
    });

    cancel_token
}
