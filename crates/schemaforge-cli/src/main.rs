//! schemaforge CLI - database-first domain model introspection.

use clap::{Parser, Subcommand};
use schemaforge::{Config, Domain, DomainSnapshot, SchemaError, TypeProvider};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};

/// Exit code when interrupted with Ctrl-C.
const INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "schemaforge")]
#[command(about = "Database-first domain model introspection for PostgreSQL and SQL Server")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "schemaforge.yaml")]
    config: PathBuf,

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
    /// Read the catalog and print the domain model
    Inspect {
        /// Write a domain snapshot for a later drop-generated run
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Only report this application type
        #[arg(long)]
        type_filter: Option<String>,
    },

    /// Drop generated objects that disappeared since a previous snapshot
    DropGenerated {
        /// Domain snapshot from the previous run
        #[arg(long)]
        previous: PathBuf,

        /// Write the new domain snapshot here
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Execute the statements instead of printing them
        #[arg(long)]
        execute: bool,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    tokio::select! {
        result = run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.format_detailed());
                ExitCode::from(e.exit_code())
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nReceived Ctrl-C. Aborting.");
            ExitCode::from(INTERRUPTED)
        }
    }
}

async fn run() -> Result<(), SchemaError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Inspect {
            snapshot,
            type_filter,
        } => {
            if type_filter.is_some() {
                config.generation.type_filter = type_filter;
            }

            let provider = TypeProvider::connect(&config).await?;
            let result = provider.inspect().await;
            provider.close().await;
            let domain = result?;

            let filter = config.generation.type_filter.as_deref();
            let selected = domain.types_for_generation(filter)?;

            if let Some(path) = &snapshot {
                save_snapshot(&config, &domain, path)?;
            }

            if cli.output_json {
                if filter.is_some() {
                    println!("{}", serde_json::to_string_pretty(&selected)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&domain)?);
                }
            } else {
                print_domain(&domain, &selected);
            }
        }

        Commands::DropGenerated {
            previous,
            snapshot,
            execute,
        } => {
            let old = DomainSnapshot::load(&previous)?;
            info!("Loaded previous snapshot from {:?}", previous);

            let provider = TypeProvider::connect(&config).await?;
            let result = drop_generated(&provider, &config, &old, snapshot.as_deref(), execute).await;
            provider.close().await;
            let statements = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&statements)?);
            } else if statements.is_empty() {
                println!("No generated objects to drop");
            } else {
                for statement in &statements {
                    println!("{}", statement);
                }
                if !execute {
                    println!("\n{} statements (not executed; pass --execute)", statements.len());
                }
            }
        }

        Commands::HealthCheck => {
            let start = Instant::now();
            let provider = TypeProvider::connect(&config).await?;
            let result = provider.health_check().await;
            let latency_ms = start.elapsed().as_millis();
            provider.close().await;

            if cli.output_json {
                let report = serde_json::json!({
                    "provider": provider.provider().to_string(),
                    "connected": result.is_ok(),
                    "latency_ms": latency_ms,
                    "error": result.as_ref().err().map(|e| e.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Database ({}): {} ({}ms)",
                    provider.provider(),
                    if result.is_ok() { "OK" } else { "FAILED" },
                    latency_ms
                );
                if let Err(e) = &result {
                    println!("    Error: {}", e);
                }
            }

            result?;
        }
    }

    Ok(())
}

async fn drop_generated(
    provider: &TypeProvider,
    config: &Config,
    old: &DomainSnapshot,
    snapshot: Option<&Path>,
    execute: bool,
) -> Result<Vec<String>, SchemaError> {
    let domain = provider.inspect().await?;
    let new = DomainSnapshot::new(config.hash(), domain);
    old.check_compatible(&new);

    let statements = if execute {
        provider.drop_generated(&old.domain, &new.domain).await?
    } else {
        provider.generate_drop_statements(&old.domain, &new.domain)?
    };

    if let Some(path) = snapshot {
        new.save(path)?;
        info!("Wrote domain snapshot to {:?}", path);
    }
    Ok(statements)
}

fn save_snapshot(config: &Config, domain: &Domain, path: &Path) -> Result<(), SchemaError> {
    DomainSnapshot::new(config.hash(), domain.clone()).save(path)?;
    info!("Wrote domain snapshot to {:?}", path);
    Ok(())
}

fn print_domain(domain: &Domain, selected: &[&schemaforge::ApplicationType]) {
    println!(
        "Domain ({}, {} naming, namespace {}):",
        domain.provider,
        domain.naming_convention().name(),
        domain.default_namespace
    );
    println!("  Types: {}", domain.types.len());
    println!("  Operations: {}", domain.operations.len());
    println!("  Result types: {}", domain.result_types.len());

    for t in selected {
        println!("\n  {}.{}", t.namespace, t.name);
        for f in &t.fields {
            let clr = f
                .clr_type
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string());
            let mut flags = Vec::new();
            if f.is_key {
                flags.push("key");
            }
            if f.is_generated {
                flags.push("generated");
            }
            if f.is_computed {
                flags.push("computed");
            }
            let reference = f
                .references
                .as_ref()
                .map(|r| format!(" -> {}.{}", r.type_key, r.field))
                .unwrap_or_default();
            println!(
                "    {} {} [{}]{}",
                f.name,
                clr,
                flags.join(", "),
                reference
            );
        }
    }

    for op in &domain.operations {
        let target = op
            .returns
            .type_key
            .as_ref()
            .map(|k| format!(" {}", k))
            .or_else(|| op.returns.clr_type.map(|c| format!(" {}", c)))
            .unwrap_or_default();
        println!(
            "\n  {} ({} parameters) -> {:?}{}{}",
            op.key(),
            op.parameters.len(),
            op.returns.kind,
            target,
            if op.returns.multiple { " []" } else { "" }
        );
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

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
