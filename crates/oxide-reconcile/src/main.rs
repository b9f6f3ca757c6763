//! oxide-reconcile CLI
//!
//! Command-line tool for reconciling a database schema with a schema file.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_reconcile::prelude::*;

/// Dialect-aware schema reconciliation.
#[derive(Parser)]
#[command(name = "oxide-reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (`postgres://...` or `mysql://...`).
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// JSON file with the desired tables.
    #[arg(short, long, default_value = "schema.json")]
    schema: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the schema to the database.
    Apply(OptionFlags),

    /// Print the statements `apply` would run, without running them.
    Plan(OptionFlags),
}

/// Flags that enable options on top of the schema file's.
#[derive(Args)]
struct OptionFlags {
    /// Drop columns missing from the schema.
    #[arg(long)]
    drop_column: bool,

    /// Drop unique indexes on columns no longer marked unique.
    #[arg(long)]
    drop_index: bool,

    /// Reserve a disjoint ID range per table.
    #[arg(long)]
    global_unique_id: bool,
}

impl OptionFlags {
    fn apply_to(&self, options: MigrateOptions) -> MigrateOptions {
        options
            .with_drop_column(options.drop_column || self.drop_column)
            .with_drop_index(options.drop_index || self.drop_index)
            .with_global_unique_id(options.global_unique_id || self.global_unique_id)
    }
}

async fn execute<D: Driver>(
    migrate: Migrate<D>,
    tables: &[Table],
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let statements = migrate.plan(tables).await?;
        if statements.is_empty() {
            info!("Schema is up to date.");
        }
        for stmt in &statements {
            println!("{stmt};");
        }
    } else {
        migrate.create(tables).await?;
        info!("Schema applied successfully.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ReconcileConfig::from_path(&cli.schema)?;
    let (flags, dry_run) = match &cli.command {
        Commands::Apply(flags) => (flags, false),
        Commands::Plan(flags) => (flags, true),
    };
    let options = flags.apply_to(config.options);
    info!(
        "Reconciling {} tables from {}",
        config.tables.len(),
        cli.schema.display()
    );

    let scheme = cli.database.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
        Some("postgres" | "postgresql") => {
            let driver = PgDriver::connect(&cli.database).await?;
            let migrate = Migrate::new(driver, PostgresDialect::new()).with_options(options);
            execute(migrate, &config.tables, dry_run).await?;
        }
        Some("mysql") => {
            let driver = MySqlDriver::connect(&cli.database).await?;
            let migrate = Migrate::new(driver, MySqlDialect::new()).with_options(options);
            execute(migrate, &config.tables, dry_run).await?;
        }
        _ => bail!(ReconcileError::Config(
            "database URL must start with postgres://, postgresql:// or mysql://".to_string()
        )),
    }

    Ok(())
}
