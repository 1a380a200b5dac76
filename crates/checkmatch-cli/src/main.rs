//! Missing Check CLI
//!
//! Command-line tool for matching a bank or carrier check list against the
//! reference check records.

use checkmatch_core::{
    clean_path_input, export_result, preview, project_display, render_grid, ExportFormat,
    FileHistory, ReconConfig, ReconciliationSession, SqliteExecutor, Table,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkmatch")]
#[command(about = "Find imported check numbers that already exist in the reference records", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file and show its first rows and columns
    Preview {
        /// Spreadsheet or CSV file
        #[arg(short, long)]
        file: String,
    },

    /// Match a file against the reference records
    Run {
        /// Spreadsheet or CSV file
        #[arg(short, long)]
        file: String,

        /// Reference database (overrides the configured connection)
        #[arg(long)]
        db: Option<String>,

        /// Reference query (overrides the configured query)
        #[arg(long)]
        query: Option<String>,

        /// Export the matches to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format (csv, xlsx or json); guessed from the output path if omitted
        #[arg(long)]
        format: Option<String>,
    },

    /// List recently used files
    History {
        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> checkmatch_core::Result<()> {
    let config = match &cli.config {
        Some(path) => ReconConfig::load(path)?,
        None => ReconConfig::default(),
    };

    match cli.command {
        Commands::Preview { file } => cmd_preview(config, &file),
        Commands::Run {
            file,
            db,
            query,
            output,
            format,
        } => cmd_run(config, &file, db, query, output, format),
        Commands::History { limit } => cmd_history(&config, limit),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

fn cmd_preview(config: ReconConfig, file: &str) -> checkmatch_core::Result<()> {
    let path = clean_path_input(file);
    let table = config.loader().load(&path)?;
    remember(&config, &path);

    println!("File: {}", path.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();
    print!("{}", render_grid(&preview(&table)));

    Ok(())
}

fn cmd_run(
    mut config: ReconConfig,
    file: &str,
    db: Option<String>,
    query: Option<String>,
    output: Option<PathBuf>,
    format: Option<String>,
) -> checkmatch_core::Result<()> {
    if let Some(db) = db {
        config.connection = db;
    }
    if let Some(query) = query {
        config.reference_query = query;
    }
    config.validate()?;

    let path = clean_path_input(file);
    let display_columns = config.display_columns.clone();
    let mut session = ReconciliationSession::new(SqliteExecutor, config);

    let imported = session.load(&path)?;
    println!(
        "Loaded {} rows from {}",
        imported.row_count(),
        path.display()
    );
    remember(session.config(), &path);

    let result = session.run_current()?;
    if result.is_empty() {
        println!("No missing checks found.");
        return Ok(());
    }

    println!(
        "Missing checks found! Number of missing checks found: {}.",
        result.row_count()
    );
    println!(
        "Checked at {}",
        result.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    print_matches(&project_display(result, &display_columns), result.table());

    if let Some(output) = output {
        let format = match format {
            Some(f) => f.parse()?,
            None => ExportFormat::from_path(&output).unwrap_or(ExportFormat::Csv),
        };
        let rows = export_result(result, &output, format)?;
        println!();
        println!(
            "Exported {} rows to {} ({})",
            rows,
            output.display(),
            format.extension().to_uppercase()
        );
    }

    Ok(())
}

/// Print the configured display columns, or the whole result when none of
/// them are present
fn print_matches(projected: &Table, full: &Table) {
    if projected.column_count() > 0 {
        print!("{}", render_grid(projected));
    } else {
        print!("{}", render_grid(full));
    }
}

fn cmd_history(config: &ReconConfig, limit: Option<usize>) -> checkmatch_core::Result<()> {
    let history = FileHistory::load(&config.history_file, config.max_history)?;

    if history.entries().is_empty() {
        println!("No previously used files.");
        return Ok(());
    }

    println!("Previously used files:");
    println!();
    let entries = history.recent(limit.unwrap_or(config.max_history));
    for (i, entry) in entries.iter().enumerate() {
        println!("{}. {}", i + 1, entry);
    }

    Ok(())
}

fn cmd_init_config(output: &Path) -> checkmatch_core::Result<()> {
    ReconConfig::default().save(output)?;
    println!("Created config file: {}", output.display());
    println!();
    println!("Set \"connection\" to your reference database, then run:");
    println!(
        "  checkmatch --config {} run --file <path>",
        output.display()
    );

    Ok(())
}

/// Failing to update the history never fails the command
fn remember(config: &ReconConfig, path: &Path) {
    let result = FileHistory::load(&config.history_file, config.max_history).and_then(|mut h| {
        h.record(path);
        h.save()
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not update file history");
    }
}
