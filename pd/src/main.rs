//! ProgressDash - road-construction progress control
//!
//! CLI entry point for listing, editing and exporting group progress.

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use groupstore::{CsvStore, RecordStore, SqliteStore};
use tracing::{debug, info};

use progressdash::cli::{Cli, Command, OutputFormat, get_log_path};
use progressdash::config::Config;
use progressdash::engine::Severity;
use progressdash::markers::to_geojson;
use progressdash::report::{
    paint, render_detail, render_json, render_legend, render_summary, render_table, render_text, summarize,
};
use progressdash::session::{Session, SessionError};
use progressdash::tui;

type DynSession = Session<Box<dyn RecordStore>>;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(path) = &cli.store {
        debug!(?path, "main: store path overridden on command line");
        config.store.override_path(path);
    }
    config.validate().context("Invalid configuration")?;

    info!(store = ?config.store.path, basis = %config.progress.basis, "ProgressDash loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::List { format, severity }) => cmd_list(&config, format, severity),
        Some(Command::Show { name }) => cmd_show(&config, &name),
        Some(Command::Edit {
            name,
            actual_length,
            absorbed_funds,
        }) => cmd_edit(&config, &name, actual_length, absorbed_funds),
        Some(Command::Markers { output }) => cmd_markers(&config, output.as_deref()),
        Some(Command::Legend) => cmd_legend(),
        Some(Command::Summary { format }) => cmd_summary(&config, format),
        Some(Command::Import { csv, sqlite }) => cmd_import(&config, &csv, &sqlite),
        Some(Command::Tui) | None => cmd_tui(&config),
    }
}

/// Open the configured store and load a session over it
fn open_session(config: &Config) -> Result<DynSession> {
    let store = config.store.open()?;
    let description = store.describe();
    Session::load(store, config.progress.basis).context(format!("Failed to load records from {}", description))
}

fn cmd_list(config: &Config, format: OutputFormat, severity: Option<Severity>) -> Result<()> {
    debug!(%format, ?severity, "cmd_list: called");
    let session = open_session(config)?;
    let rows: Vec<_> = session
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| severity.is_none_or(|sev| progressdash::classify(record.progress_percent) == sev))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", render_json(&rows)?),
        OutputFormat::Text => print!("{}", render_text(&rows)),
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No groups found.");
            } else {
                print!("{}", render_table(&rows));
            }
        }
    }
    Ok(())
}

fn cmd_show(config: &Config, name: &str) -> Result<()> {
    debug!(%name, "cmd_show: called");
    let session = open_session(config)?;
    let (_, record) = session
        .find(name)
        .ok_or_else(|| SessionError::UnknownGroup(name.to_string()))?;
    print!("{}", render_detail(record));
    Ok(())
}

fn cmd_edit(config: &Config, name: &str, actual_length: Option<f64>, absorbed_funds: Option<f64>) -> Result<()> {
    debug!(%name, ?actual_length, ?absorbed_funds, "cmd_edit: called");
    let mut session = open_session(config)?;
    let (_, current) = session
        .find(name)
        .ok_or_else(|| SessionError::UnknownGroup(name.to_string()))?;

    // Omitted inputs keep the stored value
    let actual_length = actual_length.unwrap_or(current.actual_length);
    let absorbed_funds = absorbed_funds.unwrap_or(current.absorbed_funds);

    let outcome = session.commit_edit(name, actual_length, absorbed_funds)?;
    let before = outcome.severity_before();
    let after = outcome.severity_after();

    println!(
        "{} {} {} {}",
        "Saved".green().bold(),
        outcome.updated.name.bold(),
        paint(
            &format!("{:.2}% ({})", outcome.previous.progress_percent, before),
            before
        ),
        paint(&format!("-> {:.2}% ({})", outcome.updated.progress_percent, after), after),
    );
    println!("  Actual length:  {}", outcome.updated.actual_length);
    println!("  Absorbed funds: {}", outcome.updated.absorbed_funds);
    println!("  Store:          {}", session.store().describe());
    Ok(())
}

fn cmd_markers(config: &Config, output: Option<&Path>) -> Result<()> {
    debug!(?output, "cmd_markers: called");
    let session = open_session(config)?;
    let geojson = serde_json::to_string_pretty(&to_geojson(session.records()))?;

    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", geojson))
                .context(format!("Failed to write markers to {}", path.display()))?;
            println!("Wrote marker layer to {}", path.display());
        }
        None => println!("{}", geojson),
    }
    Ok(())
}

fn cmd_legend() -> Result<()> {
    print!("{}", render_legend());
    Ok(())
}

fn cmd_summary(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_summary: called");
    let session = open_session(config)?;
    let summary = summarize(session.records(), session.basis());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text | OutputFormat::Table => print!("{}", render_summary(&summary, session.basis())),
    }
    Ok(())
}

fn cmd_import(config: &Config, csv: &Path, sqlite: &Path) -> Result<()> {
    debug!(?csv, ?sqlite, "cmd_import: called");
    let source = CsvStore::new(csv, config.store.delimiter_byte()?, config.store.columns.clone());
    let table = source
        .load_all()
        .context(format!("Failed to read {}", csv.display()))?;

    let destination = SqliteStore::create(sqlite).context(format!("Failed to open {}", sqlite.display()))?;
    destination
        .save_all(&table)
        .context(format!("Failed to write {}", sqlite.display()))?;

    info!(rows = table.len(), ?csv, ?sqlite, "Import complete");
    println!(
        "Imported {} groups from {} into {}",
        table.len(),
        csv.display(),
        sqlite.display()
    );
    Ok(())
}

fn cmd_tui(config: &Config) -> Result<()> {
    debug!("cmd_tui: called");
    let session = open_session(config)?;
    tui::run(session, Duration::from_millis(config.tui.tick_ms))
}
