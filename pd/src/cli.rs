//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::engine::Severity;

/// ProgressDash - road-construction progress control
#[derive(Parser)]
#[command(
    name = "pd",
    about = "Progress control dashboard for road-construction groups",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Override the configured store path (.db/.sqlite selects SQLite, .csv selects CSV)
    #[arg(short = 's', long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to execute (default: terminal dashboard)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all groups with their progress
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Only show groups in this severity bucket
        #[arg(long)]
        severity: Option<Severity>,
    },

    /// Show every field of one group
    Show {
        /// Group name
        name: String,
    },

    /// Record actual progress for one group and save it
    Edit {
        /// Group name
        name: String,

        /// Actual length built (keeps the current value when omitted)
        #[arg(short = 'a', long, allow_negative_numbers = true, value_parser = parse_finite)]
        actual_length: Option<f64>,

        /// Funds absorbed (keeps the current value when omitted)
        #[arg(short = 'f', long, allow_negative_numbers = true, value_parser = parse_finite)]
        absorbed_funds: Option<f64>,
    },

    /// Export the map marker layer as GeoJSON
    Markers {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the progress color legend
    Legend,

    /// Show totals and counts per severity
    Summary {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Copy a CSV store into a SQLite store
    Import {
        /// Source CSV file
        csv: PathBuf,

        /// Destination SQLite database
        sqlite: PathBuf,
    },

    /// Launch the terminal dashboard
    Tui,
}

/// Parse a finite number; `NaN` and infinities are rejected
fn parse_finite(s: &str) -> Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(format!("'{}' is not a finite number", s)),
        Err(e) => Err(format!("'{}' is not a number: {}", s, e)),
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("progressdash")
        .join("logs")
        .join("progressdash.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Output format for list/summary commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text, json, or table", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["pd"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_list() {
        let cli = Cli::parse_from(["pd", "list", "--format", "json", "--severity", "low"]);
        assert!(matches!(
            cli.command,
            Some(Command::List {
                format: OutputFormat::Json,
                severity: Some(Severity::Low)
            })
        ));
    }

    #[test]
    fn test_cli_parse_edit() {
        let cli = Cli::parse_from(["pd", "edit", "Kelompok A", "--actual-length", "25", "-f", "-10.5"]);
        if let Some(Command::Edit {
            name,
            actual_length,
            absorbed_funds,
        }) = cli.command
        {
            assert_eq!(name, "Kelompok A");
            assert_eq!(actual_length, Some(25.0));
            assert_eq!(absorbed_funds, Some(-10.5));
        } else {
            panic!("Expected Edit command");
        }
    }

    #[test]
    fn test_cli_edit_rejects_non_numeric() {
        assert!(Cli::try_parse_from(["pd", "edit", "Kelompok A", "--actual-length", "lots"]).is_err());
    }

    #[test]
    fn test_cli_edit_rejects_non_finite() {
        for bad in ["NaN", "inf", "-inf", "infinity"] {
            assert!(
                Cli::try_parse_from(["pd", "edit", "Kelompok A", "-a", bad]).is_err(),
                "accepted {bad}"
            );
            assert!(Cli::try_parse_from(["pd", "edit", "Kelompok A", "-f", bad]).is_err());
        }
        assert_eq!(parse_finite(" 12.5 "), Ok(12.5));
    }

    #[test]
    fn test_cli_with_config_and_store() {
        let cli = Cli::parse_from(["pd", "-c", "/path/to/config.yml", "summary", "--store", "groups.csv"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert_eq!(cli.store, Some(PathBuf::from("groups.csv")));
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!(matches!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table)));
        assert!("invalid".parse::<OutputFormat>().is_err());
    }
}
