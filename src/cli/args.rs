//! CLI argument definitions using clap
//!
//! Commands:
//! - tableload schema <location> [--projection P] [--sorted] [--config F]
//! - tableload plan <location> --fields 0,1#x|y [--projection P] [--signature S]
//! - tableload scan <location> [--projection P] [--fields F] [--sorted] [--seek JSON] [--limit N]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tableload - read columnar tables through the table loader
#[derive(Parser, Debug)]
#[command(name = "tableload")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct LoadOptions {
    /// Comma-separated table path patterns
    pub location: String,

    /// Explicit projection, e.g. "id , tags#{x|y}"
    #[arg(long)]
    pub projection: Option<String>,

    /// Read the input as sorted tables
    #[arg(long)]
    pub sorted: bool,

    /// Path to a JSON loader configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Distribution signature of the load
    #[arg(long, default_value = "tableload-cli")]
    pub signature: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved tables and schema
    Schema {
        #[command(flatten)]
        load: LoadOptions,
    },

    /// Plan a pruned projection and print the task descriptor
    Plan {
        #[command(flatten)]
        load: LoadOptions,

        /// Required fields as index[#key|key], comma separated
        #[arg(long)]
        fields: String,
    },

    /// Print records as JSON lines
    Scan {
        #[command(flatten)]
        load: LoadOptions,

        /// Required fields as index[#key|key], comma separated
        #[arg(long)]
        fields: Option<String>,

        /// JSON array of sort key values to seek to before reading
        #[arg(long)]
        seek: Option<String>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from(["tableload", "plan", "/t/a,/t/b", "--fields", "0,1#x|y"]).unwrap();
        match cli.command {
            Command::Plan { load, fields } => {
                assert_eq!(load.location, "/t/a,/t/b");
                assert_eq!(fields, "0,1#x|y");
                assert_eq!(load.signature, "tableload-cli");
                assert!(!load.sorted);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_scan_with_seek() {
        let cli = Cli::try_parse_from(["tableload", "scan", "t", "--sorted", "--seek", "[4]", "--limit", "2"])
            .unwrap();
        match cli.command {
            Command::Scan { load, seek, limit, .. } => {
                assert!(load.sorted);
                assert_eq!(seek.as_deref(), Some("[4]"));
                assert_eq!(limit, Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
