//! Ingestor CLI
//!
//! Usage:
//!   ingestor guess-format --source '{"inputFormat":"file","path":"/data/x.csv"}'
//!   ingestor guess-fields --source @source.json --format @format.json
//!   ingestor render --source @source.json --sink @sink.json

use anyhow::Result;
use clap::{Parser, Subcommand};
use ingestor_protocol::IngestError;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "ingestor")]
#[command(about = "Compile source/sink descriptors into pipeline documents")]
#[command(version)]
struct Cli {
    /// Show debug output on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (defaults to ~/.ingestor/config.toml)
    #[arg(long, global = true, env = "INGESTOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Guess the serialization format of a source
    GuessFormat {
        /// Source descriptor as JSON, or @path to a JSON file
        #[arg(long)]
        source: String,
    },

    /// Sample a source and infer typed columns
    GuessFields {
        /// Source descriptor as JSON, or @path to a JSON file
        #[arg(long)]
        source: String,

        /// Format as printed by guess-format
        #[arg(long)]
        format: String,
    },

    /// Print the pipeline document for a source/sink pair
    Render {
        /// Source descriptor as JSON, or @path to a JSON file
        #[arg(long)]
        source: String,

        /// Sink descriptor as JSON, or @path to a JSON file
        #[arg(long)]
        sink: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = ingestor_logging::LogConfig::new("ingestor");
    log_config.verbose = cli.verbose;
    log_config.quiet = cli.quiet;
    if let Err(e) = ingestor_logging::init_logging(log_config) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<IngestError>() {
                Some(ingest) => eprintln!("Error: {}", ingest.user_message()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::GuessFormat { source } => {
            cli::guess::run_format(cli::guess::GuessFormatArgs { source }, &config)
        }
        Commands::GuessFields { source, format } => {
            cli::guess::run_fields(cli::guess::GuessFieldsArgs { source, format }, &config)
        }
        Commands::Render { source, sink } => {
            cli::render::run(cli::render::RenderArgs { source, sink }, &config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let parsed = Cli::try_parse_from(["ingestor", "-v", "-q", "render", "--source", "{}", "--sink", "{}"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from(["ingestor", "render", "--source", "@a.json", "--sink", "@b.json"])
            .unwrap();
        match cli.command {
            Commands::Render { source, sink } => {
                assert_eq!(source, "@a.json");
                assert_eq!(sink, "@b.json");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
