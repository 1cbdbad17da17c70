//! refgraph CLI
//!
//! Verifies reference safety of programs serialized as JSON

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod check;
mod layout;

#[derive(Parser)]
#[command(name = "refgraph")]
#[command(about = "Compile-time reference-safety verifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every function of a program
    Check {
        /// Program in JSON form
        program: PathBuf,

        /// Verifier configuration; defaults to refgraph.toml next to the program
        #[arg(long)]
        config: Option<PathBuf>,

        /// Source file the spans refer to, for annotated output
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,
    },

    /// Print the inner reference tags of every composite
    Layout {
        /// Program in JSON form
        program: PathBuf,
    },
}

/// Diagnostic output format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Readable text, annotated with source when available
    Human,
    /// One JSON array of diagnostic records
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Check {
            program,
            config,
            source,
            format,
        } => {
            let clean = check::check(&program, config.as_deref(), source.as_deref(), format)?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Layout { program } => {
            layout::layout(&program)?;
        }
    }

    Ok(())
}
