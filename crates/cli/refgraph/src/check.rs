//! Check command implementation

use crate::Format;
use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use rg_ops::Program;
use rg_verify::{render_diagnostics, DiagnosticRecord, Verifier, VerifierConfig};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up next to the program.
pub const CONFIG_FILE_NAME: &str = "refgraph.toml";

/// Verifies the program at `path`. Returns whether no diagnostic was found.
pub fn check(path: &Path, config: Option<&Path>, source: Option<&Path>, format: Format) -> Result<bool> {
    let program = Program::from_file(path)
        .with_context(|| format!("failed to load program {}", path.display()))?;
    let config = load_config(path, config)?;

    if format == Format::Human {
        println!("{} {}", "Checking".green().bold(), path.display());
    }
    let report = Verifier::new(config).verify_program(&program);

    match format {
        Format::Json => {
            let records: Vec<DiagnosticRecord> =
                report.diagnostics.iter().map(|diagnostic| diagnostic.to_record()).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Format::Human => {
            if let Some(source) = source {
                let text = std::fs::read_to_string(source)
                    .with_context(|| format!("failed to read source {}", source.display()))?;
                print!(
                    "{}",
                    render_diagnostics(&source.display().to_string(), &text, &report.diagnostics)
                );
            } else {
                for diagnostic in &report.diagnostics {
                    eprintln!("{diagnostic}");
                }
            }

            println!();
            if report.is_ok() {
                println!(
                    "{} {} functions verified, no errors found",
                    "Success:".green().bold(),
                    report.functions_verified
                );
            } else {
                eprintln!(
                    "{} {} errors found",
                    "Failed:".red().bold(),
                    report.diagnostics.len()
                );
            }
        }
    }

    Ok(report.is_ok())
}

/// Explicit configuration, else `refgraph.toml` next to the program, else
/// defaults.
pub fn load_config(program: &Path, explicit: Option<&Path>) -> Result<VerifierConfig> {
    if let Some(path) = explicit {
        return VerifierConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()));
    }
    let candidate = config_candidate(program);
    if candidate.is_file() {
        debug!("using configuration {}", candidate.display());
        return VerifierConfig::from_file(&candidate)
            .with_context(|| format!("failed to load configuration {}", candidate.display()));
    }
    Ok(VerifierConfig::default())
}

fn config_candidate(program: &Path) -> PathBuf {
    program
        .parent()
        .map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), |dir| dir.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_next_to_program() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "max_loop_iterations = 5\n").unwrap();
        let config = load_config(&dir.path().join("program.json"), None).unwrap();
        assert_eq!(config.loop_iterations(), 5);
    }

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("program.json"), None).unwrap();
        assert_eq!(config, VerifierConfig::default());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(&dir.path().join("program.json"), Some(&missing)).is_err());
    }
}
