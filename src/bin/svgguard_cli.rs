//! SvgGuard CLI
//!
//! Commands: check, scrub, messages
//! Outputs JSON to stdout (scrub prints markup), logs to stderr
//! Returns 2 when a package fails validation

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use svgguard_core::{
    AppPackage, CheckConfig, Scrubber, SvgSanitizationCheck, SvgScrubber, CHECK_VERSION,
};

#[derive(Parser)]
#[command(name = "svgguard-cli")]
#[command(about = "SvgGuard CLI - sanitize SVG assets in an app package")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize every SVG in a package, rewriting changed files
    Check {
        /// Package root directory
        dir: PathBuf,
    },

    /// Print the sanitized form of one file without writing it
    Scrub {
        file: PathBuf,
    },

    /// Print the effective message catalog
    Messages,
}

fn main() -> ExitCode {
    svgguard_core::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CheckConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(&e.to_string()),
        },
        None => CheckConfig::default(),
    };

    match cli.command {
        Commands::Check { dir } => {
            let mut package = match AppPackage::load_from_dir(&dir, &config) {
                Ok(p) => p,
                Err(e) => return fail(&e.to_string()),
            };

            let check = SvgSanitizationCheck::new(config.catalog());
            let outcome = match package.check_svgs(&check) {
                Ok(o) => o,
                Err(e) => return fail(&e.to_string()),
            };

            let errors: Vec<_> = outcome.errors.iter()
                .map(|e| serde_json::json!({
                    "kind": e.kind,
                    "data": e.data,
                    "message": e.message(check.catalog()),
                }))
                .collect();

            let report = serde_json::json!({
                "valid": !outcome.has_errors(),
                "version": CHECK_VERSION,
                "checked_at": chrono::Utc::now(),
                "warnings": package.warnings,
                "errors": errors,
                "assets": outcome.reports,
            });

            if !emit(&report) {
                return ExitCode::FAILURE;
            }
            if outcome.has_errors() {
                ExitCode::from(2)  // Validation failure
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Scrub { file } => {
            let markup = match std::fs::read_to_string(&file) {
                Ok(m) => m,
                Err(e) => return fail(&format!("Failed to read {}: {e}", file.display())),
            };
            print!("{}", SvgScrubber::new().scrub(&markup));
            ExitCode::SUCCESS
        }

        Commands::Messages => {
            if emit(config.catalog().templates()) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn emit<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize output");
            false
        }
    }
}

fn fail(message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "valid": false, "error": message }));
    ExitCode::FAILURE
}
