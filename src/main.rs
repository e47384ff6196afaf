use clap::Parser;
use colored::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use form_abtest::cli::{load_test, render_report, Args, Command, IdKind};
use form_abtest::{
    analyze_test_results_with, assign_variant, generate_test_id, generate_variant_id,
    validate_ab_test, AnalysisConfig,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::NewId { kind } => {
            let id = match kind {
                IdKind::Test => generate_test_id(),
                IdKind::Variant => generate_variant_id(),
            };
            println!("{id}");
        }
        Command::Validate { test } => {
            let test = load_test(&test)?;
            let result = validate_ab_test(&test);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Assign { test, user } => {
            let test = load_test(&test)?;
            let assignment = assign_variant(&test, &user);
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        Command::Analyze { test, config, json } => {
            let test = load_test(&test)?;
            let config = match config {
                Some(path) => AnalysisConfig::load(path)?,
                None => AnalysisConfig::default(),
            };
            let report = analyze_test_results_with(&test, &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
