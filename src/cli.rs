use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};

use crate::analyze::TestReport;
use crate::error::Result;
use crate::model::AbTest;

#[derive(Parser)]
#[command(name = "form-abtest")]
#[command(version)]
#[command(about = "Assign users to form variants and analyze A/B test results")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print a freshly generated identifier
    NewId {
        #[arg(value_enum)]
        kind: IdKind,
    },
    /// Validate a test definition (JSON file)
    Validate {
        test: PathBuf,
    },
    /// Assign a user to a variant of a test (JSON file)
    Assign {
        test: PathBuf,

        /// Stable user identifier
        #[arg(long)]
        user: String,
    },
    /// Analyze accumulated impressions and conversions of a test (JSON file)
    Analyze {
        test: PathBuf,

        /// TOML file with confidence_level / significance_threshold
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum IdKind {
    Test,
    Variant,
}

/// Read and decode a persisted test record.
pub fn load_test(path: &Path) -> Result<AbTest> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Human-readable report table.
pub fn render_report(report: &TestReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:>12} {:>12} {:>9} {:>20} {:>9}\n",
        "variant".bold(),
        "impressions".bold(),
        "conversions".bold(),
        "rate".bold(),
        "interval".bold(),
        "lift".bold()
    ));
    for v in &report.variants {
        let is_winner = report.winner.as_deref() == Some(v.variant_id.as_str());
        let name = if is_winner { v.name.green().bold() } else { v.name.normal() };
        let lift = v.lift.map(|l| format!("{:+.1}%", l * 100.0)).unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{:<24} {:>12} {:>12} {:>8.2}% {:>20} {:>9}\n",
            name,
            v.impressions,
            v.conversions,
            v.conversion_rate * 100.0,
            format!(
                "[{:.2}%, {:.2}%]",
                v.confidence_interval.0 * 100.0,
                v.confidence_interval.1 * 100.0
            ),
            lift
        ));
    }
    out.push_str(&format!(
        "\nchi-squared = {:.4}  df = {}  p = {:.4}\n",
        report.significance.chi_squared, report.significance.degrees_of_freedom, report.significance.p_value
    ));
    let recommendation = if report.winner.is_some() {
        report.recommendation.green()
    } else {
        report.recommendation.yellow()
    };
    out.push_str(&format!("{recommendation}\n"));
    out
}
