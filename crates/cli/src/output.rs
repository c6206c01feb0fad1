//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use sitecheck_common::{Analysis, OverallStatus};
use sitecheck_e2e::RunOutcome;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Analysis as JSON
    Json,
}

/// Print the result of a run
pub fn print_outcome(outcome: &RunOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Text => print_summary(outcome),
        OutputFormat::Json => print_json(&outcome.analysis),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_summary(outcome: &RunOutcome) {
    let analysis = &outcome.analysis;

    println!();
    println!("{}", "=".repeat(60));
    println!("📊 Test Result Summary");
    println!("{}", "=".repeat(60));
    println!("Overall status: {}", status_text(analysis.overall_status()));
    println!("Issues detected: {}", analysis.issues().len());
    if !analysis.errored_suites().is_empty() {
        let names: Vec<&str> = analysis.errored_suites().iter().map(|s| s.as_str()).collect();
        print_warning(&format!("Suites that did not complete: {}", names.join(", ")));
    }

    if analysis.issues().is_empty() {
        if analysis.errored_suites().is_empty() {
            println!();
            print_success("All checks passed!");
        }
    } else {
        println!();
        println!("{table}", table = issue_table(analysis));
    }

    println!();
    match &outcome.report_path {
        Some(path) => println!("📄 Report saved: {}", path.display()),
        None => print_warning("Report could not be saved"),
    }
    if let Some(path) = &outcome.ticket_path {
        println!("🐛 Bug ticket draft: {}", path.display());
    }
}

fn status_text(status: OverallStatus) -> String {
    match status {
        OverallStatus::Pass => status.as_str().green().bold().to_string(),
        OverallStatus::Warning => status.as_str().yellow().bold().to_string(),
        OverallStatus::Fail => status.as_str().red().bold().to_string(),
    }
}

/// Table of issues in analysis order
pub fn issue_table(analysis: &Analysis) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["#", "Type", "Severity", "Message"]);
    for (i, issue) in analysis.issues().iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            issue.issue_type().to_string(),
            format!("{} {}", issue.severity().marker(), issue.severity()),
            issue.message().to_string(),
        ]);
    }
    table
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitecheck_common::{Issue, IssueType, Severity};

    #[test]
    fn test_issue_table_rows_follow_analysis_order() {
        let analysis = Analysis::new(
            Utc::now(),
            OverallStatus::Fail,
            vec![
                Issue::new(IssueType::Compatibility, Severity::Medium, "webkit failed", "r"),
                Issue::new(IssueType::Functional, Severity::High, "form failed", "r"),
            ],
        );

        let rendered = issue_table(&analysis).to_string();
        assert!(rendered.contains("COMPATIBILITY"));
        assert!(rendered.find("webkit failed").unwrap() < rendered.find("form failed").unwrap());
    }
}
