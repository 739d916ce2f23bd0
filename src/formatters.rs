//! Formatters - Different output formatters for batch reports

use crate::report::{BatchReport, GameOutcome};
use std::io::Write;

/// Formatter trait
pub trait Formatter {
    fn format(&self, report: &BatchReport) -> String;
    fn write_to(&self, report: &BatchReport, writer: &mut dyn Write) -> std::io::Result<()> {
        write!(writer, "{}", self.format(report))
    }
}

/// Text formatter - one line per game plus an error summary
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let mut output = String::new();
        for outcome in &report.outcomes {
            output.push_str(&outcome_line(outcome, if outcome.success { "ok" } else { "failed" }));
            output.push('\n');
        }
        if report.has_errors() {
            output.push_str(&format!("\n{} error(s):\n", report.errors.len()));
            for error in &report.errors {
                output.push_str(&format!("  {}\n", error));
            }
        }
        output
    }
}

/// Shell formatter - text output with colored status marks
pub struct ShellFormatter;

impl Formatter for ShellFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let mut output = String::new();
        for outcome in &report.outcomes {
            let mark = if outcome.success {
                "\x1b[32m✓\x1b[0m"
            } else {
                "\x1b[31m✗\x1b[0m"
            };
            output.push_str(&outcome_line(outcome, mark));
            output.push('\n');

            let mut details: Vec<String> = outcome
                .details
                .iter()
                .map(|(k, v)| format!("    {}: {}", k, v))
                .collect();
            details.sort();
            for line in details {
                output.push_str(&line);
                output.push('\n');
            }
        }
        output
    }
}

/// JSON formatter - returns the report as a JSON document
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let mut json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
        json.push('\n');
        json
    }
}

fn outcome_line(outcome: &GameOutcome, mark: &str) -> String {
    let message = outcome.message.as_deref().unwrap_or("");
    format!(
        "{} {} {}: {}",
        mark,
        outcome.operation.to_string().to_uppercase(),
        outcome.game,
        message
    )
}

/// Formatters module - factory for creating formatters
pub struct Formatters;

impl Formatters {
    pub fn by_name(name: &str) -> Box<dyn Formatter> {
        match name.to_lowercase().as_str() {
            "json" => Box::new(JsonFormatter),
            "shell" => Box::new(ShellFormatter),
            _ => Box::new(TextFormatter),
        }
    }
}
