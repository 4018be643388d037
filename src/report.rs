//! Output formatting for run results.
//!
//! Two formats:
//! - Pretty: plain diagnostic lines plus a colored summary for humans
//! - JSON: structured output for programmatic consumption
//!
//! Diagnostics are already sorted by file then position when they reach
//! here, so both formats are deterministic for identical inputs.

use colored::*;
use serde::Serialize;

use crate::engine::RunOutcome;
use crate::load::LoadFailure;

/// JSON report structure.
#[derive(Serialize)]
pub struct JsonReport {
    pub version: String,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub frontend_errors: Vec<JsonFrontendError>,
    pub errors: Vec<JsonPassError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_failures: Vec<JsonLoadFailure>,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct JsonDiagnostic {
    pub analyzer: String,
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub message: String,
    pub fixes: usize,
}

#[derive(Serialize)]
pub struct JsonFrontendError {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct JsonPassError {
    pub analyzer: String,
    pub unit: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct JsonLoadFailure {
    pub pattern: String,
    pub message: String,
}

/// Build the JSON report structure.
pub fn build_json(outcome: &RunOutcome, load_failures: &[LoadFailure]) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        diagnostics: outcome
            .diagnostics
            .iter()
            .map(|d| JsonDiagnostic {
                analyzer: d.analyzer.clone(),
                file: d.file.clone(),
                line: d.span.start_line,
                col: d.span.start_col,
                message: d.message.clone(),
                fixes: d.fixes.len(),
            })
            .collect(),
        frontend_errors: outcome
            .frontend_errors
            .iter()
            .map(|e| JsonFrontendError {
                file: e.file.clone(),
                line: e.span.start_line,
                col: e.span.start_col,
                message: e.message.clone(),
            })
            .collect(),
        errors: outcome
            .errors
            .iter()
            .map(|e| JsonPassError {
                analyzer: e.analyzer.clone(),
                unit: e.unit.to_string(),
                message: e.message.clone(),
            })
            .collect(),
        load_failures: load_failures
            .iter()
            .map(|f| JsonLoadFailure {
                pattern: f.pattern.clone(),
                message: f.message.clone(),
            })
            .collect(),
        skipped: outcome.skipped.len(),
    }
}

/// Write the JSON report to stdout.
pub fn write_json(outcome: &RunOutcome, load_failures: &[LoadFailure]) -> anyhow::Result<()> {
    let report = build_json(outcome, load_failures);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write the human-readable report: diagnostics to stdout, everything else
/// to stderr.
pub fn write_pretty(outcome: &RunOutcome, load_failures: &[LoadFailure]) {
    for failure in load_failures {
        eprintln!(
            "{} pattern {}: {}",
            "error:".red().bold(),
            failure.pattern,
            failure.message
        );
    }

    for err in &outcome.frontend_errors {
        eprintln!("{} {}", "error:".red().bold(), err);
    }

    for diagnostic in &outcome.diagnostics {
        println!("{diagnostic}");
    }

    for err in &outcome.errors {
        eprintln!(
            "{} analyzer {} on {}: {}",
            "error:".red().bold(),
            err.analyzer.bold(),
            err.unit,
            err.message
        );
    }

    let count = outcome.diagnostics.len();
    if count == 0 && outcome.errors.is_empty() && outcome.frontend_errors.is_empty() {
        if load_failures.is_empty() {
            eprintln!("{}", "no findings".green());
        }
    } else {
        let noun = if count == 1 { "finding" } else { "findings" };
        eprintln!("{}", format!("{count} {noun}").yellow());
    }
    if !outcome.skipped.is_empty() {
        eprintln!(
            "{}",
            format!("{} pass(es) skipped", outcome.skipped.len()).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FactStore;

    #[test]
    fn test_json_report_shape() {
        let outcome = RunOutcome {
            diagnostics: vec![],
            frontend_errors: vec![],
            errors: vec![],
            skipped: vec![],
            facts: FactStore::new(),
        };
        let report = build_json(&outcome, &[]);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["diagnostics"].as_array().unwrap().is_empty());
        assert_eq!(value["skipped"], 0);
        // Empty load failures are omitted entirely.
        assert!(value.get("load_failures").is_none());
    }
}
