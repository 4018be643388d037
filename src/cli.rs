//! Command-line interface for multicheck.

use clap::{Parser, Subcommand};

use crate::analyzer::Registry;
use crate::engine::Runner;
use crate::fix;
use crate::load::{GoLoader, Loader, Target};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Multi-analyzer static analysis driver.
///
/// Multicheck runs a set of analyzers over Go packages in dependency order,
/// sharing results between dependent analyzers and propagating facts along
/// the package import graph. Diagnostics print as
/// `<file>:<line>:<column>: <message>`; with `--fix`, suggested fixes are
/// applied to disk.
#[derive(Parser)]
#[command(name = "multicheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run analyzers over target packages
    #[command(visible_alias = "run")]
    Check(CheckArgs),
    /// List registered analyzers
    Analyzers,
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Target patterns: package directories, or file=<path> for the unit
    /// containing one file
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Analyzers to run (default: all registered)
    #[arg(short, long, value_delimiter = ',')]
    pub analyzers: Vec<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Apply suggested fixes to disk
    #[arg(long)]
    pub fix: bool,

    /// Only apply fixes whose message contains this text
    #[arg(long, requires = "fix")]
    pub fix_filter: Option<String>,

    /// Dump exported facts as JSON to stderr
    #[arg(long)]
    pub dump_facts: bool,
}

/// Run the check command against an explicit registry.
pub fn run_check(registry: &Registry, args: &CheckArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Parse all patterns before loading anything; a malformed pattern is a
    // configuration error, not a load failure.
    let mut targets = Vec::new();
    for pattern in &args.patterns {
        match Target::parse(pattern) {
            Ok(target) => targets.push(target),
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(EXIT_ERROR);
            }
        }
    }

    let roots: Vec<String> = if args.analyzers.is_empty() {
        registry.names().into_iter().map(String::from).collect()
    } else {
        args.analyzers.clone()
    };

    let loader = GoLoader::new();
    let loaded = loader.load(&targets)?;

    let runner = Runner::new(roots);
    let outcome = match runner.run(registry, &loaded.units) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(EXIT_ERROR);
        }
    };

    let mut fix_conflicts = false;
    if args.fix {
        let fix_report = fix::apply_fixes(
            &loaded.units,
            &outcome.diagnostics,
            args.fix_filter.as_deref(),
        )?;
        for (file, edits) in &fix_report.applied {
            eprintln!("fixed {file} ({edits} edit(s))");
        }
        for conflict in &fix_report.conflicts {
            eprintln!("Error: {conflict}");
        }
        fix_conflicts = fix_report.has_conflicts();
    }

    match args.format.as_str() {
        "json" => report::write_json(&outcome, &loaded.failures)?,
        _ => report::write_pretty(&outcome, &loaded.failures),
    }

    if args.dump_facts {
        eprintln!("{}", serde_json::to_string_pretty(&outcome.facts.dump())?);
    }

    if outcome.exit_code() != 0 || loaded.has_failures() || fix_conflicts {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the analyzers command: list what is registered.
pub fn run_analyzers(registry: &Registry) -> anyhow::Result<i32> {
    println!("Registered analyzers:");
    println!();
    for name in registry.names() {
        let Some(analyzer) = registry.get(name) else {
            continue;
        };
        println!("  {:<16} {}", name, analyzer.doc());
        if !analyzer.requirements().is_empty() {
            println!("  {:<16} requires: {}", "", analyzer.requirements().join(", "));
        }
    }
    Ok(EXIT_SUCCESS)
}
