//! Multicheck CLI entry point.

use clap::Parser;
use multicheck::analyzer::Registry;
use multicheck::cli::{self, Cli, Commands, EXIT_ERROR};
use multicheck::passes;

/// Build the default registry: the infrastructure analyzers shipped with
/// the driver. Embedders construct their own registry with their rules.
fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(passes::inspect_analyzer())
        .expect("default registry has no duplicate names");
    registry
}

fn main() {
    let cli = Cli::parse();
    let registry = default_registry();

    let exit_code = match cli.command {
        Commands::Check(args) => match cli::run_check(&registry, &args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
        Commands::Analyzers => match cli::run_analyzers(&registry) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(exit_code);
}
