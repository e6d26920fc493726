//! `dep-checkr` — resolve the concrete dependency graph of Node.js projects.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`config::load_config`]) and apply CLI overrides.
//! 3. Discover modules ([`detector::discover_modules`]).
//! 4. Analyze every module concurrently ([`analyzer`]).
//! 5. Print a summary line per module, or the graphs as JSON.
//! 6. Exit `0` if every module resolved, `1` otherwise.

mod analyzer;
mod cli;
mod config;
mod detector;
mod error;
mod graph;
mod models;
mod tree;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use analyzer::node::npm::NpmCli;
use analyzer::node::NodeAnalyzer;
use analyzer::{Analyzer, Resolution};
use cli::{Cli, OutputFormat};
use config::load_config;
use detector::discover_modules;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let mut config = load_config(&path, cli.config.as_deref())?;
    if cli.no_npm {
        config.node.allow_npm = false;
    }
    if cli.production {
        config.node.include_dev = false;
    }

    let modules = discover_modules(&path, cli.recursive, &config.discovery.ignore)?;
    if modules.is_empty() {
        eprintln!("No package.json found in {}", path.display());
        std::process::exit(1);
    }

    let analyzer = NodeAnalyzer::new(
        NpmCli::new(config.node.npm.as_str(), config.node.timeout()),
        config.node.options(),
    );

    let pb = if !cli.quiet {
        let pb = ProgressBar::new(modules.len() as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")?,
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("resolving");
        Some(pb)
    } else {
        None
    };

    let results = join_all(modules.iter().map(|module| {
        let analyzer = &analyzer;
        let pb = pb.as_ref();
        async move {
            let result = analyzer.analyze(module).await;
            if let Some(pb) = pb {
                pb.inc(1);
            }
            result
        }
    }))
    .await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut resolutions = Vec::new();
    let mut failed = false;
    for (module, result) in modules.iter().zip(results) {
        match result {
            Ok(resolution) => resolutions.push(resolution),
            Err(e) => {
                failed = true;
                eprintln!("{} {}: {}", "error:".red().bold(), module.name, e);
            }
        }
    }

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolutions)?),
        OutputFormat::Summary => {
            for resolution in &resolutions {
                print_summary(resolution, cli.verbose);
            }
        }
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(resolution: &Resolution, verbose: bool) {
    let source = match resolution.lockfile {
        Some(format) => format.to_string(),
        None => resolution.strategy.to_string(),
    };
    println!(
        "  {} {} {} direct, {} total ({})",
        "→".cyan(),
        resolution.module.bold(),
        resolution.graph.direct.len(),
        resolution.graph.transitive.len(),
        source.dimmed()
    );

    for warning in &resolution.warnings {
        println!("    {} {}", "!".yellow(), warning);
    }

    if verbose {
        for package in resolution.graph.transitive.values() {
            println!("    {}", package.id);
            for edge in &package.imports {
                println!("      {} {}", edge.requested.dimmed(), edge.resolved);
            }
        }
    }
}
