// Declare modules
pub mod cli;
pub mod config;
pub mod filter;
pub mod formatter;
pub mod models;
pub mod scanner;
pub mod strip;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;

use self::cli::Cli;
use self::config::Config;
use self::models::RunStats;

/// Initializes components and orchestrates data flow.
pub fn run() -> Result<()> {
    // 1. Parse Args
    let args = Cli::parse();

    // 2. Identify Project Root
    let root = env::current_dir().context("Failed to get current directory")?;

    run_with(&root, &args).map(|_| ())
}

/// Config resolution + generation against an explicit root. Split out of
/// `run` so tests can drive the whole flow without chdir.
pub fn run_with(root: &Path, args: &Cli) -> Result<RunStats> {
    // 3. Resolve Configuration
    let loaded = if args.reset {
        log::info!("🔄 Resetting configuration to defaults...");
        None
    } else {
        config::load(root)
    };

    let mut config = match loaded {
        Some(config) => config,
        None => {
            log::info!("...Auto-generating configuration file.");
            let config = Config::default();
            config::save(root, &config);
            config
        }
    };

    // 4. Apply CLI modifiers and persist the result
    if config.apply_cli(args) {
        config::save(root, &config);
    }

    if args.init {
        log::info!("✅ Configuration initialized/updated.");
        return Ok(RunStats::default());
    }

    // 5. Run Generator
    let project_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    generate(root, project_name, &config)
}

/// Discovery → filter → render → assemble. The returned stats mirror what
/// was reported on the operator side channel.
pub fn generate(root: &Path, project_name: &str, config: &Config) -> Result<RunStats> {
    log::info!("🔍 Finding relevant files...");
    let mut files = scanner::resolve_files(root, config);

    if files.is_empty() {
        log::warn!("⚠️ No files found. Check your configuration.");
        return Ok(RunStats::default());
    }

    scanner::sort_for_pipeline(&mut files);
    log::info!("   Processing {} files...", files.len());

    let outcome = filter::process_files(&mut files, config);

    // fullTree always means "the full discovery list", independent of the
    // budget stop point.
    let tree = if config.options.tree_full {
        formatter::render_tree(files.iter().map(|f| f.relative_path.as_str()))
    } else {
        formatter::render_tree(outcome.blocks.iter().map(|b| b.relative_path.as_str()))
    };

    let document = formatter::assemble(project_name, config, &tree, &outcome);
    let output_path = root.join(&config.output_file);
    fs::write(&output_path, &document)
        .with_context(|| format!("Failed to write output file {}", output_path.display()))?;

    formatter::print_stats(&output_path, &outcome.stats, config);
    Ok(outcome.stats)
}
