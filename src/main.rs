//! telegraf-provision - Main entry point
//!
//! Artifacts (JSON, TOML, plan summaries) go to stdout; logs go to stderr.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use telegraf_provision::cli::{Cli, Commands};
use telegraf_provision::{
    HostFacts, PlatformDefaults, ProvisionParams, apply_file_actions, document, installer,
    resolve,
};

/// Initialize the logger with appropriate settings
fn init_logger() {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_facts(path: Option<&Path>) -> Result<HostFacts> {
    match path {
        Some(path) => HostFacts::load_from_file(path),
        None => {
            debug!("No facts file given, detecting from this host");
            Ok(HostFacts::detect())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Facts => {
            let facts = HostFacts::detect();
            println!("{}", serde_json::to_string_pretty(&facts)?);
        }
        Commands::Resolve { params, facts } => {
            let params = ProvisionParams::load_from_file(&params)?;
            let facts = load_facts(facts.as_deref())?;
            let profile = resolve(&facts, &params).context("Failed to resolve platform profile")?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Render { params } => {
            let params = ProvisionParams::load_from_file(&params)?;
            let tree = params.plugin_tree()?;
            let document = document::render(&tree).context("Failed to render configuration")?;
            print!("{document}");
        }
        Commands::Plan { params, facts, json } => {
            let params = ProvisionParams::load_from_file(&params)?;
            let facts = load_facts(facts.as_deref())?;
            let plan = installer::build_plan(&facts, &params)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan.summary());
            }
        }
        Commands::Validate { params } => {
            info!("Validating parameters file: {:?}", params);
            let loaded = ProvisionParams::load_from_file(&params)?;
            loaded
                .validate()
                .with_context(|| format!("Invalid parameters in {:?}", params))?;
            println!("✓ Parameters file is valid: {:?}", params);
        }
        Commands::WriteConfig { params, facts, root } => {
            let params = ProvisionParams::load_from_file(&params)?;
            let facts = load_facts(facts.as_deref())?;
            let provisioning =
                installer::prepare(&facts, &params, &PlatformDefaults::default())?;
            let report = apply_file_actions(&provisioning.plan, root.as_deref(), cli.dry_run)?;
            info!(
                "{} written, {} unchanged, {} directories created",
                report.files_written.len(),
                report.files_unchanged.len(),
                report.directories_created.len()
            );
        }
    }
    Ok(())
}

/// Main application entry point
fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse_args();
    if cli.dry_run {
        info!("Dry-run mode enabled: no files will be written");
    }
    run(cli)
}
