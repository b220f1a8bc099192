//! Sideload - app package deployment tool
//!
//! Usage:
//!   sideload inspect app.appx                    # Show manifest, identity and dependencies
//!   sideload match app.appx --snapshot list.json # Match against a saved device listing
//!   sideload config                              # Show effective configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sideload_core::config::{ConfigStore, to_toml};
use sideload_core::host::InstalledPackage;
use sideload_core::identity::{DeterministicEncoder, IdentityResolver, PackageIdentity};
use sideload_core::manifest::{ManifestParser, PackageManifest};
use sideload_core::matcher::{find_exact, find_loose};

#[derive(Parser)]
#[command(name = "sideload")]
#[command(about = "App package deployment tool", long_about = None)]
struct Cli {
    /// Increase log verbosity
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a package's manifest, identity and resolved dependencies
    Inspect {
        /// Package archive, manifest file or extracted package folder
        artifact: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Match a package against a saved device package listing
    ///
    /// The snapshot is a JSON array of installed packages with
    /// `name`, `publisher`, `version`, `full_name` and `launch_id`.
    Match {
        artifact: PathBuf,

        /// JSON file holding the device's installed packages
        #[arg(long)]
        snapshot: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Print the config file path only
        #[arg(long)]
        path: bool,

        /// Write the default configuration if no file exists
        #[arg(long, conflicts_with = "path")]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sideload=debug,sideload_core=debug,info"
    } else {
        "sideload=info,sideload_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run_cli(cli)
}

fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect { artifact, format } => run_inspect(&artifact, format),
        Commands::Match {
            artifact,
            snapshot,
            format,
        } => run_match(&artifact, &snapshot, format),
        Commands::Config { path, init } => run_config(cli.config, path, init),
    }
}

/// Parse `artifact` and derive its identity with the portable encoder.
fn load_package(artifact: &Path) -> Result<(Arc<PackageManifest>, PackageIdentity)> {
    if !artifact.exists() {
        anyhow::bail!("Specified artifact '{}' wasn't found", artifact.display());
    }

    let manifest = ManifestParser::new()
        .parse(artifact)
        .with_context(|| format!("Failed to read package manifest: {}", artifact.display()))?;
    if !manifest.is_valid() {
        anyhow::bail!(
            "Specified package '{}' contains an invalid manifest",
            artifact.display()
        );
    }

    let identity = IdentityResolver::new(Arc::new(DeterministicEncoder))
        .resolve(&manifest)
        .context("Failed to resolve package identity")?;

    Ok((manifest, identity))
}

fn run_inspect(artifact: &Path, format: OutputFormat) -> Result<()> {
    let (manifest, identity) = load_package(artifact)?;

    match format {
        OutputFormat::Table => {
            print_identity(&identity);
            if let Some(fields) = manifest.fields() {
                println!("  Framework:    {}", fields.is_framework);
            }
            println!();

            let dependencies = manifest.dependencies();
            println!("Dependencies ({}):", dependencies.len());
            for declared in manifest.declared_dependencies() {
                let min = declared
                    .min_version
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  declared {} (>= {})", declared.name, min);
            }
            for path in dependencies {
                println!("  {} {}", style("+").green(), path.display());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "artifact": manifest.path(),
                "manifest": manifest.fields(),
                "identity": identity,
                "dependencies": manifest.dependencies(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn run_match(artifact: &Path, snapshot: &Path, format: OutputFormat) -> Result<()> {
    let (_, identity) = load_package(artifact)?;
    let installed = read_snapshot(snapshot)?;

    let previous = find_loose(&identity, &installed);
    let exact = find_exact(&identity, &installed, 0);

    match format {
        OutputFormat::Table => {
            print_identity(&identity);
            println!();

            println!("Replaced on install ({}):", previous.len());
            if !previous.is_empty() {
                print_package_table(&previous);
            }
            println!();

            match exact {
                Some(package) => {
                    println!("{} {}", style("Installed as:").bold(), package.full_name);
                    println!("  Launch id:    {}", package.launch_id);
                }
                None => println!("{}", style("No exact match on device").yellow()),
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "identity": identity,
                "replaced_on_install": previous,
                "exact_match": exact,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn run_config(config_path: Option<PathBuf>, path_only: bool, init: bool) -> Result<()> {
    let store = match config_path {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::with_defaults()?,
    };

    if path_only {
        println!("{}", store.config_path().display());
        return Ok(());
    }

    let config = store.load()?;
    if init && !store.config_path().exists() {
        store.save(&config)?;
        tracing::info!(path = %store.config_path().display(), "Wrote default configuration");
    }

    println!("# {}", store.config_path().display());
    print!("{}", to_toml(&config)?);
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<Vec<InstalledPackage>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

fn print_identity(identity: &PackageIdentity) {
    println!("{}", style(&identity.package_name).bold().cyan());
    println!("  Publisher:    {}", identity.publisher);
    println!("  Version:      {}", identity.version);
    println!("  Architecture: {}", identity.cpu_architecture);
    if !identity.resource_id.is_empty() {
        println!("  Resource id:  {}", identity.resource_id);
    }
    println!("  App id:       {}", identity.app_id);
    println!("  Full name:    {}", or_dash(&identity.package_full_name));
    println!("  Family name:  {}", or_dash(&identity.package_family_name));
    println!("  Launch id:    {}", or_dash(&identity.launch_id));
}

fn print_package_table(packages: &[&InstalledPackage]) {
    println!("  {:<12} {:<50} Launch id", "Version", "Full name");
    println!("  {}", "-".repeat(80));

    for package in packages {
        println!(
            "  {:<12} {:<50} {}",
            truncate(&package.version, 12),
            truncate(&package.full_name, 50),
            package.launch_id
        );
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
