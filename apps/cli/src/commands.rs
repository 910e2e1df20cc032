//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::{Value, json};
use tracing::{debug, info};

use chainworks_assembler::{Assembler, ComponentRegistry};
use chainworks_core::{CatalogFactory, Command as _, Context};
use chainworks_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Chainworks: assemble command chains from TOML and run them.
#[derive(Parser)]
#[command(
    name = "chainworks",
    version,
    about = "Assemble command catalogs from TOML definitions and run their chains.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble definitions and execute one command.
    Run {
        /// Definition files (defaults to `assembler.definitions` from config).
        files: Vec<PathBuf>,

        /// Command to execute, optionally qualified as `catalog.name`.
        #[arg(short = 'c', long = "command", value_name = "ID")]
        id: String,

        /// Catalog to look the command up in.
        #[arg(long)]
        catalog: Option<String>,

        /// Seed the context (repeatable). Values are parsed as JSON when
        /// possible and kept as strings otherwise.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,
    },

    /// List every catalog and its commands.
    List {
        /// Definition files (defaults to `assembler.definitions` from config).
        files: Vec<PathBuf>,
    },

    /// Assemble definitions and report any error.
    Check {
        /// Definition files (defaults to `assembler.definitions` from config).
        files: Vec<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chainworks=info",
        1 => "chainworks=debug",
        _ => "chainworks=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { files, id, catalog, set } => cmd_run(&files, &id, catalog.as_deref(), set),
        Command::List { files } => cmd_list(&files),
        Command::Check { files } => cmd_check(&files),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

struct Assembled {
    factory: Arc<CatalogFactory>,
    commands: usize,
    files: usize,
}

/// Assemble every definition file into one factory.
fn assemble(files: &[PathBuf], config: &AppConfig) -> Result<Assembled> {
    let files: Vec<PathBuf> = if files.is_empty() {
        config.assembler.definitions.iter().map(PathBuf::from).collect()
    } else {
        files.to_vec()
    };
    if files.is_empty() {
        return Err(eyre!(
            "no definition files given and `assembler.definitions` is empty"
        ));
    }

    let factory = match config.assembler.default_catalog.as_str() {
        "" => CatalogFactory::new(),
        alias => CatalogFactory::with_default_name(alias),
    };
    let factory = Arc::new(factory);
    let registry = ComponentRegistry::with_builtins();
    let mut assembler =
        Assembler::new(&registry, factory.clone()).with_policy(config.assembler.on_duplicate);

    let mut commands = 0;
    for path in &files {
        let summary = assembler
            .parse_path(path)
            .wrap_err_with(|| format!("failed to assemble {}", path.display()))?;
        debug!(path = %path.display(), commands = summary.commands, "definitions assembled");
        commands += summary.commands;
    }

    Ok(Assembled {
        factory,
        commands,
        files: files.len(),
    })
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_run(files: &[PathBuf], id: &str, catalog: Option<&str>, set: Vec<(String, Value)>) -> Result<()> {
    let config = load_config()?;
    let assembled = assemble(files, &config)?;
    let factory = &assembled.factory;

    let catalog = catalog
        .map(str::to_string)
        .or_else(|| Some(config.run.catalog.clone()).filter(|c| !c.is_empty()));
    let command = match &catalog {
        Some(name) => factory
            .get(Some(name.as_str()))
            .ok_or_else(|| eyre!("no catalog named '{name}'"))?
            .lookup(id)?,
        None => factory.lookup_command(id)?,
    };

    let mut context: Context = set.into_iter().collect();
    info!(command = id, catalog = catalog.as_deref().unwrap_or_default(), "executing");

    match command.execute(&mut context) {
        Ok(outcome) => {
            let report = json!({
                "outcome": if outcome.is_processed() { "processed" } else { "continue" },
                "context": context,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&json!({ "context": context }))?);
            Err(Report::new(err).wrap_err(format!("command '{id}' failed")))
        }
    }
}

fn cmd_list(files: &[PathBuf]) -> Result<()> {
    let config = load_config()?;
    let assembled = assemble(files, &config)?;
    let factory = &assembled.factory;

    print_catalog("(default)", &factory.catalog(None).names());
    for name in factory.catalog_names() {
        if let Some(catalog) = factory.get(Some(name.as_str())) {
            print_catalog(&name, &catalog.names());
        }
    }
    Ok(())
}

fn print_catalog(label: &str, names: &[String]) {
    println!("{label} ({} commands)", names.len());
    for name in names {
        println!("  {name}");
    }
}

fn cmd_check(files: &[PathBuf]) -> Result<()> {
    let config = load_config()?;
    let assembled = assemble(files, &config)?;
    println!(
        "ok: {} commands from {} file(s), {} named catalog(s)",
        assembled.commands,
        assembled.files,
        assembled.factory.catalog_names().len()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
