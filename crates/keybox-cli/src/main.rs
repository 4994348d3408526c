use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keybox_controller::{KeyboxConfig, SessionError, start};
use keybox_hardware::UsbLocator;
use keybox_storage::StorageError;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "RFID lockbox access controller", long_about = None)]
struct Cli {
    /// JSON configuration file. Missing keys keep their defaults.
    #[arg(short, long, global = true, value_name = "FILE", env = "KEYBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the ID list and the access log.
    /// Defaults to the directory of the executable.
    #[arg(long, global = true, value_name = "DIR", env = "KEYBOX_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Discover the devices and run the access control session (default).
    Run,
    /// Create empty ID list and log files if they are missing.
    Init,
    /// Print the authorized tag identifiers.
    List,
    /// Print the effective configuration as JSON.
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {e}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_session(config),
        Command::Init => init_files(&config),
        Command::List => list_ids(&config),
        Command::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<KeyboxConfig> {
    let config = match path {
        Some(path) => KeyboxConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => KeyboxConfig::default(),
    };

    let base_dir = match data_dir {
        Some(dir) => Some(dir),
        None if config.storage.base_dir.is_some() => None,
        None => executable_dir(),
    };

    Ok(match base_dir {
        Some(dir) => config.with_base_dir(dir),
        None => config,
    })
}

fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

fn run_session(config: KeyboxConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the async runtime")?;

    info!(
        id_list = %config.storage.id_path().display(),
        log = %config.storage.log_path().display(),
        "Starting keybox controller"
    );

    runtime.block_on(async move {
        let locator = UsbLocator::new(config.serial, config.control_link);
        let mut session = start(config, locator).await?;
        session.run().await
    })?;

    Ok(())
}

fn init_files(config: &KeyboxConfig) -> Result<()> {
    let store = config.storage.authorization_store();
    let log = config.storage.access_log();

    for (label, path, created) in [
        ("ID list", store.path().to_path_buf(), store.ensure_exists()?),
        ("access log", log.path().to_path_buf(), log.ensure_exists()?),
    ] {
        let state = if created { "created" } else { "already exists" };
        println!("{label}: {} ({state})", path.display());
    }
    Ok(())
}

fn list_ids(config: &KeyboxConfig) -> Result<()> {
    let store = config.storage.authorization_store();
    let set = store
        .load()
        .with_context(|| format!("reading {}", store.path().display()))?;

    for entry in set.entries() {
        println!("{}", entry.tag());
    }
    Ok(())
}

/// Underlying I/O error kind anywhere in the error chain.
fn io_kind(err: &anyhow::Error) -> Option<io::ErrorKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<SessionError>() {
            e.io_kind()
        } else if let Some(e) = cause.downcast_ref::<StorageError>() {
            e.io_kind()
        } else {
            cause.downcast_ref::<io::Error>().map(io::Error::kind)
        }
    })
}

/// Categorized one-line message for a fatal error.
fn describe(err: &anyhow::Error) -> String {
    match io_kind(err) {
        Some(io::ErrorKind::NotFound) => format!("File not found: {err:#}"),
        Some(io::ErrorKind::PermissionDenied) => format!("Permission denied: {err:#}"),
        _ => format!("Unknown error: {err:#}"),
    }
}
