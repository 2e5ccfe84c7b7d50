use fuzzgate_core::config::{DEFAULT_CONFIG_FILE, DriverConfig};
use fuzzgate_core::error::EXIT_CONFIG;
use fuzzgate_core::{CargoFuzzEngine, Dispatched, Dispatcher, DriverError, Invocation};

use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once SIGINT/SIGTERM arrives during a fuzzing run.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Lists the fuzz targets of a project, or fuzzes one target until the
/// first failing input.
///
/// Exit status: 0 clean, 1 failing input found, 2 usage error, 3 engine
/// failed for another reason, 4 engine could not be launched, 5 targets
/// could not be listed, 6 configuration error, 7 target list could not be
/// written to stdout.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    /// TOML configuration file (defaults to ./fuzzgate.toml when present).
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Rust toolchain passed to cargo as `+<toolchain>`.
    #[clap(long)]
    toolchain: Option<String>,
    /// Fuzz project directory passed to `cargo fuzz --fuzz-dir`.
    #[clap(long, value_parser)]
    fuzz_dir: Option<PathBuf>,
    #[clap(short, long)]
    verbose: bool,
    /// Target to fuzz. Without it, the available targets are listed.
    target: Option<String>,
    /// Extra arguments forwarded to the fuzzing engine.
    #[clap(last = true)]
    engine_args: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

/// Keeps fuzzgate alive through Ctrl-C and SIGTERM while the engine runs.
///
/// The signal reaches the engine through the process group; the engine
/// prints its shutdown report and exits, and that report still has to be
/// relayed and the engine's exit status reported.
fn install_interrupt_handler() {
    if let Err(err) = ctrlc::set_handler(|| {
        if !INTERRUPTED.swap(true, Ordering::SeqCst) {
            log::warn!("Interrupt received, waiting for the fuzzing engine to exit");
        }
    }) {
        eprintln!("Warning: Failed to install Ctrl+C handler: {err}");
    }
}

fn load_config(cli: &Cli) -> Result<DriverConfig, anyhow::Error> {
    let mut config = match &cli.config_file {
        Some(config_path) => {
            log::info!("Loading configuration from specified path: {config_path:?}");
            DriverConfig::load_from_file(config_path)?
        }
        None => {
            let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_config_path.exists() {
                log::info!(
                    "No config file specified via CLI, loading default: {default_config_path:?}"
                );
                DriverConfig::load_from_file(&default_config_path)?
            } else {
                log::debug!(
                    "No config file specified and default '{DEFAULT_CONFIG_FILE}' not found, using built-in defaults."
                );
                DriverConfig::default()
            }
        }
    };

    if let Some(toolchain) = &cli.toolchain {
        config.engine.toolchain = Some(toolchain.clone());
    }
    if let Some(fuzz_dir) = &cli.fuzz_dir {
        config.engine.fuzz_dir = Some(fuzz_dir.clone());
    }

    log::debug!("Effective configuration: {config:#?}");
    Ok(config)
}

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let invocation = Invocation::from_args(cli.target.clone(), cli.engine_args.clone())?;
    let config = load_config(&cli)?;

    if matches!(invocation, Invocation::Run(_)) {
        install_interrupt_handler();
    }
    let engine = CargoFuzzEngine::new(&config);
    let mut out = io::stdout().lock();
    match Dispatcher::new(engine).dispatch(invocation, &mut out)? {
        Dispatched::Listed(catalog) => log::debug!("Listed {} fuzz target(s)", catalog.len()),
        Dispatched::Completed(exit) => {
            log::info!("Fuzzing finished without a failing input ({})", exit.describe())
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<DriverError>() {
            Some(driver_err) => {
                if INTERRUPTED.load(Ordering::SeqCst) {
                    eprintln!("fuzzgate: run interrupted");
                }
                eprintln!("fuzzgate: {}: {}", driver_err.category(), driver_err);
                ExitCode::from(driver_err.exit_code())
            }
            None => {
                eprintln!("fuzzgate: configuration error: {err:#}");
                ExitCode::from(EXIT_CONFIG)
            }
        },
    }
}
