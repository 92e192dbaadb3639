//! # Frequency Generator Control Unit
//!
//! Runs the command, safety and PLL tasks on the selected board. The serial
//! protocol uses the board's transport (stdin/stdout for `simulation`);
//! tracing goes to stderr.
//!
//! `SYS:RESET` rebuilds the board and restarts the system. A transport fault
//! exits with status 1.

use clap::Parser;
use fgen_common::config::{GeneratorConfig, load_generator_config};
use fgen_control_unit::scheduler::{Coordinator, ExitReason, StopHandle};
use fgen_hal::DriverRegistry;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Frequency Generator Control Unit - synthesizer control and thermal safety
#[derive(Parser, Debug)]
#[command(name = "fgen_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Control and safety supervisor for the microwave frequency generator")]
struct Args {
    /// Path to the configuration TOML. Built-in defaults when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Board to run on (overrides `[board] driver`).
    #[arg(long, value_name = "NAME")]
    board: Option<String>,

    /// Calibration file (overrides `[board] calibration_path`).
    #[arg(long, value_name = "FILE")]
    calibration: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, &config);

    info!(
        service = %config.shared.service_name,
        "Frequency Generator v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    match run(&config) {
        Ok(reason) if reason.is_failure() => {
            error!("Stopped on {reason}");
            process::exit(1);
        }
        Ok(reason) => info!("Frequency Generator stopped ({reason})"),
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_generator_config(path)
            .map_err(|e| format!("{}: {e}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(board) = &args.board {
        config.board.driver = board.clone();
    }
    if let Some(path) = &args.calibration {
        config.board.calibration_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn run(config: &GeneratorConfig) -> Result<ExitReason, Box<dyn std::error::Error>> {
    let registry = DriverRegistry::with_builtin();

    // Signal handler: one per process, pointed at whichever system is running.
    let current: Arc<Mutex<Option<StopHandle>>> = Arc::new(Mutex::new(None));
    let stopping = Arc::new(AtomicBool::new(false));
    {
        let current = Arc::clone(&current);
        let stopping = Arc::clone(&stopping);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            stopping.store(true, Ordering::SeqCst);
            if let Some(stop) = current.lock().as_ref() {
                stop.request_stop();
            }
        })?;
    }

    loop {
        let drivers = registry
            .create_board(&config.board.driver, config)
            .inspect_err(|_| {
                let mut boards = registry.list_boards();
                boards.sort_unstable();
                warn!("Available boards: {}", boards.join(", "));
            })?;
        info!(board = %config.board.driver, "Board created");

        let system = Coordinator::new(config.clone(), drivers).start()?;
        *current.lock() = Some(system.stop_handle());
        if stopping.load(Ordering::SeqCst) {
            system.stop_handle().request_stop();
        }

        let reason = system.run()?;
        *current.lock() = None;

        if reason == ExitReason::Reset && !stopping.load(Ordering::SeqCst) {
            info!("Rebooting after system reset");
            continue;
        }
        return Ok(reason);
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, config: &GeneratorConfig) {
    let level = if args.verbose {
        "debug"
    } else {
        config.shared.log_level.as_directive()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        level
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
