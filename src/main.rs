use std::process;

use backup_runner_lib::cli::Cli;
use backup_runner_lib::config::Config;
use backup_runner_lib::executor::ShellExecutor;
use backup_runner_lib::lock::RunLock;
use backup_runner_lib::logging;
use backup_runner_lib::runner::{RunError, Runner};

use clap::Parser;
use log::LevelFilter;

fn main() {
    let cli = Cli::parse();

    let config = Config::locate(cli.config.as_deref());

    // init logger
    let config_level = match &config {
        Ok(config) => config.log_level(),
        Err(_) => Ok(None),
    };
    let level = cli
        .verbose
        .or_else(|| config_level.as_ref().ok().copied().flatten())
        .unwrap_or(LevelFilter::Info);
    logging::init(level, cli.quiet).expect("logger should only be initialised once");

    if let Err(e) = config_level {
        log::warn!(target: "config", "{e}, logging at {level}");
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => exit_with(e.into()),
    };

    let _lock = match RunLock::acquire(&config.lock_path()) {
        Ok(lock) => lock,
        Err(e) => exit_with(e),
    };

    if cli.dry_run {
        log::warn!("Running in dry-run mode");
    }

    let jobs = if cli.jobs.is_empty() {
        config.jobs()
    } else {
        cli.jobs
    };

    let mut runner = Runner::new(&config, ShellExecutor::new(config.shell()), cli.dry_run);
    let status = match runner.run(&jobs) {
        Ok(tally) => tally.exit_code(),
        Err(e) => exit_with(e),
    };

    log::logger().flush();
    process::exit(status);
}

/// Log a fatal error and terminate with its exit status.
fn exit_with(err: RunError) -> ! {
    let status = err.exit_code();
    log::error!("{err}");
    log::error!("Terminating with exit status {status}");
    log::logger().flush();

    process::exit(status)
}
