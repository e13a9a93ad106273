use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file. Defaults to /etc/backup-runner.conf, then ./backup-runner.conf.
    #[arg(long, short = 'c', env = "BACKUP_RUNNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity of the console output. Overrides `main.loglevel`.
    #[arg(long, short = 'v')]
    pub verbose: Option<LevelFilter>,

    /// Only print errors to the console.
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Log the commands of every job without running them.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Jobs to run, in order. Defaults to `main.jobs`.
    pub jobs: Vec<String>,
}
