//! Running the configured jobs one after another.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use derive_more::{Display, Error, From};

use crate::backends::{Backend, GenerateError, JobContext};
use crate::config::{Config, ConfigError};
use crate::executor::Execute;
use crate::job::{Job, JobError};
use crate::util::expand::expand_time;
use crate::util::shell::redact;

/// Exit status on configuration, generation and lock errors.
pub const EXIT_CONFIG: i32 = 1;
/// Exit status if a job has an unknown type.
pub const EXIT_UNKNOWN_TYPE: i32 = 10;
/// Exit status if a job with `stop_on_error` failed.
pub const EXIT_STOP_ON_ERROR: i32 = 500;

#[derive(Debug, Display, Error, From)]
/// Errors terminating a whole run.
pub enum RunError {
    /// A setting is missing or malformed.
    #[display("{_0}")]
    #[from]
    Config(ConfigError),
    /// A job has a type no backend exists for.
    #[display("Job {job} has unknown type: {kind}")]
    UnknownJobType { job: String, kind: String },
    /// The commands of a job can't be generated.
    #[display("Job {job}: {source}")]
    Generate { job: String, source: GenerateError },
    /// A job with `stop_on_error` had failing commands.
    #[display("Job {job} failed with {errors} error(s), stopping")]
    StopOnError { job: String, errors: usize },
    /// Another run holds the lock.
    #[display("Unable to lock {}: {source}", path.display())]
    Lock { path: PathBuf, source: io::Error },
}

impl From<JobError> for RunError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Config(err) => Self::Config(err),
            JobError::UnknownKind { job, kind } => Self::UnknownJobType { job, kind },
        }
    }
}

impl RunError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownJobType { .. } => EXIT_UNKNOWN_TYPE,
            Self::StopOnError { .. } => EXIT_STOP_ON_ERROR,
            Self::Config(_) | Self::Generate { .. } | Self::Lock { .. } => EXIT_CONFIG,
        }
    }
}

/// Failed commands of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTally {
    pub job: String,
    pub errors: usize,
}

/// Failed commands of a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunTally {
    pub jobs: Vec<JobTally>,
}

impl RunTally {
    fn record(&mut self, job: &str, errors: usize) {
        self.jobs.push(JobTally {
            job: job.to_string(),
            errors,
        });
    }

    /// Sum of the errors of every job.
    pub fn total_errors(&self) -> usize {
        self.jobs.iter().map(|job| job.errors).sum()
    }

    /// Process exit status: the total error count, saturated at 255.
    pub fn exit_code(&self) -> i32 {
        self.total_errors().min(255) as i32
    }
}

/// Runs jobs sequentially, handing their commands to an [Execute] implementation.
#[derive(Debug)]
pub struct Runner<'a, E> {
    config: &'a Config,
    executor: E,
    dry_run: bool,
}

impl<'a, E: Execute> Runner<'a, E> {
    /// On a dry run commands are only logged, never executed.
    pub fn new(config: &'a Config, executor: E, dry_run: bool) -> Self {
        Self {
            config,
            executor,
            dry_run,
        }
    }

    /// Consume the runner, returning its executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Commands of `job` started at `now`: the pre hook, the backend's
    /// pipelines and the post hook.
    pub fn commands(&self, job: &Job, now: DateTime<Local>) -> Result<Vec<String>, RunError> {
        let ctx = JobContext::new(job, self.config, now, self.dry_run);
        let generate_error = |source| RunError::Generate {
            job: job.name.clone(),
            source,
        };

        let backend = Backend::from_context(&ctx).map_err(generate_error)?;

        let mut commands = Vec::new();
        if let Some(pre) = &job.pre {
            commands.push(expand_time(pre, &now));
        }
        commands.extend(backend.generate(&ctx).map_err(generate_error)?);
        if let Some(post) = &job.post {
            commands.push(expand_time(post, &now));
        }

        Ok(commands)
    }

    /// Run the job `name`, returning its number of failed commands.
    pub fn run_job(&mut self, name: &str) -> Result<usize, RunError> {
        let now = Local::now();
        let job = Job::from_config(self.config, name)?;
        log::info!(target: "runner", "Starting job {name} ({})", job.kind);

        let commands = self.commands(&job, now)?;

        let mut errors = 0;
        for command in &commands {
            if self.dry_run {
                log::info!(target: "runner", "[{name}] Would run: {}", redact(command));
                continue;
            }

            let result = self.executor.execute(name, command);
            if result.failed {
                errors += 1;
            }
        }

        if errors == 0 {
            log::info!(target: "runner", "Finished job {name} without errors");
        } else {
            log::warn!(target: "runner", "Finished job {name} with {errors} error(s)");
        }

        if job.stop_on_error && errors > 0 {
            return Err(RunError::StopOnError {
                job: job.name,
                errors,
            });
        }

        Ok(errors)
    }

    /// Run `jobs` in order.
    ///
    /// Failing commands are counted and the run continues, unless the failing
    /// job has `stop_on_error` set.
    pub fn run<S: AsRef<str>>(&mut self, jobs: &[S]) -> Result<RunTally, RunError> {
        if jobs.is_empty() {
            log::warn!(target: "runner", "No jobs to run");
        }

        let mut tally = RunTally::default();
        for name in jobs {
            let name = name.as_ref();
            let errors = self.run_job(name).inspect_err(|_| {
                log::debug!(
                    target: "runner",
                    "{} error(s) before aborting at job {name}",
                    tally.total_errors()
                );
            })?;
            tally.record(name, errors);
        }

        log::info!(
            target: "runner",
            "Finished {} job(s) with {} error(s)",
            tally.jobs.len(),
            tally.total_errors()
        );

        Ok(tally)
    }
}
