//! Backend modules turning a [Job] into shell pipelines.
//!
//! Currently the following backends are implemented:
//!
//! - [Rsync]: Synchronise files into a destination directory.
//! - [Tar]: Pack files into an archive.
//! - [MySql]: Compressed dump of every selected database.
//! - [Subversion]: Compressed dump of a repository.
//! - [Ldap]: Compressed LDIF export of a directory server.
//! - [Kerberos]: Compressed dump of every selected realm.

pub mod compress;
pub mod kerberos;
pub mod ldap;
pub mod mysql;
pub mod rsync;
pub mod subversion;
pub mod tar;

pub use compress::Compressor;
pub use kerberos::Kerberos;
pub use ldap::Ldap;
pub use mysql::MySql;
pub use rsync::Rsync;
pub use subversion::Subversion;
pub use tar::Tar;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use derive_more::{Display, Error, From};

use crate::config::{Config, ConfigError};
use crate::job::{Job, JobKind};
use crate::util::expand::expand_time;
use crate::util::fs::prepare_dir;
use crate::util::shell::ShellError;

#[derive(Debug, Display, Error, From)]
/// Errors on generating the commands of a [Job].
pub enum GenerateError {
    /// A setting of the job is missing or malformed.
    #[display("{_0}")]
    #[from]
    Config(ConfigError),
    /// A command line can't be assembled safely.
    #[display("{_0}")]
    #[from]
    Shell(ShellError),
    /// A destination directory doesn't exist and can't be created.
    #[display("Unable to create directory {}", _0.display())]
    DirectoryCreation(#[error(ignore)] PathBuf),
    /// Querying the database server for its databases failed.
    #[display("Listing databases failed: {_0}")]
    DatabaseDiscovery(#[error(ignore)] String),
}

/// Everything a backend needs to know about the job it generates commands for.
///
/// The destination is time expanded once on construction, so every command
/// of a job refers to the same timestamp.
#[derive(Debug, Clone)]
pub struct JobContext<'a> {
    pub job: &'a Job,
    pub config: &'a Config,
    /// Start of the job, used for every time template of the job.
    pub now: DateTime<Local>,
    /// Time expanded destination.
    pub destination: PathBuf,
    /// Only log which directories would be created.
    pub dry_run: bool,
}

impl<'a> JobContext<'a> {
    /// Create the context of `job` started at `now`.
    pub fn new(job: &'a Job, config: &'a Config, now: DateTime<Local>, dry_run: bool) -> Self {
        let destination = PathBuf::from(expand_time(&job.destination, &now));

        Self {
            job,
            config,
            now,
            destination,
            dry_run,
        }
    }

    /// Job specific setting `key`.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.config.get(&self.job.key(key))
    }

    /// Job specific setting `key`, failing if absent.
    pub fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.config.get_required(&self.job.key(key))
    }

    /// Job specific list setting `key`.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.config.get_list(&self.job.key(key))
    }

    /// Binary of `tool`, overridable per job, falling back to `main.<tool>`.
    pub fn tool(&self, tool: &str) -> Result<String, ConfigError> {
        self.config
            .get_required_or(&self.job.key(tool), &format!("main.{tool}"))
    }

    /// Options of `tool`, overridable per job, falling back to `defaults.<tool>_opts`.
    pub fn tool_options(&self, tool: &str) -> String {
        let key = format!("{tool}_opts");
        self.config
            .get_or(&self.job.key(&key), &format!("defaults.{key}"))
            .unwrap_or_default()
    }

    /// Ensure `dir` exists if the job creates its destinations.
    pub fn ensure_dir(&self, dir: &Path) -> Result<(), GenerateError> {
        if !self.job.create_destination || dir.as_os_str().is_empty() {
            return Ok(());
        }

        if self.dry_run {
            if !dir.is_dir() {
                log::info!(target: "prepare", "Would create directory {}", dir.display());
            }
            return Ok(());
        }

        if prepare_dir(dir, self.job.dir_mode) {
            Ok(())
        } else {
            Err(GenerateError::DirectoryCreation(dir.to_path_buf()))
        }
    }

    /// Ensure the directory containing `path` exists if the job creates its destinations.
    pub fn ensure_parent(&self, path: &Path) -> Result<(), GenerateError> {
        match path.parent() {
            Some(parent) => self.ensure_dir(parent),
            None => Ok(()),
        }
    }

    /// The destination with `unit-` prepended to its file name.
    pub fn prefixed_destination(&self, unit: &str) -> PathBuf {
        match self.destination.file_name() {
            Some(name) => self
                .destination
                .with_file_name(format!("{unit}-{}", name.to_string_lossy())),
            None => self.destination.join(unit),
        }
    }
}

/// Generic command generator of a backup backend.
pub trait Generate: Sized {
    /// Resolve the settings of the backend from the job configuration.
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError>;

    /// Shell pipelines performing the backup, in execution order.
    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError>;
}

/// The backend of a job, selected by its [JobKind].
#[derive(Debug, Clone)]
pub enum Backend {
    Rsync(Rsync),
    Tar(Tar),
    MySql(MySql),
    Subversion(Subversion),
    Ldap(Ldap),
    Kerberos(Kerberos),
}

impl Backend {
    /// Resolve the backend handling the job of `ctx`.
    pub fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        Ok(match ctx.job.kind {
            JobKind::Sync => Self::Rsync(Rsync::from_context(ctx)?),
            JobKind::Archive => Self::Tar(Tar::from_context(ctx)?),
            JobKind::Database => Self::MySql(MySql::from_context(ctx)?),
            JobKind::Repository => Self::Subversion(Subversion::from_context(ctx)?),
            JobKind::Directory => Self::Ldap(Ldap::from_context(ctx)?),
            JobKind::Realm => Self::Kerberos(Kerberos::from_context(ctx)?),
        })
    }

    /// Shell pipelines of the backend, in execution order.
    pub fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        match self {
            Self::Rsync(backend) => backend.generate(ctx),
            Self::Tar(backend) => backend.generate(ctx),
            Self::MySql(backend) => backend.generate(ctx),
            Self::Subversion(backend) => backend.generate(ctx),
            Self::Ldap(backend) => backend.generate(ctx),
            Self::Kerberos(backend) => backend.generate(ctx),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    pub(crate) fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 4, 5, 6).unwrap()
    }

    pub(crate) fn setup(toml: &str, name: &str) -> (Config, Job) {
        let config = Config::from_toml(toml).unwrap();
        let job = Job::from_config(&config, name).unwrap();
        (config, job)
    }

    #[test]
    fn destination_is_expanded_once() {
        let (config, job) = setup(
            "[j]\ntype = \"database\"\ndestination = \"/b/%Y-%m-%d/dump.sql.gz\"\n",
            "j",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        assert_eq!(ctx.destination, PathBuf::from("/b/2024-03-09/dump.sql.gz"));
        assert_eq!(
            ctx.prefixed_destination("blog"),
            PathBuf::from("/b/2024-03-09/blog-dump.sql.gz")
        );
    }

    #[test]
    fn tools_fall_back_to_main_and_defaults() {
        let (config, job) = setup(
            r#"
[main]
rsync = "/usr/local/bin/rsync"

[j]
type = "sync"
destination = "/b/"
rsync_opts = "-aHAX"
"#,
            "j",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        assert_eq!(ctx.tool("rsync").unwrap(), "/usr/local/bin/rsync");
        assert_eq!(ctx.tool_options("rsync"), "-aHAX");
        assert_eq!(ctx.tool("gzip").unwrap(), "gzip");
        assert_eq!(ctx.tool_options("gzip"), "-c");
    }

    #[test]
    fn directories_are_only_created_when_enabled() {
        let root = tempfile::tempdir().unwrap();
        let toml = format!(
            "[j]\ntype = \"sync\"\ndestination = \"{}/x/\"\ncreate_destination = false\n",
            root.path().display()
        );
        let (config, job) = setup(&toml, "j");
        let ctx = JobContext::new(&job, &config, fixed_now(), false);

        ctx.ensure_dir(&ctx.destination).unwrap();
        assert!(!root.path().join("x").exists());
    }

    #[test]
    fn failing_directory_creation_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let toml = format!(
            "[j]\ntype = \"archive\"\ndestination = \"{}/sub/a.tar\"\n",
            blocker.display()
        );
        let (config, job) = setup(&toml, "j");
        let ctx = JobContext::new(&job, &config, fixed_now(), false);

        let err = ctx.ensure_parent(&ctx.destination).unwrap_err();
        assert!(matches!(err, GenerateError::DirectoryCreation(dir) if dir == blocker.join("sub")));
    }
}
