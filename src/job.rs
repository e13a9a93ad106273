//! Backup jobs as declared in the configuration.

use derive_more::{Display, Error, From};

use crate::config::{Config, ConfigError};
use crate::util::fs::{parse_mode, DEFAULT_DIR_MODE};

/// Kind of backup performed by a [Job], selected by its `type` key.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Synchronise files with rsync.
    #[display("sync")]
    #[serde(alias = "rsync")]
    Sync,
    /// Pack files into a tar archive.
    #[display("archive")]
    #[serde(alias = "tar")]
    Archive,
    /// Dump MySQL/MariaDB databases, one compressed file each.
    #[display("database")]
    #[serde(alias = "mysql")]
    Database,
    /// Dump a Subversion repository.
    #[display("repository")]
    #[serde(alias = "svn")]
    Repository,
    /// Dump an LDAP directory server.
    #[display("directory")]
    #[serde(alias = "ldap")]
    Directory,
    /// Dump Kerberos realm databases, one compressed file each.
    #[display("realm")]
    #[serde(alias = "kerberos")]
    Realm,
}

#[derive(Debug, Display, Error, From)]
/// Errors on reading a [Job] from the configuration.
pub enum JobError {
    /// A job setting is missing or malformed.
    #[display("{_0}")]
    #[from]
    Config(ConfigError),
    /// The job's `type` isn't one of the known [JobKind]s.
    #[display("Job {job} has unknown type: {kind}")]
    UnknownKind { job: String, kind: String },
}

/// A named backup unit read from the configuration.
///
/// Type specific settings are read by the backend handling the [JobKind].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub kind: JobKind,
    /// Destination, may contain strftime directives.
    pub destination: String,
    /// Shell snippet run before the backup commands.
    pub pre: Option<String>,
    /// Shell snippet run after the backup commands.
    pub post: Option<String>,
    /// Abort the whole run if any command of this job fails.
    pub stop_on_error: bool,
    /// Create missing destination directories.
    pub create_destination: bool,
    /// Permission bits of created directories.
    pub dir_mode: u32,
}

impl Job {
    /// Read the job `name` from `config`.
    pub fn from_config(config: &Config, name: &str) -> Result<Self, JobError> {
        let key = |k: &str| format!("{name}.{k}");

        let destination = config.get_required(&key("destination"))?;

        let kind_name = config.get_required(&key("type"))?;
        let kind = config
            .get_as::<JobKind>(&key("type"))
            .ok()
            .flatten()
            .ok_or_else(|| JobError::UnknownKind {
                job: name.to_string(),
                kind: kind_name,
            })?;

        let dir_mode = match config.get_or(&key("dirmode"), "defaults.dirmode") {
            None => DEFAULT_DIR_MODE,
            Some(mode) => parse_mode(&mode).ok_or_else(|| ConfigError::InvalidValue {
                key: key("dirmode"),
                value: mode,
            })?,
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            destination,
            pre: config.get(&key("pre")).filter(|s| !s.trim().is_empty()),
            post: config.get(&key("post")).filter(|s| !s.trim().is_empty()),
            stop_on_error: config.get_bool(&key("stop_on_error"), false)?,
            create_destination: config.get_bool(&key("create_destination"), true)?,
            dir_mode,
        })
    }

    /// Fully qualified config key of the job setting `key`.
    pub fn key(&self, key: &str) -> String {
        format!("{}.{key}", self.name)
    }
}
