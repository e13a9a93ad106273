//! Immutable configuration snapshot with keyed lookups.
//!
//! The configuration is a TOML file made of a `[main]` table holding global
//! tool paths and the job list, a `[defaults]` table with shared tool options
//! and one table per job. Values are addressed by dotted keys such as
//! `main.rsync` or `www.destination`.
//!
//! Built-in defaults (see [`DEFAULT_CONFIG`]) are merged below the values
//! read from the file, so tool binaries and option strings always resolve.

use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use log::LevelFilter;
use toml::{Table, Value};

/// Name used to discover the configuration and lock files.
pub const TOOL_NAME: &str = "backup-runner";

/// Values used whenever the configuration file omits them.
pub const DEFAULT_CONFIG: &str = r#"
[main]
jobs = []
loglevel = "info"
shell = "/bin/bash"
tmpdir = "/tmp"
rsync = "rsync"
tar = "tar"
gzip = "gzip"
mysqldump = "mysqldump"
mysql = "mysql"
svnadmin = "svnadmin"
slapcat = "slapcat"
kdb5_util = "kdb5_util"

[defaults]
rsync_opts = "-a --delete"
tar_opts = "-cpf"
gzip_opts = "-c"
mysqldump_opts = "--opt --single-transaction"
svnadmin_opts = "--quiet"
slapcat_opts = ""
kdb5_util_opts = ""
dirmode = "0755"
"#;

#[derive(Debug, Display, Error, From)]
/// Errors on reading or querying the configuration.
pub enum ConfigError {
    /// The configuration file can't be read.
    #[display("Reading config file {} failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    /// The configuration file isn't valid TOML.
    #[display("Parsing config file failed: {_0}")]
    #[from]
    Parse(toml::de::Error),
    /// Neither an explicit nor a default configuration file exists.
    #[display("No config file found (tried {})", _0.join(", "))]
    NotFound(#[error(ignore)] Vec<String>),
    /// A required key is absent.
    #[display("Missing required config value: {_0}")]
    MissingKey(#[error(ignore)] String),
    /// A key holds a value of the wrong shape.
    #[display("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Read-only view of the configuration file, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    table: Table,
}

impl Default for Config {
    fn default() -> Self {
        // DEFAULT_CONFIG is a constant and always parses
        let table = toml::from_str(DEFAULT_CONFIG).unwrap_or_default();
        Self { table }
    }
}

impl Config {
    /// Candidate configuration files, in lookup order.
    pub fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
        match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => vec![
                PathBuf::from(format!("/etc/{TOOL_NAME}.conf")),
                PathBuf::from(format!("{TOOL_NAME}.conf")),
            ],
        }
    }

    /// Locate and load the configuration file.
    ///
    /// An explicit path has to exist, otherwise `/etc/backup-runner.conf`
    /// and `./backup-runner.conf` are tried in that order.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = Self::candidates(explicit);

        if let Some(path) = explicit {
            return Self::load(path);
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound(
                candidates
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            )),
        }
    }

    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(target: "config", "Loaded config from {}", path.display());

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string and merge the built-in defaults below it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut table: Table = toml::from_str(content)?;
        let defaults = Self::default().table;

        for (section, values) in defaults {
            let Value::Table(values) = values else {
                continue;
            };
            let entry = table
                .entry(section.clone())
                .or_insert_with(|| Value::Table(Table::new()));
            let Value::Table(existing) = entry else {
                return Err(ConfigError::InvalidValue {
                    key: section,
                    value: entry.to_string(),
                });
            };
            for (key, value) in values {
                existing.entry(key).or_insert(value);
            }
        }

        Ok(Self { table })
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let (section, name) = key.split_once('.')?;
        self.table.get(section)?.as_table()?.get(name)
    }

    /// Scalar value of `key` rendered as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).and_then(scalar)
    }

    /// Value of `key`, or of `fallback_key` when `key` is absent.
    pub fn get_or(&self, key: &str, fallback_key: &str) -> Option<String> {
        self.get(key).or_else(|| self.get(fallback_key))
    }

    /// Value of `key`, failing if absent.
    pub fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Value of `key` or `fallback_key`, failing if both are absent.
    pub fn get_required_or(&self, key: &str, fallback_key: &str) -> Result<String, ConfigError> {
        self.get_or(key, fallback_key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// List value of `key`. A scalar yields a single element list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.lookup(key) {
            Some(Value::Array(values)) => values.iter().filter_map(scalar).collect(),
            Some(value) => scalar(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Deserialize the value of `key` into `T`.
    pub fn get_as<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ConfigError> {
        self.lookup(key)
            .cloned()
            .map(|value| value.try_into())
            .transpose()
            .map_err(ConfigError::Parse)
    }

    /// Boolean value of `key`, `default` if absent.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.lookup(key) else {
            return Ok(default);
        };

        if let Value::Boolean(b) = value {
            return Ok(*b);
        }

        let text = scalar(value).unwrap_or_default();
        match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Ok(true),
            "no" | "false" | "off" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: text,
            }),
        }
    }
}

// well known global settings
impl Config {
    /// Jobs to run when none are given on the command line.
    pub fn jobs(&self) -> Vec<String> {
        self.get_list("main.jobs")
    }

    /// Shell used to run the generated pipelines.
    pub fn shell(&self) -> String {
        self.get("main.shell").unwrap_or_else(|| "/bin/bash".into())
    }

    /// Location of the advisory lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.get("main.lockfile")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{TOOL_NAME}.lock")))
    }

    /// Configured log level, `None` if unset.
    pub fn log_level(&self) -> Result<Option<LevelFilter>, ConfigError> {
        let Some(level) = self.get("main.loglevel") else {
            return Ok(None);
        };

        level
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: "main.loglevel".into(),
                value: level,
            })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[main]
jobs = ["www", "db"]
rsync = "/opt/bin/rsync"

[defaults]
rsync_opts = "-aH"

[www]
type = "sync"
source = "/var/www"
stop_on_error = "yes"
retries = 3

[db]
type = "database"
databases = ["a", "b"]
create_destination = false
"#;

    #[test]
    fn file_values_override_builtin_defaults() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.get("main.rsync").as_deref(), Some("/opt/bin/rsync"));
        assert_eq!(config.get("defaults.rsync_opts").as_deref(), Some("-aH"));
        assert_eq!(config.get("main.tar").as_deref(), Some("tar"));
        assert_eq!(config.get("defaults.gzip_opts").as_deref(), Some("-c"));
    }

    #[test]
    fn get_or_prefers_job_value() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(
            config.get_or("www.rsync", "main.rsync").as_deref(),
            Some("/opt/bin/rsync")
        );
        assert_eq!(
            config.get_or("www.type", "main.rsync").as_deref(),
            Some("sync")
        );
        assert_eq!(config.get_or("www.nope", "main.nope"), None);
    }

    #[test]
    fn required_value_missing() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert!(matches!(
            config.get_required("www.destination"),
            Err(ConfigError::MissingKey(key)) if key == "www.destination"
        ));
        assert_eq!(config.get_required("www.retries").unwrap(), "3");
    }

    #[test]
    fn lists_from_scalars_and_arrays() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.jobs(), vec!["www", "db"]);
        assert_eq!(config.get_list("www.source"), vec!["/var/www"]);
        assert_eq!(config.get_list("db.databases"), vec!["a", "b"]);
        assert!(config.get_list("db.realms").is_empty());
    }

    #[test]
    fn booleans() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert!(config.get_bool("www.stop_on_error", false).unwrap());
        assert!(!config.get_bool("db.create_destination", true).unwrap());
        assert!(config.get_bool("db.missing", true).unwrap());
        assert!(matches!(
            config.get_bool("www.type", false),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn log_levels() {
        let config = Config::from_toml("[main]\nloglevel = \"DEBUG\"").unwrap();
        assert_eq!(config.log_level().unwrap(), Some(LevelFilter::Debug));

        let config = Config::from_toml("[main]\nloglevel = \"loud\"").unwrap();
        assert!(matches!(
            config.log_level(),
            Err(ConfigError::InvalidValue { key, value }) if key == "main.loglevel" && value == "loud"
        ));
    }

    #[test]
    fn non_table_section_is_rejected() {
        let err = Config::from_toml("main = 1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "main"));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let err = Config::locate(Some(Path::new("/nonexistent/backup-runner.conf"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
