//! Implements compressed dumps of MySQL/MariaDB databases using [MySql].

use std::process::Command;

use super::{Compressor, Generate, GenerateError, JobContext};
use crate::util::shell::{CommandLine, Pipeline};

/// Setting value disabling a connection option or selecting every database.
const NONE: &str = "none";
const ALL: &str = "all";

/// Databases never dumped when every database is selected.
const DEFAULT_EXCLUDE: [&str; 2] = ["information_schema", "performance_schema"];

/// Dumps each selected database into its own compressed file.
///
/// The file of database `db` is the job's destination with `db-` prepended
/// to the file name, e.g. `/backup/blog-dump.sql.gz` for `/backup/dump.sql.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySql {
    dump: String,
    client: String,
    options: String,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    databases: Vec<String>,
    exclude: Vec<String>,
    compressor: Compressor,
}

impl MySql {
    fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(user) = &self.user {
            args.push(format!("--user={user}"));
        }
        if let Some(password) = &self.password {
            args.push(format!("--password={password}"));
        }
        if let Some(host) = &self.host {
            args.push(format!("--host={host}"));
        }
        args
    }

    /// Databases to dump, asking the server if every database is selected.
    fn databases(&self) -> Result<Vec<String>, GenerateError> {
        if !self.databases.iter().any(|db| db == ALL) {
            return Ok(self.databases.clone());
        }

        let mut command = Command::new(&self.client);
        command
            .args(self.connection_args())
            .arg("--batch")
            .arg("--skip-column-names")
            .arg("--execute")
            .arg("SHOW DATABASES");
        log::debug!(target: "backend::mysql", "Listing databases using {}", self.client);

        let output = command
            .output()
            .map_err(|e| GenerateError::DatabaseDiscovery(format!("{}: {e}", self.client)))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(GenerateError::DatabaseDiscovery(format!(
                "{} exited with {}: {}",
                self.client,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.is_empty() {
            log::warn!(target: "backend::mysql", "{}", stderr.trim_end());
        }

        let databases: Vec<_> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|db| !db.is_empty() && !self.exclude.iter().any(|ex| ex == *db))
            .map(String::from)
            .collect();
        log::trace!(target: "backend::mysql", "Found databases: {}", databases.join(", "));

        Ok(databases)
    }
}

impl Generate for MySql {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        let enabled = |key: &str| ctx.setting(key).filter(|value| value != NONE);

        let mut databases = ctx.list("databases");
        if databases.is_empty() {
            databases.push(ALL.to_string());
        }

        let exclude = match ctx.setting("exclude") {
            Some(_) => ctx.list("exclude"),
            None => DEFAULT_EXCLUDE.iter().map(|db| db.to_string()).collect(),
        };

        Ok(Self {
            dump: ctx.tool("mysqldump")?,
            client: ctx.tool("mysql")?,
            options: ctx.tool_options("mysqldump"),
            user: enabled("user"),
            password: enabled("password"),
            host: enabled("host"),
            databases,
            exclude,
            compressor: Compressor::from_context(ctx)?,
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        let databases = self.databases()?;
        if databases.is_empty() {
            log::warn!(target: "backend::mysql", "Job {} selects no databases", ctx.job.name);
        }

        databases
            .iter()
            .map(|db| -> Result<String, GenerateError> {
                let dest = ctx.prefixed_destination(db);
                let dump = CommandLine::new(&self.dump)
                    .options(&self.options)?
                    .args(self.connection_args())
                    .arg(db);
                let compress = self.compressor.stage(ctx, &dest)?;

                Ok(Pipeline::new(dump).pipe(compress).render()?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use crate::backends::tests::{fixed_now, setup};

    #[test]
    fn one_pipeline_per_database_in_order() {
        let (config, job) = setup(
            r#"
[db]
type = "database"
destination = "/b/%Y/backup.sql.gz"
databases = ["a", "b"]
user = "backup"
password = "s3cret"
"#,
            "db",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let commands = MySql::from_context(&ctx).unwrap().generate(&ctx).unwrap();

        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("mysqldump --opt --single-transaction "));
        assert!(commands[0].contains(" a | gzip -c > /b/2024/a-backup.sql.gz"));
        assert!(commands[1].contains(" b | gzip -c > /b/2024/b-backup.sql.gz"));
        assert!(commands.iter().all(|c| c.contains("backup") && c.contains("s3cret")));
    }

    #[test]
    fn none_disables_credentials() {
        let (config, job) = setup(
            r#"
[db]
type = "database"
destination = "/b/backup.sql.gz"
databases = "wiki"
user = "none"
password = "none"
"#,
            "db",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let commands = MySql::from_context(&ctx).unwrap().generate(&ctx).unwrap();

        assert_eq!(
            commands,
            vec![
                "mysqldump --opt --single-transaction wiki | gzip -c > /b/wiki-backup.sql.gz"
                    .to_string()
            ]
        );
        assert!(!commands[0].contains("--user"));
        assert!(!commands[0].contains("--password"));
    }

    #[test]
    fn failing_discovery_is_an_error() {
        let (config, job) = setup(
            r#"
[db]
type = "database"
destination = "/b/backup.sql.gz"
databases = "all"
mysql = "false"
"#,
            "db",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let err = MySql::from_context(&ctx).unwrap().generate(&ctx).unwrap_err();
        assert!(matches!(err, GenerateError::DatabaseDiscovery(_)));
    }

    #[test]
    fn discovery_skips_excluded_databases() {
        let root = tempfile::tempdir().unwrap();
        let client = root.path().join("fake-mysql");
        std::fs::write(
            &client,
            "#!/bin/sh\nprintf 'information_schema\\nshop\\nperformance_schema\\nwiki\\n'\n",
        )
        .unwrap();
        std::fs::set_permissions(&client, std::fs::Permissions::from_mode(0o755)).unwrap();

        let toml = format!(
            "[db]\ntype = \"mysql\"\ndestination = \"/b/d.sql.gz\"\nmysql = \"{}\"\n",
            client.display()
        );
        let (config, job) = setup(&toml, "db");
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let commands = MySql::from_context(&ctx).unwrap().generate(&ctx).unwrap();

        assert_eq!(commands.len(), 2);
        assert!(commands[0].ends_with("shop | gzip -c > /b/shop-d.sql.gz"));
        assert!(commands[1].ends_with("wiki | gzip -c > /b/wiki-d.sql.gz"));
    }
}
