//! Implements compressed dumps of a repository using [Subversion].

use std::path::PathBuf;

use super::{Compressor, Generate, GenerateError, JobContext};
use crate::util::shell::{CommandLine, Pipeline};

/// Dumps a Subversion repository with `svnadmin dump` into a compressed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subversion {
    bin: String,
    options: String,
    repository: PathBuf,
    compressor: Compressor,
}

impl Generate for Subversion {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        Ok(Self {
            bin: ctx.tool("svnadmin")?,
            options: ctx.tool_options("svnadmin"),
            repository: ctx.required("repository")?.into(),
            compressor: Compressor::from_context(ctx)?,
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        let dump = CommandLine::new(&self.bin)
            .arg("dump")
            .options(&self.options)?
            .path(&self.repository);
        let compress = self.compressor.stage(ctx, &ctx.destination)?;

        Ok(vec![Pipeline::new(dump).pipe(compress).render()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::{fixed_now, setup};
    use crate::config::ConfigError;

    #[test]
    fn dump_piped_into_compression() {
        let (config, job) = setup(
            r#"
[svn]
type = "svn"
repository = "/srv/svn/main"
destination = "/b/svn/main-%Y%m%d.dump.gz"
"#,
            "svn",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let commands = Subversion::from_context(&ctx).unwrap().generate(&ctx).unwrap();

        assert_eq!(
            commands,
            vec![
                "svnadmin dump --quiet /srv/svn/main | gzip -c > /b/svn/main-20240309.dump.gz"
                    .to_string()
            ]
        );
    }

    #[test]
    fn repository_is_required() {
        let (config, job) = setup("[svn]\ntype = \"svn\"\ndestination = \"/b/x.gz\"\n", "svn");
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let err = Subversion::from_context(&ctx).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Config(ConfigError::MissingKey(key)) if key == "svn.repository"
        ));
    }
}
