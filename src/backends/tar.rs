//! Implements archiving of files using [Tar].

use super::{Generate, GenerateError, JobContext};
use crate::util::expand::expand_paths;
use crate::util::shell::CommandLine;

/// [tar](https://www.gnu.org/software/tar/): packs the job's sources into an archive.
///
/// Produces `<tar> <options> <destination> <sources>`, so the options have to
/// end with the flag taking the archive name (e.g. `-czf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tar {
    bin: String,
    options: String,
    sources: Vec<String>,
}

impl Generate for Tar {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        Ok(Self {
            bin: ctx.tool("tar")?,
            options: ctx.tool_options("tar"),
            sources: ctx.list("source"),
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        ctx.ensure_parent(&ctx.destination)?;

        let sources = expand_paths(&self.sources, &ctx.now);
        if sources.is_empty() {
            log::warn!(target: "backend::tar", "Job {} has no sources", ctx.job.name);
        }

        let command = CommandLine::new(&self.bin)
            .options(&self.options)?
            .path(&ctx.destination)
            .args(sources);

        Ok(vec![command.render()?])
    }
}
