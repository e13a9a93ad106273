//! Implements synchronisation of files using [Rsync].

use super::{Generate, GenerateError, JobContext};
use crate::util::expand::expand_paths;
use crate::util::shell::CommandLine;

/// [rsync](https://rsync.samba.org/): copies the job's sources into its destination.
///
/// Produces `<rsync> <options> <sources> <destination>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsync {
    bin: String,
    options: String,
    sources: Vec<String>,
}

impl Generate for Rsync {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        Ok(Self {
            bin: ctx.tool("rsync")?,
            options: ctx.tool_options("rsync"),
            sources: ctx.list("source"),
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        // rsync copies into the destination, so it has to exist itself
        ctx.ensure_dir(&ctx.destination)?;

        let sources = expand_paths(&self.sources, &ctx.now);
        if sources.is_empty() {
            log::warn!(target: "backend::rsync", "Job {} has no sources", ctx.job.name);
        }

        let command = CommandLine::new(&self.bin)
            .options(&self.options)?
            .args(sources)
            .path(&ctx.destination);

        Ok(vec![command.render()?])
    }
}
