//! Trailing compression stage shared by the dump backends.

use std::path::Path;

use super::{GenerateError, JobContext};
use crate::util::shell::CommandLine;

/// Compression tool writing its standard input compressed into a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressor {
    bin: String,
    options: String,
}

impl Compressor {
    /// Resolve the compression tool of the job, `gzip` unless overridden.
    pub fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        Ok(Self {
            bin: ctx.tool("gzip")?,
            options: ctx.tool_options("gzip"),
        })
    }

    /// The stage `<bin> <options> > <dest>`.
    ///
    /// The parent directory of `dest` is created if the job creates its destinations.
    pub fn stage(&self, ctx: &JobContext<'_>, dest: &Path) -> Result<CommandLine, GenerateError> {
        ctx.ensure_parent(dest)?;

        Ok(CommandLine::new(&self.bin)
            .options(&self.options)?
            .stdout_to(dest))
    }
}
