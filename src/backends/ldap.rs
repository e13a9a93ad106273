//! Implements compressed exports of a directory server using [Ldap].

use std::path::PathBuf;

use super::{Compressor, Generate, GenerateError, JobContext};
use crate::util::shell::{quote, CommandLine, Pipeline};

/// Exports a directory server with `slapcat` into a temporary LDIF file,
/// compresses it into the destination and removes the temporary file.
///
/// The three steps form one shell command, whose status is the status of
/// the export and compression. The temporary file is removed in any case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ldap {
    bin: String,
    options: String,
    tmp_file: PathBuf,
    compressor: Compressor,
}

impl Generate for Ldap {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        let tmp_dir = ctx
            .config
            .get_required_or(&ctx.job.key("tmpdir"), "main.tmpdir")?;
        let tmp_file =
            PathBuf::from(tmp_dir).join(format!("{}-{}.ldif", ctx.job.name, std::process::id()));

        Ok(Self {
            bin: ctx.tool("slapcat")?,
            options: ctx.tool_options("slapcat"),
            tmp_file,
            compressor: Compressor::from_context(ctx)?,
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        let export = CommandLine::new(&self.bin)
            .options(&self.options)?
            .arg("-l")
            .path(&self.tmp_file)
            .render()?;
        let compress = Pipeline::new(CommandLine::new("cat").path(&self.tmp_file))
            .pipe(self.compressor.stage(ctx, &ctx.destination)?)
            .render()?;
        let tmp_file = quote(&self.tmp_file.display().to_string())?;

        Ok(vec![format!(
            "{export} && {compress}; rc=$?; rm -f {tmp_file}; test $rc -eq 0"
        )])
    }
}
