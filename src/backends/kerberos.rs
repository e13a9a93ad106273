//! Implements compressed dumps of Kerberos realms using [Kerberos].

use super::{Compressor, Generate, GenerateError, JobContext};
use crate::config::ConfigError;
use crate::util::shell::{CommandLine, Pipeline};

/// Dumps the KDC database of each configured realm with `kdb5_util dump`.
///
/// Like [MySql](super::MySql) every realm gets its own file, named by
/// prepending `realm-` to the destination's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kerberos {
    bin: String,
    options: String,
    realms: Vec<String>,
    compressor: Compressor,
}

impl Generate for Kerberos {
    fn from_context(ctx: &JobContext<'_>) -> Result<Self, GenerateError> {
        let realms = ctx.list("realms");
        if realms.is_empty() {
            return Err(ConfigError::MissingKey(ctx.job.key("realms")).into());
        }

        Ok(Self {
            bin: ctx.tool("kdb5_util")?,
            options: ctx.tool_options("kdb5_util"),
            realms,
            compressor: Compressor::from_context(ctx)?,
        })
    }

    fn generate(&self, ctx: &JobContext<'_>) -> Result<Vec<String>, GenerateError> {
        self.realms
            .iter()
            .map(|realm| -> Result<String, GenerateError> {
                let dump = CommandLine::new(&self.bin)
                    .arg("-r")
                    .arg(realm)
                    .arg("dump")
                    .options(&self.options)?;
                let compress = self
                    .compressor
                    .stage(ctx, &ctx.prefixed_destination(realm))?;

                Ok(Pipeline::new(dump).pipe(compress).render()?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::{fixed_now, setup};

    #[test]
    fn one_pipeline_per_realm() {
        let (config, job) = setup(
            r#"
[kdc]
type = "kerberos"
destination = "/b/kdc/%Y%m%d.dump.gz"
realms = ["EXAMPLE.ORG", "LAB.EXAMPLE.ORG"]
"#,
            "kdc",
        );
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        let commands = Kerberos::from_context(&ctx).unwrap().generate(&ctx).unwrap();

        assert_eq!(
            commands,
            vec![
                "kdb5_util -r EXAMPLE.ORG dump | gzip -c > /b/kdc/EXAMPLE.ORG-20240309.dump.gz"
                    .to_string(),
                "kdb5_util -r LAB.EXAMPLE.ORG dump | gzip -c > /b/kdc/LAB.EXAMPLE.ORG-20240309.dump.gz"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn realms_are_required() {
        let (config, job) = setup("[kdc]\ntype = \"realm\"\ndestination = \"/b/k.gz\"\n", "kdc");
        let ctx = JobContext::new(&job, &config, fixed_now(), true);

        assert!(matches!(
            Kerberos::from_context(&ctx),
            Err(GenerateError::Config(ConfigError::MissingKey(_)))
        ));
    }
}
