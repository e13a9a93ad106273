//! Building shell command lines from untrusted words.
//!
//! Every word is quoted on rendering, so configuration values can't inject
//! additional shell syntax into a generated pipeline.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use derive_more::{Display, Error};
use regex::Regex;

/// A `--password=` word up to its end, including quoted chunks the quoting
/// may have split it into.
static PASSWORD_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:'--password=[^']*'|"--password=(?:[^"\\]|\\.)*"|--password=)(?:'[^']*'|"(?:[^"\\]|\\.)*"|[^\s'"|;&<>()])*"#,
    )
    .unwrap()
});

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
/// Errors while assembling a command line.
pub enum ShellError {
    /// An option string isn't made of valid shell words.
    #[display("Unparsable option string: {_0}")]
    InvalidOptions(#[error(ignore)] String),
    /// A word contains a NUL byte and can't be passed through a shell.
    #[display("Argument can't be quoted for the shell: {_0:?}")]
    Unquotable(#[error(ignore)] String),
}

/// Quote a single word for the shell.
pub fn quote(word: &str) -> Result<String, ShellError> {
    shlex::try_quote(word)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| ShellError::Unquotable(word.to_string()))
}

/// Mask passwords in a rendered command line before it is logged.
pub fn redact(command: &str) -> Cow<'_, str> {
    PASSWORD_WORD.replace_all(command, "--password=***")
}

/// A single command with its arguments and an optional stdout redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    words: Vec<String>,
    stdout: Option<String>,
}

impl CommandLine {
    /// Start a command line invoking `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            words: vec![program.into()],
            stdout: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.words.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an option string, split into words like a shell would.
    pub fn options(self, options: &str) -> Result<Self, ShellError> {
        let words =
            shlex::split(options).ok_or_else(|| ShellError::InvalidOptions(options.to_string()))?;
        Ok(self.args(words))
    }

    /// Redirect standard output into `path`.
    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout = Some(path.display().to_string());
        self
    }

    /// Render the quoted command line.
    pub fn render(&self) -> Result<String, ShellError> {
        let mut line = self
            .words
            .iter()
            .map(|word| quote(word))
            .collect::<Result<Vec<_>, _>>()?
            .join(" ");

        if let Some(stdout) = &self.stdout {
            let _ = write!(line, " > {}", quote(stdout)?);
        }

        Ok(line)
    }
}

/// Commands connected by pipes, run as one shell invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<CommandLine>,
}

impl Pipeline {
    /// Start a pipeline with its first stage.
    pub fn new(first: CommandLine) -> Self {
        Self {
            stages: vec![first],
        }
    }

    /// Pipe the output of the previous stage into `stage`.
    pub fn pipe(mut self, stage: CommandLine) -> Self {
        self.stages.push(stage);
        self
    }

    /// Render all stages joined by `|`.
    pub fn render(&self) -> Result<String, ShellError> {
        Ok(self
            .stages
            .iter()
            .map(CommandLine::render)
            .collect::<Result<Vec<_>, _>>()?
            .join(" | "))
    }
}

impl From<CommandLine> for Pipeline {
    fn from(command: CommandLine) -> Self {
        Self::new(command)
    }
}
