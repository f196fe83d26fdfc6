//! External transformation step run after loading.

use std::path::PathBuf;
use std::process::Command;

use tracing::{info, warn};

use crate::error::{LoadError, LoadResult};

/// Captured output of a transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Something that transforms the loaded tables.
pub trait TransformRunner {
    fn run(&self) -> LoadResult<TransformOutput>;
}

/// Runs an external program and waits for it.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Build a runner from a program followed by its arguments.
    ///
    /// Returns `None` for an empty command line.
    pub fn from_command_line<I, S>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = parts.into_iter().map(Into::into);
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TransformRunner for CommandRunner {
    fn run(&self) -> LoadResult<TransformOutput> {
        let command_line = self.command_line();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        info!(command = %command_line, "running transform");
        let output = cmd.output().map_err(|e| LoadError::Transform {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        let out = TransformOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(LoadError::Transform {
                command: command_line,
                message: format!("{}: {}", output.status, out.stderr.trim()),
            });
        }

        if !out.stderr.trim().is_empty() {
            warn!(command = %command_line, stderr = %out.stderr.trim(), "transform wrote to stderr");
        }
        info!(command = %command_line, stdout = %out.stdout.trim(), "transform finished");
        Ok(out)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::{CommandRunner, TransformRunner};
    use crate::error::LoadErrorKind;

    #[test]
    fn captures_stdout_of_successful_command() {
        let runner = CommandRunner::from_command_line(["sh", "-c", "echo transformed"]).unwrap();
        let out = runner.run().unwrap();
        assert_eq!(out.stdout.trim(), "transformed");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let runner = CommandRunner::new("sh").args(["-c", "echo bad >&2; exit 3"]);
        let err = runner.run().unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Transform);
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn runs_in_the_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new("pwd").current_dir(dir.path());
        let out = runner.run().unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn empty_command_line_builds_nothing() {
        assert!(CommandRunner::from_command_line(Vec::<String>::new()).is_none());
    }
}
