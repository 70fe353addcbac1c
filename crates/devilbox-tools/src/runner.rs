//! External command execution.
//!
//! Tools never build shell strings for the host. Each command is an argv
//! vector; the only shell involved is the one inside a container for
//! `devilbox_exec`.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ToolError, ToolResult};

/// A program plus arguments, optionally run from a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
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
        self.cwd = Some(dir.into());
        self
    }

    /// Program and arguments as one vector, for comparisons in tests and logs.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Stdout, or stderr when stdout is empty. Compose writes progress to stderr.
    pub fn text(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Runs external commands on behalf of tools.
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is an error carrying stderr.
    fn run(&self, command: &CommandLine) -> impl Future<Output = ToolResult<CommandOutput>> + Send;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> ToolResult<CommandOutput> {
        debug!(command = %command, "running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| ToolError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            debug!(command = %command, status = %output.status, "command failed");
            return Err(ToolError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_spaced_args() {
        let cmd = CommandLine::new("docker")
            .args(["exec", "devilbox-php-1", "sh", "-c"])
            .arg("php -v");
        assert_eq!(cmd.to_string(), r#"docker exec devilbox-php-1 sh -c "php -v""#);
        assert_eq!(cmd.argv(), ["docker", "exec", "devilbox-php-1", "sh", "-c", "php -v"]);
    }

    #[test]
    fn text_falls_back_to_stderr() {
        let out = CommandOutput {
            stdout: "\n".into(),
            stderr: "Container devilbox-php-1 Started".into(),
        };
        assert_eq!(out.text(), "Container devilbox-php-1 Started");
        assert_eq!(CommandOutput::stdout("up").text(), "up");
    }

    #[tokio::test]
    async fn system_runner_captures_stdout() {
        let out = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn system_runner_reports_nonzero_exit() {
        let err = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            ToolError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run(&CommandLine::new("devilbox-no-such-program"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn system_runner_honours_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let out = SystemRunner
            .run(&CommandLine::new("pwd").current_dir(dir.path()))
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(out.stdout.trim()).canonicalize().unwrap(), expected);
    }
}
