//! PowerShell host integration
//!
//! This module provides:
//! - Execution of PowerShell scripts through a `pwsh` child process
//! - Argument quoting for scripts assembled from user data

use crate::manifest::quote;
use std::ffi::OsString;
use tokio::process::Command;
use tracing::debug;

/// Default PowerShell executable
pub const DEFAULT_PROGRAM: &str = "pwsh";

/// Output of one PowerShell invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The script that was executed
    pub command: String,
    /// Whether the process exited successfully
    pub success: bool,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Most useful failure text: stderr, falling back to stdout
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs scripts in a non-interactive `pwsh` process
#[derive(Debug, Clone)]
pub struct PwshRunner {
    program: String,
}

impl Default for PwshRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PwshRunner {
    /// Create a runner using `pwsh` from PATH
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Use a different PowerShell executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `script`, passing `env` to the child process
    pub async fn run(
        &self,
        script: &str,
        env: &[(&str, OsString)],
    ) -> std::io::Result<CommandOutput> {
        debug!(program = %self.program, script, "running PowerShell");
        let output = Command::new(&self.program)
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .envs(env.iter().map(|(k, v)| (*k, v)))
            .output()
            .await?;

        Ok(CommandOutput {
            command: script.to_string(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Quote a value as a PowerShell single-quoted string literal
pub fn quote_arg(value: &str) -> String {
    quote(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("Az.Accounts"), "'Az.Accounts'");
        assert_eq!(quote_arg("O'Brien; rm -rf /"), "'O''Brien; rm -rf /'");
    }

    #[test]
    fn test_runner_program() {
        assert_eq!(PwshRunner::new().program(), "pwsh");
        assert_eq!(PwshRunner::new().with_program("powershell").program(), "powershell");
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let output = CommandOutput {
            command: "x".to_string(),
            success: false,
            stdout: "out\n".to_string(),
            stderr: " err \n".to_string(),
        };
        assert_eq!(output.failure_message(), "err");

        let output = CommandOutput {
            stderr: String::new(),
            ..output
        };
        assert_eq!(output.failure_message(), "out");
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let runner = PwshRunner::new().with_program("shipmod-no-such-program");
        assert!(runner.run("exit 0", &[]).await.is_err());
    }
}
