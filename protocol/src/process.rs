//! # External Process Runner
//!
//! Every interaction with the ledger goes through one external executable.
//! [`CommandRunner`] is the seam: production uses [`ProcessRunner`], tests
//! substitute a scripted runner that never spawns anything.
//!
//! Arguments always travel as discrete argv entries. Nothing is ever joined
//! into a string and handed to a shell, so addresses, paths and asset units
//! containing spaces or quotes reach the tool exactly as written.
//!
//! A runner never returns an error. Launch failures, non-zero exits and I/O
//! faults all come back as a failed [`CommandOutcome`] with whatever text
//! explains them.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Result of one external invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `true` iff the process exited with status zero.
    pub succeeded: bool,
    /// Trimmed stdout on success; trimmed stderr (or the launch error) on failure.
    pub output: String,
    /// Exit code, when the process ran to completion and reported one.
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            exit_code: Some(0),
        }
    }

    pub fn failure(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
            exit_code,
        }
    }
}

/// Invokes external executables.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit.
    async fn run(&self, program: &str, args: &[String]) -> CommandOutcome;
}

/// Spawns real child processes via `tokio::process`.
///
/// No timeout is applied; the caller waits for the child to exit.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutcome {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                CommandOutcome::success(String::from_utf8_lossy(&out.stdout).trim())
            }
            Ok(out) => CommandOutcome::failure(
                out.status.code(),
                String::from_utf8_lossy(&out.stderr).trim(),
            ),
            Err(e) => CommandOutcome::failure(None, format!("failed to launch {program}: {e}")),
        }
    }
}

/// Human-readable rendering of an invocation, for diagnostics only.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_returns_trimmed_stdout() {
        let out = ProcessRunner
            .run("sh", &args(&["-c", "printf '  hello ledger \\n'"]))
            .await;
        assert!(out.succeeded);
        assert_eq!(out.output, "hello ledger");
        assert_eq!(out.exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_returns_trimmed_stderr_and_code() {
        let out = ProcessRunner
            .run("sh", &args(&["-c", "echo ignored; echo ' bad input ' >&2; exit 3"]))
            .await;
        assert!(!out.succeeded);
        assert_eq!(out.output, "bad input");
        assert_eq!(out.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn arguments_are_not_shell_interpreted() {
        // A single argv entry containing shell metacharacters must arrive intact.
        let payload = "addr_test1qz+2000000; rm -rf /tmp/x $(whoami)";
        let out = ProcessRunner
            .run("printf", &args(&["%s", payload]))
            .await;
        assert!(out.succeeded);
        assert_eq!(out.output, payload);
    }

    #[tokio::test]
    async fn missing_executable_is_a_failed_outcome() {
        let out = ProcessRunner
            .run("ayllu-definitely-not-installed", &args(&["--version"]))
            .await;
        assert!(!out.succeeded);
        assert_eq!(out.exit_code, None);
        assert!(out.output.contains("failed to launch"));
    }

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let line = render_command("cardano-cli", &args(&["--tx-out", "addr+1+5 abc.def"]));
        assert_eq!(line, "cardano-cli --tx-out 'addr+1+5 abc.def'");
    }
}
