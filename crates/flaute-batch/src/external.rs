//! The external gridded-dataset tool, run as a subprocess with a timeout.
//!
//! A timeout is an outcome, not an error: [`ExternalTool::run`] returns
//! [`ToolOutcome::TimedOut`] and the caller decides what a missing output
//! means via [`expect_output`].

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use flaute_core::FlauteError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One invocation of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Completed { success: bool, code: Option<i32> },
    TimedOut,
}

pub trait ExternalTool: Send + Sync {
    fn run(&self, command: &ToolCommand, timeout: Duration) -> Result<ToolOutcome>;
}

/// Spawns the program and polls it until it exits or the timeout passes.
#[derive(Debug, Clone)]
pub struct CommandTool {
    poll_interval: Duration,
}

impl CommandTool {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Default for CommandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalTool for CommandTool {
    fn run(&self, command: &ToolCommand, timeout: Duration) -> Result<ToolOutcome> {
        debug!(%command, "running external tool");
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawning '{}'", command.program))?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().context("polling external tool")? {
                return Ok(ToolOutcome::Completed {
                    success: status.success(),
                    code: status.code(),
                });
            }
            if start.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                warn!(%command, timeout_s = timeout.as_secs(), "external tool timed out");
                return Ok(ToolOutcome::TimedOut);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

/// Turn a tool outcome into "the output exists" or a typed error.
///
/// A timed-out call may leave a truncated file behind, so the output is
/// removed in that case.
pub fn expect_output(
    outcome: ToolOutcome,
    command: &ToolCommand,
    timeout: Duration,
    output: &Path,
) -> Result<()> {
    match outcome {
        ToolOutcome::TimedOut => {
            if output.exists() {
                let _ = std::fs::remove_file(output);
            }
            Err(FlauteError::ToolTimeout {
                command: command.to_string(),
                minutes: timeout.as_secs() / 60,
            }
            .into())
        }
        ToolOutcome::Completed { success: false, code } => Err(FlauteError::TaskFailure(format!(
            "'{command}' exited with {}",
            code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
        ))
        .into()),
        ToolOutcome::Completed { success: true, .. } if !output.exists() => {
            Err(FlauteError::TaskFailure(format!(
                "'{command}' produced no '{}'",
                output.display()
            ))
            .into())
        }
        ToolOutcome::Completed { .. } => Ok(()),
    }
}

/// A tool-produced file recorded per slice, e.g. the time mean.
///
/// `args` may contain `{input}` and `{output}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub name: String,
    pub args: Vec<String>,
}

impl ProductSpec {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn command(&self, program: &str, input: &Path, output: &Path) -> ToolCommand {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args.iter().fold(ToolCommand::new(program), |cmd, arg| {
            cmd.arg(arg.replace("{input}", &input).replace("{output}", &output))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flaute_core::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn product_command_fills_placeholders() {
        let spec = ProductSpec::new("timmean", &["-s", "-timmean", "{input}", "{output}"]);
        let cmd = spec.command("cdo", Path::new("/tmp/in.csv"), Path::new("/out/x.csv"));
        assert_eq!(cmd.to_string(), "cdo -s -timmean /tmp/in.csv /out/x.csv");
    }

    #[test]
    fn timeout_is_typed_and_clears_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("partial.csv");
        std::fs::write(&output, "half").unwrap();
        let cmd = ToolCommand::new("cdo").arg("-timmean");
        let err = expect_output(ToolOutcome::TimedOut, &cmd, Duration::from_secs(120), &output)
            .unwrap_err();
        assert_eq!(FlauteError::classify(&err), ErrorKind::ToolTimeout);
        assert!(!output.exists());
    }

    #[test]
    fn missing_output_after_success_fails_task() {
        let cmd = ToolCommand::new("cdo");
        let err = expect_output(
            ToolOutcome::Completed {
                success: true,
                code: Some(0),
            },
            &cmd,
            Duration::from_secs(60),
            &PathBuf::from("/nonexistent/out.csv"),
        )
        .unwrap_err();
        assert_eq!(FlauteError::classify(&err), ErrorKind::TaskFailure);
    }

    #[cfg(unix)]
    #[test]
    fn command_tool_times_out_long_running_process() {
        let tool = CommandTool::new();
        let outcome = tool
            .run(&ToolCommand::new("sleep").arg("5"), Duration::from_millis(200))
            .unwrap();
        assert_eq!(outcome, ToolOutcome::TimedOut);

        let outcome = tool
            .run(&ToolCommand::new("true"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            outcome,
            ToolOutcome::Completed {
                success: true,
                code: Some(0)
            }
        );
    }
}
