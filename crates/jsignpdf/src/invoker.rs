//! Running the signing tool as a subprocess.

use crate::config::ToolConfig;
use async_trait::async_trait;
use pdf_signer_core::{SignError, SignResult, redacted};
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Structured result of one finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Text explaining a failed run. JSignPdf reports many errors on stdout,
    /// so stdout is used when stderr is blank.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Launches the signing tool with a prepared argument list.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> SignResult<InvocationOutcome>;
}

/// Invokes JSignPdf through the configured launcher.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    config: ToolConfig,
}

impl ProcessInvoker {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.program_args)
            .args(args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    #[tracing::instrument(skip_all, fields(program = %self.config.program.display()))]
    async fn invoke(
        &self,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> SignResult<InvocationOutcome> {
        let program = self.config.program_name();
        tracing::debug!(
            cwd = %self.config.working_dir.display(),
            args = %redacted(args),
            "Launching signing tool"
        );

        if let Err(e) = tokio::fs::metadata(&self.config.working_dir).await {
            return Err(SignError::Invocation {
                program,
                source: std::io::Error::new(
                    e.kind(),
                    format!(
                        "JSignPdf directory {} is not accessible: {e}",
                        self.config.working_dir.display()
                    ),
                ),
            });
        }

        let child = self
            .command(args)
            .spawn()
            .map_err(|source| SignError::Invocation {
                program: program.clone(),
                source,
            })?;

        // Dropping the pending future drops the child, which kills it.
        let finished = child.wait_with_output();
        let deadline = async {
            match self.config.timeout {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        let output = tokio::select! {
            res = finished => res.map_err(|source| SignError::Invocation { program, source })?,
            _ = cancel.cancelled() => {
                tracing::warn!("Signing cancelled, killing tool");
                return Err(SignError::Cancelled);
            }
            _ = deadline => {
                let after = self.config.timeout.unwrap_or_default();
                tracing::warn!(?after, "Signing tool timed out, killing it");
                return Err(SignError::TimedOut { after });
            }
        };

        let outcome = InvocationOutcome {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(exit_code = ?outcome.exit_code, "Signing tool exited");
        if !outcome.stdout.is_empty() {
            tracing::trace!(stdout = %outcome.stdout, "Signing tool stdout");
        }
        if !outcome.stderr.is_empty() {
            tracing::trace!(stderr = %outcome.stderr, "Signing tool stderr");
        }
        Ok(outcome)
    }
}
