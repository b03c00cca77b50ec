//! Local execution layer
//!
//! Runs foreign invocations as bash processes on the tokio runtime, at most
//! `worker.concurrency` at a time. Each ticket gets its own work directory
//! under `worker.build_dir` holding the generated script, captured stdout
//! and stderr, the output report and a JSON-lines event log.

pub mod report;
pub mod runner;
pub mod script;

use crate::config::WorkerConfig;
use crate::reducer::types::{Compound, LANG_BASH};
use crate::tickets::Invocation;
use crate::types::{QueryId, TicketRef};
use chrono::Utc;
use report::{append_event, harvest, ReportEvent, REPORT_FILE};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const SCRIPT_FILE: &str = "script.sh";
pub const STDOUT_FILE: &str = "stdout.txt";
pub const STDERR_FILE: &str = "stderr.txt";

/// Bytes of stderr kept in a failure message
const STDERR_TAIL: usize = 2048;

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("unsupported foreign language `{lang}`")]
    UnsupportedLanguage { lang: String },

    #[error("`{name}` is not a valid shell identifier")]
    InvalidName { name: String },

    #[error("failed to {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script exited with {}: {stderr}", .status.map_or("a signal".to_string(), |c| format!("status {}", c)))]
    NonZeroExit { status: Option<i32>, stderr: String },

    #[error("output `{name}` was not reported")]
    MissingOutput { name: String },

    #[error("output `{name}` must have exactly one value, got {count}")]
    OutputCardinality { name: String, count: usize },

    #[error("malformed output report: {reason}")]
    MalformedReport { reason: String },

    #[error("invocation cancelled")]
    Cancelled,
}

impl InvocationError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        InvocationError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result of one invocation, sent back to the owning query's loop
#[derive(Debug)]
pub struct Completion {
    pub ticket: TicketRef,
    pub query: QueryId,
    /// Output values, channel 1 first
    pub result: Result<Vec<Compound>, InvocationError>,
}

/// Bounded pool of local bash workers
#[derive(Debug, Clone)]
pub struct LocalWorker {
    config: Arc<WorkerConfig>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl LocalWorker {
    pub fn new(config: WorkerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            config: Arc::new(config),
            permits,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Token cancelled by [`LocalWorker::shutdown`]; callers derive per-query children from it
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Stop accepting work and kill running processes
    pub fn shutdown(&self) {
        info!("local worker shutting down");
        self.shutdown.cancel();
    }

    /// Run `invocation` on the pool and report through `done`
    pub fn spawn(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
        done: mpsc::UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            let result = worker.run(&invocation, &cancel).await;
            let completion = Completion {
                ticket: invocation.ticket,
                query: invocation.query,
                result,
            };
            // Receiver gone means the query already ended
            let _ = done.send(completion);
        })
    }

    /// Run one invocation to completion and harvest its outputs
    pub async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<Vec<Compound>, InvocationError> {
        let lambda = &invocation.lambda;
        if lambda.lang != LANG_BASH {
            return Err(InvocationError::UnsupportedLanguage {
                lang: lambda.lang.clone(),
            });
        }
        let script = script::render(invocation)?;

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InvocationError::Cancelled),
            _ = self.shutdown.cancelled() => return Err(InvocationError::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|_| InvocationError::Cancelled)?,
        };

        let dir = self.work_dir(invocation.ticket)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| InvocationError::io(format!("create work directory {}", dir.display()), e))?;
        tokio::fs::write(dir.join(SCRIPT_FILE), script)
            .await
            .map_err(|e| InvocationError::io("write script", e))?;
        // The script appends to the report; a rerun must not see stale records
        match tokio::fs::remove_file(dir.join(REPORT_FILE)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(InvocationError::io("clear output report", e)),
        }

        debug!(ticket = %invocation.ticket, dir = %dir.display(), "invocation started");
        append_event(
            &dir,
            &ReportEvent::Started {
                at: Utc::now(),
                ticket: invocation.ticket,
                lang: lambda.lang.clone(),
            },
        )
        .await?;

        let started = Utc::now();
        let status = self.execute(&dir, cancel).await?;
        append_event(
            &dir,
            &ReportEvent::Finished {
                at: Utc::now(),
                ticket: invocation.ticket,
                exit_code: status.code(),
                duration_ms: (Utc::now() - started).num_milliseconds(),
            },
        )
        .await?;

        if !status.success() {
            let stderr = read_tail(&dir.join(STDERR_FILE)).await;
            warn!(ticket = %invocation.ticket, code = ?status.code(), "invocation failed");
            return Err(InvocationError::NonZeroExit {
                status: status.code(),
                stderr,
            });
        }

        let bytes = match tokio::fs::read(dir.join(REPORT_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(InvocationError::io("read output report", e)),
        };
        let outputs = harvest(&bytes, &lambda.sign)?;
        append_event(
            &dir,
            &ReportEvent::Harvested {
                at: Utc::now(),
                ticket: invocation.ticket,
                outputs: outputs.len(),
            },
        )
        .await?;
        debug!(ticket = %invocation.ticket, "invocation finished");

        if !self.config.keep_work_dirs {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %e, "failed to remove work directory");
            }
        }
        Ok(outputs)
    }

    async fn execute(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<std::process::ExitStatus, InvocationError> {
        let stdout = std::fs::File::create(dir.join(STDOUT_FILE))
            .map_err(|e| InvocationError::io("create stdout file", e))?;
        let stderr = std::fs::File::create(dir.join(STDERR_FILE))
            .map_err(|e| InvocationError::io("create stderr file", e))?;

        let mut child = Command::new(&self.config.shell)
            .arg(SCRIPT_FILE)
            .current_dir(dir)
            .env(script::REPORT_ENV, dir.join(REPORT_FILE))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InvocationError::io(format!("spawn `{}`", self.config.shell), e))?;

        tokio::select! {
            status = child.wait() => status.map_err(|e| InvocationError::io("wait for script", e)),
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(InvocationError::Cancelled)
            }
            _ = self.shutdown.cancelled() => {
                let _ = child.kill().await;
                Err(InvocationError::Cancelled)
            }
        }
    }

    /// Absolute work directory of `ticket`
    fn work_dir(&self, ticket: TicketRef) -> Result<PathBuf, InvocationError> {
        let base = if self.config.build_dir.is_absolute() {
            self.config.build_dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| InvocationError::io("resolve current directory", e))?
                .join(&self.config.build_dir)
        };
        Ok(base.join(ticket.to_string()))
    }
}

async fn read_tail(path: &Path) -> String {
    let bytes = tokio::fs::read(path).await.unwrap_or_default();
    let start = bytes.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

#[cfg(test)]
#[path = "worker/tests/worker_tests.rs"]
mod tests;
