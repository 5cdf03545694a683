//! Command Gate
//!
//! Runs the tokenizer, validator and executor in sequence and maps the
//! outcome onto the response envelope. Every rejection collapses into the
//! same denial so callers cannot probe the policy; the specific reason only
//! reaches the logs and metrics.

use super::executor::{CommandExecutor, ExecutionKind, ExecutionResult};
use super::policy::PolicyTable;
use super::validator::{CommandValidator, ValidationOutcome};
use crate::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NOT_PERMITTED_MESSAGE: &str =
    "Error: Command not allowed. Only safe read-only commands are permitted.";

/// Response envelope `{ "output": ..., "status": ... }` plus the HTTP status
/// it travels with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    #[serde(skip)]
    pub http_status: u16,
    pub output: String,
    pub status: i32,
}

impl CommandResponse {
    pub fn ok(output: impl Into<String>, status: i32) -> Self {
        Self {
            http_status: 200,
            output: output.into(),
            status,
        }
    }

    pub fn error(http_status: u16, output: impl Into<String>) -> Self {
        Self {
            http_status,
            output: output.into(),
            status: 1,
        }
    }

    pub fn not_permitted() -> Self {
        Self::error(403, NOT_PERMITTED_MESSAGE)
    }

    pub fn timed_out(seconds: u64) -> Self {
        Self::error(408, format!("Error: Command timed out after {} seconds", seconds))
    }

    pub fn execution_failed(message: &str) -> Self {
        Self::error(500, format!("Error executing command: {}", message))
    }

    fn from_execution(result: ExecutionResult, timeout_secs: u64) -> Self {
        match result.kind {
            ExecutionKind::Success => Self::ok(result.combined_output(), result.exit_code),
            ExecutionKind::TimedOut => Self::timed_out(timeout_secs),
            ExecutionKind::SpawnFailed => {
                Self::execution_failed(result.error.as_deref().unwrap_or("failed to start process"))
            }
        }
    }
}

/// Validate-and-execute entry point
///
/// Holds the shared, read-only policy and the executor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Gate {
    policy: Arc<PolicyTable>,
    executor: CommandExecutor,
}

impl Gate {
    pub fn new(policy: Arc<PolicyTable>, executor: CommandExecutor) -> Self {
        Self { policy, executor }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Pure validation, no side effects
    pub fn validate(&self, raw: &str) -> ValidationOutcome {
        CommandValidator::new(&self.policy).validate(raw)
    }

    /// Validate `raw` and, if accepted, execute it
    ///
    /// All rejection reasons are settled before anything is spawned.
    pub async fn run(&self, raw: &str) -> CommandResponse {
        let argv = match self.validate(raw) {
            ValidationOutcome::Accepted(argv) => argv,
            ValidationOutcome::Rejected(kind) => {
                warn!(reason = %kind, "Command rejected");
                metrics::record_rejection(kind);
                return CommandResponse::not_permitted();
            }
        };

        if argv.is_empty() {
            debug!("No-op command");
            metrics::record_outcome(metrics::Outcome::Noop);
            return CommandResponse::ok("", 0);
        }

        let result = self.executor.execute(&argv).await;
        metrics::record_execution(&result);

        CommandResponse::from_execution(result, self.executor.config().timeout.as_secs())
    }
}
