//! Terminal front end
//!
//! Answers built-in commands directly and forwards everything else to the
//! [`Gate`].

use crate::config::Config;
use crate::metrics;
use crate::portfolio::{format_date, help_text, Builtin, Builtins};
use crate::system_report::SystemSnapshot;
use crate::tools::{CommandExecutor, CommandResponse, Gate, PolicyTable};
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone)]
pub struct Terminal {
    gate: Gate,
    builtins: Builtins,
}

impl Terminal {
    pub fn new(gate: Gate, builtins: Builtins) -> Self {
        Self { gate, builtins }
    }

    /// Build the built-in policy, executor and portfolio from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let executor = CommandExecutor::new(config.executor_config()?);
        let gate = Gate::new(Arc::new(PolicyTable::builtin()), executor);
        Ok(Self::new(gate, Builtins::new(&config.portfolio)))
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Handle one command line from a client
    pub async fn handle(&self, command: &str) -> CommandResponse {
        let command = command.trim();
        if command.is_empty() {
            metrics::record_outcome(metrics::Outcome::Noop);
            return CommandResponse::ok("", 0);
        }

        let Some(builtin) = self.builtins.resolve(command) else {
            return self.gate.run(command).await;
        };

        metrics::record_outcome(metrics::Outcome::Builtin);
        let output = match builtin {
            Builtin::Section(text) => text,
            Builtin::Date => format_date(Local::now()),
            Builtin::Help => help_text(&self.builtins, self.gate.policy()),
            Builtin::SystemInfo => {
                match tokio::task::spawn_blocking(|| SystemSnapshot::collect().render()).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!("System snapshot task failed: {}", e);
                        "Error retrieving system information".to_string()
                    }
                }
            }
        };

        CommandResponse::ok(output, 0)
    }
}
