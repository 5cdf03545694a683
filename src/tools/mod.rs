//! Command Gate Subsystem
//!
//! Decides whether an untrusted command line may run, and runs it with
//! bounded risk.
//!
//! # Security Features
//!
//! - **Allowlist**: only commands and flags named in the [`PolicyTable`] run
//! - **No Shell**: commands run as argument vectors, never through a shell
//! - **Metacharacter Scan**: `;`, `&`, `|`, backtick, `$`, parentheses, braces and
//!   backslash are refused in any argument
//! - **Path Allowlist**: the path-reading command may only open a fixed set of files
//! - **Timeout Enforcement**: every child is killed at the deadline
//! - **Restricted Environment**: cleared environment, fixed `PATH` and working directory
//!
//! # Architecture
//!
//! - `tokenizer.rs`: POSIX word splitting into literal tokens
//! - `policy.rs`: the immutable command allowlist
//! - `validator.rs`: allowlist checks producing a canonical argv
//! - `executor.rs`: subprocess execution with timeout handling
//! - `timeout.rs`: timeout management
//! - `gate.rs`: orchestration and response mapping
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use termgate::tools::{CommandExecutor, Gate, PolicyTable};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gate = Gate::new(Arc::new(PolicyTable::builtin()), CommandExecutor::default());
//!
//!     let response = gate.run("uname -a").await;
//!     println!("{} {}", response.status, response.output);
//! }
//! ```

mod executor;
mod gate;
mod policy;
mod timeout;
mod tokenizer;
mod validator;

pub use executor::{
    CommandExecutor, ExecutionKind, ExecutionResult, ExecutorConfig, DEFAULT_SEARCH_PATH,
    MAX_OUTPUT_SIZE,
};
pub use gate::{CommandResponse, Gate, NOT_PERMITTED_MESSAGE};
pub use policy::{PolicyEntry, PolicyTable};
pub use timeout::{ExecutionTimeout, TimedOut, DEFAULT_TIMEOUT_SECS};
pub use tokenizer::{tokenize, LexError, Token};
pub use validator::{
    fallback_short_flag, CanonicalArgv, CommandValidator, RejectionKind, ValidationOutcome,
    FORBIDDEN_METACHARACTERS,
};
