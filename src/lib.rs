//! termgate
//!
//! A web terminal that runs untrusted command lines through an allowlist
//! gate. Commands are tokenized, validated against an immutable policy and
//! executed without a shell under a timeout, a cleared environment and a
//! fixed working directory.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod portfolio;
pub mod server;
pub mod system_report;
pub mod terminal;
pub mod tools;
