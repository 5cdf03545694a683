// Prometheus metrics for the command gate
//
// Exposed on the /metrics HTTP endpoint:
// - Commands handled, by outcome (counter)
// - Rejections, by internal reason (counter)
// - Child process run time (histogram)

use crate::tools::{ExecutionKind, ExecutionResult, RejectionKind};
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("termgate_commands_total", "Commands handled, by outcome"),
        &["outcome"]
    ).expect("Failed to create commands total metric");

    pub static ref REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("termgate_rejections_total", "Commands denied by policy, by reason"),
        &["kind"]
    ).expect("Failed to create rejections total metric");

    pub static ref EXECUTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "termgate_execution_duration_seconds",
            "Wall-clock time of executed commands"
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]),
    ).expect("Failed to create execution duration metric");
}

/// How a request to /run_command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Noop,
    Builtin,
    Rejected,
    Completed,
    TimedOut,
    SpawnFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Builtin => "builtin",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::SpawnFailed => "spawn_failed",
        }
    }
}

/// Register all metrics with the registry
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(REJECTIONS_TOTAL.clone()),
        Box::new(EXECUTION_DURATION_SECONDS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

pub fn record_outcome(outcome: Outcome) {
    COMMANDS_TOTAL.with_label_values(&[outcome.as_str()]).inc();
}

pub fn record_rejection(kind: RejectionKind) {
    record_outcome(Outcome::Rejected);
    REJECTIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

pub fn record_execution(result: &ExecutionResult) {
    let outcome = match result.kind {
        ExecutionKind::Success => Outcome::Completed,
        ExecutionKind::TimedOut => Outcome::TimedOut,
        ExecutionKind::SpawnFailed => Outcome::SpawnFailed,
    };
    record_outcome(outcome);
    EXECUTION_DURATION_SECONDS.observe(result.duration_ms / 1000.0);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
