//! Built-in Terminal Commands
//!
//! A handful of command names are answered directly, before the command gate
//! sees them: the portfolio sections (static text from the config), `date`,
//! `sysinfo` and `help`. Matching is case-insensitive on the trimmed input
//! and must cover the whole line; anything else goes to the gate.

use crate::tools::PolicyTable;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Static content served by section name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortfolioConfig {
    pub entries: BTreeMap<String, String>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        let entries = [
            (
                "about",
                "Welcome! This terminal doubles as a portfolio. Set the [portfolio.entries] \
                 section of config.toml to introduce yourself.",
            ),
            ("resume", "📄 My Resume: https://example.com/resume.pdf"),
            ("skills", "💻 Technical Skills:\nRust, Linux, networking, distributed systems"),
            ("projects", "🔥 My Top Projects:\n\n1. termgate - an allowlist-gated web terminal"),
            ("contact", "📧 Email: you@example.com\n🐙 GitHub: github.com/you"),
            ("education", "🎓 Add your education here."),
            ("experience", "💼 Add your experience here."),
            ("achievements", "🏆 Add your achievements here."),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// A command answered without spawning anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    /// Portfolio section text
    Section(String),
    Date,
    SystemInfo,
    Help,
}

/// Lookup table for built-in commands
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    sections: BTreeMap<String, String>,
}

impl Builtins {
    pub fn new(config: &PortfolioConfig) -> Self {
        Self {
            sections: config
                .entries
                .iter()
                .map(|(name, text)| (name.to_lowercase(), text.clone()))
                .collect(),
        }
    }

    /// Resolve a whole command line to a built-in, if it is one
    ///
    /// Portfolio sections shadow the fixed built-ins of the same name.
    pub fn resolve(&self, command: &str) -> Option<Builtin> {
        let name = command.trim().to_lowercase();

        if let Some(text) = self.sections.get(&name) {
            return Some(Builtin::Section(text.clone()));
        }

        match name.as_str() {
            "date" => Some(Builtin::Date),
            "sysinfo" => Some(Builtin::SystemInfo),
            "help" => Some(Builtin::Help),
            _ => None,
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// `📅 Monday, January 01, 2024` / `🕒 09:30:00 AM`
pub fn format_date<Tz>(now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format("📅 %A, %B %d, %Y\n🕒 %I:%M:%S %p").to_string()
}

/// Overview of everything the terminal understands
pub fn help_text(builtins: &Builtins, policy: &PolicyTable) -> String {
    let mut out = String::from("Portfolio:\n  ");
    out.push_str(&builtins.sections().collect::<Vec<_>>().join(", "));
    out.push_str("\n\nBuilt-ins:\n  date, sysinfo, help\n\nSystem commands:\n  ");
    out.push_str(&policy.commands().map(|(name, _)| name).collect::<Vec<_>>().join(", "));

    let _ = write!(
        out,
        "\n\nReadable files (cat):\n  {}",
        policy.safe_read_paths().collect::<Vec<_>>().join(", ")
    );
    out
}
