//! Command Policy Table
//!
//! The single source of truth for what may run: a fixed mapping from command
//! name to the flags permitted for it, plus the absolute paths that the
//! path-reading command may open. The table is built once at startup and only
//! ever handed out by shared reference.

use std::collections::{BTreeMap, BTreeSet};

/// Files that the path-reading command may open
const SAFE_READ_PATHS: &[&str] = &[
    "/etc/os-release",
    "/etc/hostname",
    "/etc/timezone",
    "/proc/cpuinfo",
    "/proc/meminfo",
    "/proc/version",
    "/proc/uptime",
    "/proc/loadavg",
];

/// (command, allowed flags, reads paths)
const BUILTIN_POLICY: &[(&str, &[&str], bool)] = &[
    // Filesystem (read-only)
    ("ls", &["-l", "-a", "-la", "-h", "-R", "--color=auto"], false),
    ("pwd", &[], false),
    ("whoami", &[], false),
    ("id", &[], false),
    ("cat", &[], true),
    ("head", &["-n"], false),
    ("tail", &["-n"], false),
    ("wc", &["-l", "-w", "-c"], false),
    ("file", &[], false),
    ("stat", &[], false),
    ("find", &["-name", "-type", "-maxdepth"], false),
    // Processes and system information
    ("ps", &["aux", "-ef", "-u"], false),
    ("top", &["-n"], false),
    ("jobs", &[], false),
    ("uname", &["-a", "-r", "-s"], false),
    ("uptime", &[], false),
    ("free", &["-h"], false),
    ("df", &["-h"], false),
    ("du", &["-h", "-s"], false),
    ("lscpu", &[], false),
    ("lsblk", &[], false),
    ("mount", &[], false),
    // Network diagnostics (read-only)
    ("ping", &["-c"], false),
    ("host", &[], false),
    ("nslookup", &[], false),
    ("ifconfig", &[], false),
    ("ip", &["addr", "route"], false),
    // Date and time
    ("date", &[], false),
    ("cal", &[], false),
    // Text processing
    ("grep", &["-n", "-i", "-v", "-c"], false),
    ("sort", &[], false),
    ("uniq", &[], false),
    ("cut", &["-d", "-f"], false),
    // Environment
    ("env", &[], false),
    ("printenv", &[], false),
    ("which", &[], false),
    ("whereis", &[], false),
    ("type", &[], false),
    // Harmless utilities
    ("echo", &[], false),
    ("printf", &[], false),
    ("basename", &[], false),
    ("dirname", &[], false),
    ("realpath", &[], false),
    ("readlink", &[], false),
];

/// Policy for a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    allowed_flags: Vec<String>,
    reads_paths: bool,
}

impl PolicyEntry {
    /// Flags permitted for this command, in declaration order
    pub fn allowed_flags(&self) -> &[String] {
        &self.allowed_flags
    }

    /// Whether positional arguments are file paths subject to [`PolicyTable::is_safe_read_path`]
    pub fn reads_paths(&self) -> bool {
        self.reads_paths
    }
}

/// Immutable command allowlist
///
/// There is no mutation API. Construct once with [`PolicyTable::builtin`] and
/// share behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    commands: BTreeMap<String, PolicyEntry>,
    safe_read_paths: BTreeSet<String>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyTable {
    /// The compiled-in policy
    pub fn builtin() -> Self {
        let commands = BUILTIN_POLICY
            .iter()
            .map(|(name, flags, reads_paths)| {
                (
                    name.to_string(),
                    PolicyEntry {
                        allowed_flags: flags.iter().map(|f| f.to_string()).collect(),
                        reads_paths: *reads_paths,
                    },
                )
            })
            .collect();

        Self {
            commands,
            safe_read_paths: SAFE_READ_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Look up the policy for a command name
    pub fn get(&self, command: &str) -> Option<&PolicyEntry> {
        self.commands.get(command)
    }

    /// Check if a command is in the allowlist
    pub fn is_allowed(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    /// Whether `path` is one of the fixed readable files
    pub fn is_safe_read_path(&self, path: &str) -> bool {
        self.safe_read_paths.contains(path)
    }

    /// Allowed commands in sorted order
    pub fn commands(&self) -> impl Iterator<Item = (&str, &PolicyEntry)> {
        self.commands.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn safe_read_paths(&self) -> impl Iterator<Item = &str> {
        self.safe_read_paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands() {
        let policy = PolicyTable::builtin();

        for cmd in ["ls", "cat", "ping", "grep", "echo", "uname", "readlink"] {
            assert!(policy.is_allowed(cmd), "{} should be allowed", cmd);
        }

        for cmd in ["rm", "sh", "bash", "curl", "python3", "/bin/ls", "sudo"] {
            assert!(!policy.is_allowed(cmd), "{} should not be allowed", cmd);
        }
    }

    #[test]
    fn test_flags_for_command() {
        let policy = PolicyTable::builtin();

        let ls = policy.get("ls").unwrap();
        assert_eq!(ls.allowed_flags(), ["-l", "-a", "-la", "-h", "-R", "--color=auto"]);
        assert!(!ls.reads_paths());

        let echo = policy.get("echo").unwrap();
        assert!(echo.allowed_flags().is_empty());
    }

    #[test]
    fn test_only_cat_reads_paths() {
        let policy = PolicyTable::builtin();
        let readers: Vec<&str> = policy
            .commands()
            .filter(|(_, entry)| entry.reads_paths())
            .map(|(name, _)| name)
            .collect();
        assert_eq!(readers, vec!["cat"]);
    }

    #[test]
    fn test_safe_read_paths() {
        let policy = PolicyTable::builtin();
        assert!(policy.is_safe_read_path("/proc/cpuinfo"));
        assert!(policy.is_safe_read_path("/etc/os-release"));
        assert!(!policy.is_safe_read_path("/etc/passwd"));
        assert!(!policy.is_safe_read_path("/etc/shadow"));
        assert_eq!(policy.safe_read_paths().count(), 8);
    }

    #[test]
    fn test_table_size() {
        let policy = PolicyTable::default();
        assert_eq!(policy.len(), BUILTIN_POLICY.len());
        assert!(!policy.is_empty());
    }
}
