//! Command Validation Module
//!
//! Turns a token sequence into either a canonical argument vector or a
//! rejection. This is a strict allowlist: anything the [`PolicyTable`] does
//! not name is denied by default.
//!
//! Checks run in a fixed order for each argument. The metacharacter scan
//! always runs first, so no flag or path rule can let an injection
//! character through.

use super::policy::{PolicyEntry, PolicyTable};
use super::tokenizer::{tokenize, Token};
use std::fmt;

/// Characters treated as injection signals in any argument
pub const FORBIDDEN_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}', '\\'];

/// Why a command was denied
///
/// Never shown to the caller. Used for logs and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RejectionKind {
    #[error("malformed quoting")]
    MalformedQuoting,

    #[error("unknown command")]
    UnknownCommand,

    #[error("disallowed character")]
    DisallowedCharacter,

    #[error("unsafe path")]
    UnsafePath,

    #[error("disallowed flag")]
    DisallowedFlag,
}

impl RejectionKind {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedQuoting => "malformed_quoting",
            Self::UnknownCommand => "unknown_command",
            Self::DisallowedCharacter => "disallowed_character",
            Self::UnsafePath => "unsafe_path",
            Self::DisallowedFlag => "disallowed_flag",
        }
    }
}

/// A validated argument vector
///
/// Only the validator can build one, so holding a `CanonicalArgv` means the
/// command name is in the policy table and no argument carries a forbidden
/// metacharacter. An empty argv is the no-op command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalArgv(Vec<String>);

impl CanonicalArgv {
    /// The no-op command
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[cfg(test)]
    pub(crate) fn from_trusted(argv: &[&str]) -> Self {
        Self(argv.iter().map(|s| s.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Program name, if any
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Arguments after the program name
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for CanonicalArgv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Result of validating a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(CanonicalArgv),
    Rejected(RejectionKind),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn rejection(&self) -> Option<RejectionKind> {
        match self {
            Self::Rejected(kind) => Some(*kind),
            Self::Accepted(_) => None,
        }
    }
}

/// Command validator that enforces a [`PolicyTable`]
///
/// # Check order
///
/// 1. Empty command: accepted as a no-op
/// 2. Command name must be a policy key
/// 3. No argument may contain a forbidden metacharacter
/// 4. Path-reading commands may only open safe read paths
/// 5. Flags must be allowed, a prefix extension of an allowed flag, or pass
///    the short-flag fallback
#[derive(Debug, Clone, Copy)]
pub struct CommandValidator<'a> {
    policy: &'a PolicyTable,
}

impl<'a> CommandValidator<'a> {
    pub fn new(policy: &'a PolicyTable) -> Self {
        Self { policy }
    }

    /// Tokenize and validate a raw command line
    ///
    /// # Example
    ///
    /// ```
    /// use termgate::tools::{CommandValidator, PolicyTable, RejectionKind, ValidationOutcome};
    ///
    /// let policy = PolicyTable::builtin();
    /// let validator = CommandValidator::new(&policy);
    ///
    /// assert!(validator.validate("ls -la").is_accepted());
    /// assert_eq!(
    ///     validator.validate("echo hi; rm -rf /"),
    ///     ValidationOutcome::Rejected(RejectionKind::DisallowedCharacter)
    /// );
    /// ```
    pub fn validate(&self, raw: &str) -> ValidationOutcome {
        match tokenize(raw) {
            Ok(tokens) => self.validate_tokens(&tokens),
            Err(_) => ValidationOutcome::Rejected(RejectionKind::MalformedQuoting),
        }
    }

    /// Validate an already tokenized command line
    pub fn validate_tokens(&self, tokens: &[Token]) -> ValidationOutcome {
        match self.check(tokens) {
            Ok(argv) => ValidationOutcome::Accepted(argv),
            Err(kind) => ValidationOutcome::Rejected(kind),
        }
    }

    fn check(&self, tokens: &[Token]) -> Result<CanonicalArgv, RejectionKind> {
        let Some((command, args)) = tokens.split_first() else {
            return Ok(CanonicalArgv::empty());
        };

        let entry = self
            .policy
            .get(command.as_str())
            .ok_or(RejectionKind::UnknownCommand)?;

        let mut argv = Vec::with_capacity(tokens.len());
        argv.push(command.as_str().to_string());

        for arg in args {
            let arg = arg.as_str();
            check_metacharacters(arg)?;
            if entry.reads_paths() {
                self.check_read_path(arg)?;
            }
            if arg.starts_with('-') {
                check_flag(entry, arg)?;
            }
            argv.push(arg.to_string());
        }

        Ok(CanonicalArgv(argv))
    }

    /// Path rules for the path-reading command
    ///
    /// `..` and `~` are refused anywhere in the token, even when the
    /// resulting path would land on an allowed file.
    fn check_read_path(&self, arg: &str) -> Result<(), RejectionKind> {
        if arg.contains("..") || arg.contains('~') {
            return Err(RejectionKind::UnsafePath);
        }
        if arg.starts_with('/') && !self.policy.is_safe_read_path(arg) {
            return Err(RejectionKind::UnsafePath);
        }
        Ok(())
    }

    pub fn policy(&self) -> &PolicyTable {
        self.policy
    }
}

fn check_metacharacters(arg: &str) -> Result<(), RejectionKind> {
    if arg.contains(FORBIDDEN_METACHARACTERS) {
        return Err(RejectionKind::DisallowedCharacter);
    }
    Ok(())
}

fn check_flag(entry: &PolicyEntry, flag: &str) -> Result<(), RejectionKind> {
    let allowed = entry.allowed_flags();
    let listed = allowed.iter().any(|a| a == flag);
    let extends_listed = allowed.iter().any(|a| flag.starts_with(a.as_str()));

    if listed || extends_listed || fallback_short_flag(flag) {
        Ok(())
    } else {
        Err(RejectionKind::DisallowedFlag)
    }
}

/// Fallback rule for unlisted flags: a dash followed only by ASCII
/// alphanumerics (`-x`, `-1`, `-abc`).
///
/// This admits common short flags that are missing from the table, but it
/// also admits combined short flags whose individual letters were never
/// reviewed. Keep it in mind when auditing the policy.
pub fn fallback_short_flag(flag: &str) -> bool {
    match flag.strip_prefix('-') {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn validate(raw: &str) -> ValidationOutcome {
        let policy = PolicyTable::builtin();
        CommandValidator::new(&policy).validate(raw)
    }

    fn accepted(raw: &str) -> Vec<String> {
        match validate(raw) {
            ValidationOutcome::Accepted(argv) => argv.into_vec(),
            ValidationOutcome::Rejected(kind) => panic!("{:?} rejected: {}", raw, kind),
        }
    }

    fn rejected(raw: &str) -> RejectionKind {
        validate(raw)
            .rejection()
            .unwrap_or_else(|| panic!("{:?} should be rejected", raw))
    }

    #[test]
    fn test_empty_is_noop() {
        assert_eq!(validate(""), ValidationOutcome::Accepted(CanonicalArgv::empty()));
        assert_eq!(validate("   "), ValidationOutcome::Accepted(CanonicalArgv::empty()));
    }

    #[test]
    fn test_ls_la() {
        assert_eq!(accepted("ls -la"), vec!["ls", "-la"]);
    }

    #[test]
    fn test_ping_host_is_literal() {
        assert_eq!(
            accepted("ping -c 3 example.com"),
            vec!["ping", "-c", "3", "example.com"]
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(rejected("rm -rf /"), RejectionKind::UnknownCommand);
        assert_eq!(rejected("bash"), RejectionKind::UnknownCommand);
        assert_eq!(rejected("/bin/ls"), RejectionKind::UnknownCommand);
        assert_eq!(rejected("LS"), RejectionKind::UnknownCommand);
    }

    #[test]
    fn test_semicolon_injection() {
        assert_eq!(rejected("echo hi; rm -rf /"), RejectionKind::DisallowedCharacter);
    }

    #[test]
    fn test_each_metacharacter_rejected() {
        for c in FORBIDDEN_METACHARACTERS {
            // Single quotes keep the character literal through tokenization
            let raw = format!("echo 'a{}b'", c);
            assert_eq!(rejected(&raw), RejectionKind::DisallowedCharacter, "char {:?}", c);
        }
    }

    #[test]
    fn test_escaped_backslash_rejected() {
        assert_eq!(rejected(r"echo a\\b"), RejectionKind::DisallowedCharacter);
    }

    #[test]
    fn test_metacharacters_checked_before_path_rules() {
        // Would be UnsafePath too, but the metacharacter scan wins
        assert_eq!(rejected("cat '/etc/passwd;'"), RejectionKind::DisallowedCharacter);
        assert_eq!(rejected("cat '../$x'"), RejectionKind::DisallowedCharacter);
    }

    #[test]
    fn test_metacharacters_checked_before_flag_rules() {
        assert_eq!(rejected("ls '-la$(id)'"), RejectionKind::DisallowedCharacter);
    }

    #[test]
    fn test_malformed_quoting() {
        assert_eq!(rejected("echo 'unterminated"), RejectionKind::MalformedQuoting);
        assert_eq!(rejected("echo \"unterminated"), RejectionKind::MalformedQuoting);
    }

    #[test]
    fn test_dangling_backslash_rejected() {
        assert_eq!(rejected(r"echo foo\"), RejectionKind::MalformedQuoting);
    }

    #[test]
    fn test_hash_words_are_validated() {
        assert_eq!(rejected("#rm -rf /"), RejectionKind::UnknownCommand);
        assert_eq!(rejected("# ls"), RejectionKind::UnknownCommand);
        assert_eq!(
            accepted("grep -c #define main.c"),
            vec!["grep", "-c", "#define", "main.c"]
        );
        assert_eq!(accepted("echo hello #world"), vec!["echo", "hello", "#world"]);
    }

    #[test]
    fn test_cat_safe_paths() {
        assert_eq!(accepted("cat /proc/cpuinfo"), vec!["cat", "/proc/cpuinfo"]);
        assert_eq!(accepted("cat /etc/hostname"), vec!["cat", "/etc/hostname"]);
        // Relative paths without traversal are allowed
        assert_eq!(accepted("cat notes.txt"), vec!["cat", "notes.txt"]);
    }

    #[test]
    fn test_cat_unsafe_paths() {
        assert_eq!(rejected("cat /etc/passwd"), RejectionKind::UnsafePath);
        assert_eq!(rejected("cat /etc/shadow"), RejectionKind::UnsafePath);
        assert_eq!(rejected("cat ../secret"), RejectionKind::UnsafePath);
        assert_eq!(rejected("cat ~/.ssh/id_rsa"), RejectionKind::UnsafePath);
        assert_eq!(rejected("cat ~root/.bashrc"), RejectionKind::UnsafePath);
    }

    #[test]
    fn test_cat_traversal_into_allowed_path() {
        // Resolves to /proc/cpuinfo but is still refused
        assert_eq!(rejected("cat /proc/../proc/cpuinfo"), RejectionKind::UnsafePath);
        assert_eq!(rejected("cat /etc/../etc/hostname"), RejectionKind::UnsafePath);
    }

    #[test]
    fn test_path_rules_only_apply_to_path_reader() {
        assert_eq!(accepted("ls /etc"), vec!["ls", "/etc"]);
        assert_eq!(accepted("echo ../x"), vec!["echo", "../x"]);
    }

    #[test]
    fn test_listed_flags() {
        assert_eq!(accepted("ls --color=auto"), vec!["ls", "--color=auto"]);
        assert_eq!(accepted("grep -i foo notes.txt"), vec!["grep", "-i", "foo", "notes.txt"]);
        assert_eq!(accepted("du -s -h"), vec!["du", "-s", "-h"]);
    }

    #[test]
    fn test_flag_extending_allowed_flag() {
        assert_eq!(accepted("head -n5 notes.txt"), vec!["head", "-n5", "notes.txt"]);
        assert_eq!(accepted("ls --color=autox"), vec!["ls", "--color=autox"]);
    }

    #[test]
    fn test_fallback_short_flags() {
        assert_eq!(accepted("ls -1"), vec!["ls", "-1"]);
        assert_eq!(accepted("echo -n hi"), vec!["echo", "-n", "hi"]);
        assert_eq!(accepted("cat -A notes.txt"), vec!["cat", "-A", "notes.txt"]);
    }

    #[test]
    fn test_disallowed_flags() {
        assert_eq!(rejected("ls --recursive"), RejectionKind::DisallowedFlag);
        assert_eq!(rejected("find . -newer=x"), RejectionKind::DisallowedFlag);
        assert_eq!(rejected("echo --"), RejectionKind::DisallowedFlag);
        assert_eq!(rejected("echo -"), RejectionKind::DisallowedFlag);
        assert_eq!(rejected("sort -o=out"), RejectionKind::DisallowedFlag);
    }

    #[test]
    fn test_fallback_admits_unlisted_words() {
        // Not in the find entry, admitted by the short-flag fallback alone
        assert_eq!(accepted("find . -delete"), vec!["find", ".", "-delete"]);
    }

    #[test]
    fn test_fallback_short_flag_rule() {
        assert!(fallback_short_flag("-a"));
        assert!(fallback_short_flag("-la"));
        assert!(fallback_short_flag("-9"));
        assert!(!fallback_short_flag("-"));
        assert!(!fallback_short_flag("--all"));
        assert!(!fallback_short_flag("-a=b"));
        assert!(!fallback_short_flag("a"));
        assert!(!fallback_short_flag("-é"));
    }

    #[test]
    fn test_argv_accessors() {
        let argv = CanonicalArgv::from_trusted(&["ping", "-c", "3", "example.com"]);
        assert_eq!(argv.program(), Some("ping"));
        assert_eq!(argv.args(), ["-c", "3", "example.com"]);
        assert_eq!(argv.to_string(), "ping -c 3 example.com");

        let empty = CanonicalArgv::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }

    #[test]
    fn test_rejection_labels() {
        assert_eq!(RejectionKind::UnsafePath.as_str(), "unsafe_path");
        assert_eq!(RejectionKind::UnsafePath.to_string(), "unsafe path");
    }

    proptest! {
        #[test]
        fn prop_metacharacters_always_rejected(
            cmd in "(ls|echo|cat|grep|rm|bash|ping)",
            prefix in "[a-z0-9./-]{0,8}",
            suffix in "[a-z0-9./-]{0,8}",
            meta in prop::sample::select(FORBIDDEN_METACHARACTERS.to_vec()),
        ) {
            let raw = format!("{} '{}{}{}'", cmd, prefix, meta, suffix);
            prop_assert!(!validate(&raw).is_accepted());
        }

        #[test]
        fn prop_unknown_commands_rejected(
            cmd in "[a-z]{1,12}",
            args in prop::collection::vec("[a-zA-Z0-9./-]{0,10}", 0..4),
        ) {
            let policy = PolicyTable::builtin();
            prop_assume!(!policy.is_allowed(&cmd));
            let raw = format!("{} {}", cmd, args.join(" "));
            prop_assert_eq!(
                CommandValidator::new(&policy).validate(&raw),
                ValidationOutcome::Rejected(RejectionKind::UnknownCommand)
            );
        }

        #[test]
        fn prop_validation_is_deterministic(raw in "\\PC{0,40}") {
            prop_assert_eq!(validate(&raw), validate(&raw));
        }

        #[test]
        fn prop_whitespace_is_noop(raw in "[ \t\n]{0,10}") {
            prop_assert_eq!(validate(&raw), ValidationOutcome::Accepted(CanonicalArgv::empty()));
        }

        #[test]
        fn prop_accepted_argv_is_clean(raw in "\\PC{0,40}") {
            let policy = PolicyTable::builtin();
            if let ValidationOutcome::Accepted(argv) = CommandValidator::new(&policy).validate(&raw) {
                if let Some(program) = argv.program() {
                    prop_assert!(policy.is_allowed(program));
                }
                for arg in argv.as_slice() {
                    prop_assert!(!arg.contains(FORBIDDEN_METACHARACTERS));
                }
            }
        }

        #[test]
        fn prop_cat_absolute_paths_outside_list_rejected(path in "/[a-z]{1,8}/[a-z]{1,8}") {
            let policy = PolicyTable::builtin();
            prop_assume!(!policy.is_safe_read_path(&path));
            prop_assert_eq!(
                CommandValidator::new(&policy).validate(&format!("cat {}", path)),
                ValidationOutcome::Rejected(RejectionKind::UnsafePath)
            );
        }
    }
}
