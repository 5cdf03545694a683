//! Command Line Tokenizer
//!
//! Splits a raw command line into literal tokens using POSIX word-splitting
//! rules (single quotes, double quotes, backslash escapes). Nothing else is
//! interpreted: no globbing, no variable or command substitution. The
//! tokenizer is purely lexical and never touches the filesystem or the
//! environment.

use std::fmt;

/// Lexing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unbalanced quote or dangling escape in command line")]
    Unbalanced,
}

/// A single literal word from the command line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tokenize a raw command line
///
/// Empty or whitespace-only input yields an empty token list. Unbalanced
/// quotes and dangling escapes yield [`LexError::Unbalanced`]. A `#` is an
/// ordinary character, never the start of a comment.
///
/// # Example
///
/// ```
/// use termgate::tools::tokenize;
///
/// let tokens = tokenize(r#"grep -i "hello world" notes.txt"#).unwrap();
/// let words: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
/// assert_eq!(words, ["grep", "-i", "hello world", "notes.txt"]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let normalized = normalize(input)?;

    shell_words::split(&normalized)
        .map(|words| words.into_iter().map(Token).collect())
        .map_err(|_| LexError::Unbalanced)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Rewrite the line into the dialect `shell_words` splits the same way a
/// shell without comment handling would.
///
/// Outside quotes, `#` is escaped so it stays literal and a carriage return
/// becomes a word separator. A backslash with nothing after it is an error.
fn normalize(input: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(input.len());
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::Single, '\'') => quote = Quote::None,
            (Quote::Single, _) => {}
            (_, '\\') => {
                out.push(c);
                match chars.next() {
                    // The escaped character is copied untouched
                    Some(escaped) => out.push(escaped),
                    None if quote == Quote::None => return Err(LexError::Unbalanced),
                    None => {}
                }
                continue;
            }
            (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, _) => {}
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::None, '#') => {
                out.push_str("\\#");
                continue;
            }
            (Quote::None, '\r') => {
                out.push(' ');
                continue;
            }
            (Quote::None, _) => {}
        }
        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(Token::into_string)
            .collect()
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t  ").unwrap().is_empty());
        assert!(tokenize("\n").unwrap().is_empty());
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(words("ls -la"), vec!["ls", "-la"]);
        assert_eq!(words("  ping   -c 3\texample.com "), vec!["ping", "-c", "3", "example.com"]);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(words("echo 'a b'"), vec!["echo", "a b"]);
        assert_eq!(words(r#"echo "a b" c"#), vec!["echo", "a b", "c"]);
        assert_eq!(words(r#"echo 'it"s'"#), vec!["echo", "it\"s"]);
        assert_eq!(words("echo ''"), vec!["echo", ""]);
    }

    #[test]
    fn test_escapes_are_resolved() {
        assert_eq!(words(r"echo a\ b"), vec!["echo", "a b"]);
        assert_eq!(words(r#"echo "say \"hi\"""#), vec!["echo", "say \"hi\""]);
        // Escaped metacharacters come out as plain characters
        assert_eq!(words(r"echo a\;b"), vec!["echo", "a;b"]);
    }

    #[test]
    fn test_no_expansion() {
        assert_eq!(words("echo *.rs"), vec!["echo", "*.rs"]);
        assert_eq!(words("echo '$HOME'"), vec!["echo", "$HOME"]);
    }

    #[test]
    fn test_unbalanced_quotes() {
        assert_eq!(tokenize("echo 'oops"), Err(LexError::Unbalanced));
        assert_eq!(tokenize(r#"echo "oops"#), Err(LexError::Unbalanced));
    }

    #[test]
    fn test_dangling_escape() {
        assert_eq!(tokenize(r"echo foo\"), Err(LexError::Unbalanced));
        assert_eq!(tokenize("\\"), Err(LexError::Unbalanced));
        // An escaped backslash at the end is complete
        assert_eq!(words(r"echo foo\\"), vec!["echo", "foo\\"]);
    }

    #[test]
    fn test_hash_is_literal() {
        assert_eq!(words("#rm -rf /"), vec!["#rm", "-rf", "/"]);
        assert_eq!(words("grep -c #define main.c"), vec!["grep", "-c", "#define", "main.c"]);
        assert_eq!(words("echo hello #world"), vec!["echo", "hello", "#world"]);
        assert_eq!(words("echo a#b"), vec!["echo", "a#b"]);
        assert_eq!(words(r##"echo \#x '#y' "#z""##), vec!["echo", "#x", "#y", "#z"]);
    }

    #[test]
    fn test_carriage_return_separates_words() {
        assert_eq!(words("ls\r-la"), vec!["ls", "-la"]);
        assert_eq!(words("ls -la\r\n"), vec!["ls", "-la"]);
        assert!(tokenize("\r\n").unwrap().is_empty());
        // Quoted carriage returns stay part of the word
        assert_eq!(words("echo 'a\rb'"), vec!["echo", "a\rb"]);
    }

    #[test]
    fn test_token_display() {
        let token = Token::from("-la");
        assert_eq!(token.to_string(), "-la");
        assert_eq!(token.as_str(), "-la");
    }
}
