//! The Query value object and the client-side statement splitter.
//!
//! A [`Query`] is an immutable wrapper around raw SQL text. Equality and
//! hashing derive from the text alone; the backend id it carries only serves
//! the mismatch check in `SqlBackend::execute`.

use std::fmt;

/// Immutable SQL text submitted for execution.
///
/// Created via `SqlBackend::make_query`; the text is never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    backend_id: u64,
}

impl Query {
    pub(crate) fn new(text: impl Into<String>, backend_id: u64) -> Self {
        Self {
            text: text.into(),
            backend_id,
        }
    }

    /// The raw SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Id of the backend that minted this query.
    pub(crate) fn backend_id(&self) -> u64 {
        self.backend_id
    }

    /// Split the text into individual statements for dialects whose drivers
    /// execute one statement at a time.
    pub fn statements(&self) -> Vec<String> {
        split_statements(&self.text)
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Query {}

impl std::hash::Hash for Query {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Split raw SQL text on statement boundaries.
///
/// Statement boundaries are top-level semicolons. Semicolons inside single-
/// or double-quoted strings, backtick/bracket identifiers, dollar-quoted
/// bodies (`$tag$ ... $tag$`), line comments and block comments do not split.
/// Empty statements are dropped, so text such as `";;"` or a trailing
/// semicolon yields no spurious entries.
pub fn split_statements(sql: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum State {
        Normal,
        SingleQuote,
        DoubleQuote,
        Backtick,
        Bracket,
        DollarQuote,
        LineComment,
        BlockComment,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut dollar_tag = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Normal => match ch {
                ';' => {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        statements.push(stmt.to_string());
                    }
                    current.clear();
                    continue;
                }
                '\'' => state = State::SingleQuote,
                '"' => state = State::DoubleQuote,
                '`' => state = State::Backtick,
                '[' => state = State::Bracket,
                '$' => {
                    // only an identifier tag closed by '$' opens a dollar quote
                    let mut lookahead = chars.clone();
                    let mut tag = String::new();
                    let mut opens = false;
                    while let Some(&c) = lookahead.peek() {
                        if c == '$' {
                            opens = true;
                            break;
                        }
                        if c.is_alphanumeric() || c == '_' {
                            tag.push(c);
                            lookahead.next();
                        } else {
                            break;
                        }
                    }
                    if opens {
                        current.push(ch);
                        for _ in 0..tag.len() + 1 {
                            current.push(chars.next().unwrap());
                        }
                        dollar_tag = tag;
                        state = State::DollarQuote;
                        continue;
                    }
                }
                '-' if chars.peek() == Some(&'-') => state = State::LineComment,
                '/' if chars.peek() == Some(&'*') => state = State::BlockComment,
                _ => {}
            },
            State::SingleQuote => {
                if ch == '\'' {
                    // a doubled quote is an escaped quote, not a terminator
                    if chars.peek() == Some(&'\'') {
                        current.push(ch);
                        current.push(chars.next().unwrap());
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                if ch == '"' {
                    state = State::Normal;
                }
            }
            State::Backtick => {
                if ch == '`' {
                    state = State::Normal;
                }
            }
            State::Bracket => {
                if ch == ']' {
                    state = State::Normal;
                }
            }
            State::DollarQuote => {
                if ch == '$' {
                    let mut lookahead = chars.clone();
                    let mut closes = true;
                    for tc in dollar_tag.chars() {
                        if lookahead.next() != Some(tc) {
                            closes = false;
                            break;
                        }
                    }
                    if closes && lookahead.peek() == Some(&'$') {
                        current.push(ch);
                        for _ in 0..dollar_tag.len() + 1 {
                            current.push(chars.next().unwrap());
                        }
                        state = State::Normal;
                        continue;
                    }
                }
            }
            State::LineComment => {
                if ch == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    current.push(ch);
                    current.push(chars.next().unwrap());
                    state = State::Normal;
                    continue;
                }
            }
        }

        current.push(ch);
    }

    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_equality_is_text_only() {
        let a = Query::new("SELECT 1", 1);
        let b = Query::new("SELECT 1", 2);
        let c = Query::new("SELECT 2", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_simple() {
        let stmts = split_statements("SELECT 1; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_empty_text_yields_no_statements() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("  ;;  ; ").is_empty());
    }

    #[test]
    fn test_split_semicolon_inside_string_literal() {
        let stmts = split_statements("SELECT 'a;b'; SELECT 2");
        assert_eq!(stmts, vec!["SELECT 'a;b'", "SELECT 2"]);
    }

    #[test]
    fn test_split_escaped_quote_in_literal() {
        let stmts = split_statements("SELECT 'it''s; fine'; SELECT 2");
        assert_eq!(stmts, vec!["SELECT 'it''s; fine'", "SELECT 2"]);
    }

    #[test]
    fn test_split_semicolon_inside_comments() {
        let stmts = split_statements("SELECT 1 -- trailing; comment\n; SELECT 2");
        assert_eq!(stmts.len(), 2);
        let stmts = split_statements("SELECT /* a;b */ 1; SELECT 2");
        assert_eq!(stmts, vec!["SELECT /* a;b */ 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_quoted_identifiers() {
        let stmts = split_statements("SELECT \"a;b\" FROM t; SELECT [c;d] FROM u");
        assert_eq!(stmts.len(), 2);
        let stmts = split_statements("SELECT `e;f` FROM v");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_split_dollar_quoted_body() {
        let stmts = split_statements(
            "DO $$ BEGIN RAISE NOTICE 'hi'; END $$; SELECT 1",
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("DO $$"));
        assert!(stmts[0].ends_with("END $$"));

        let stmts = split_statements("SELECT $tag$a;b$tag$; SELECT 2");
        assert_eq!(stmts, vec!["SELECT $tag$a;b$tag$", "SELECT 2"]);

        // a bare positional parameter does not open a dollar quote
        let stmts = split_statements("SELECT $1 + 1; SELECT 2");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_split_no_trailing_semicolon() {
        let stmts = split_statements("SELECT 1");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }
}
