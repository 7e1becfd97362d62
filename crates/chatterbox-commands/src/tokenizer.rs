//! Splitting of chat messages into a command word and argument tokens
//!
//! Tokens are separated by runs of whitespace. A double-quoted run forms part of a
//! single token with the quotes removed; inside it, `\"` stands for a literal quote.
//! Backslashes anywhere else are kept as they are. An unterminated quote swallows
//! the rest of the message into the current token. Tokenizing never fails.

/// A message split into its command word and arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedMessage {
    /// First token, empty for a blank message
    pub command: String,
    /// Remaining tokens in order
    pub arguments: Vec<String>,
}

impl TokenizedMessage {
    /// Tokenize a raw message
    pub fn parse(message: &str) -> Self {
        let mut tokens = tokenize(message).into_iter();
        let command = tokens.next().unwrap_or_default();
        Self {
            command,
            arguments: tokens.collect(),
        }
    }
}

/// Split a raw message into tokens
pub fn tokenize(message: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token may be empty (`""`), so track whether one is open
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = message.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                in_token = true;
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(tokenize("fish 10 worm"), vec!["fish", "10", "worm"]);
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(tokenize("  fish \t 10   worm  "), vec!["fish", "10", "worm"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_quoted_run_is_one_token() {
        assert_eq!(tokenize(r#"Foo "Bar Baz""#), vec!["Foo", "Bar Baz"]);
    }

    #[test]
    fn test_escaped_quote_inside_quotes() {
        assert_eq!(tokenize(r#"Foo "Bar \"Baz\"""#), vec!["Foo", r#"Bar "Baz""#]);
    }

    #[test]
    fn test_backslash_outside_quotes_is_literal() {
        assert_eq!(tokenize(r"Foo\Bar"), vec![r"Foo\Bar"]);
        assert_eq!(tokenize(r"a\ b"), vec![r"a\", "b"]);
    }

    #[test]
    fn test_backslash_inside_quotes_without_quote_is_literal() {
        assert_eq!(tokenize(r#""C:\fish\pond""#), vec![r"C:\fish\pond"]);
    }

    #[test]
    fn test_unterminated_quote_takes_remainder() {
        assert_eq!(
            tokenize(r#"say "hello there   friend"#),
            vec!["say", "hello there   friend"]
        );
    }

    #[test]
    fn test_empty_quotes_yield_empty_token() {
        assert_eq!(tokenize(r#"rename """#), vec!["rename", ""]);
    }

    #[test]
    fn test_quotes_glue_to_adjacent_text() {
        assert_eq!(tokenize(r#"name="Big Fish" x"#), vec!["name=Big Fish", "x"]);
    }

    #[test]
    fn test_parse_splits_command_word() {
        let message = TokenizedMessage::parse(r#"  cast "deep lake" 3 "#);
        assert_eq!(message.command, "cast");
        assert_eq!(message.arguments, vec!["deep lake", "3"]);

        let blank = TokenizedMessage::parse("");
        assert_eq!(blank.command, "");
        assert!(blank.arguments.is_empty());
    }
}
