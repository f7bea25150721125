//! Lexer (tokenizer) for rule source text.
//!
//! Words are separated by whitespace; there is no other punctuation and no
//! escape syntax. A word ending in `;` yields the word followed by a
//! terminator. `#` at the start of a word comments out the rest of the line.

use crate::{Span, Token};

/// Lexer state.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize all input into a vector of tokens.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.peek_char().is_none() {
                break;
            }
            self.scan_word(&mut tokens);
        }
        tracing::trace!(count = tokens.len(), "tokenized rule source");
        tokens
    }

    fn current_span(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn next_char(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.pos = pos + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek_char() {
            if is_separator(c) {
                self.next_char();
            } else if c == '#' {
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.next_char();
                }
            } else {
                break;
            }
        }
    }

    fn scan_word(&mut self, tokens: &mut Vec<Token>) {
        let start = self.current_span();
        let mut text = String::new();
        let mut last = start;

        while let Some(c) = self.peek_char() {
            if is_separator(c) {
                break;
            }
            last = self.current_span();
            text.push(c);
            self.next_char();
        }

        let mut span = start;
        span.end = self.pos;

        // Only one trailing ';' is a terminator: "a;;" is the word "a;" closing a block.
        if let Some(stripped) = text.strip_suffix(';') {
            let terminator = Span::new(last.start, self.pos, last.line, last.column);
            if !stripped.is_empty() {
                span.end = last.start;
                tokens.push(Token::word(stripped, span));
            }
            tokens.push(Token::terminator(terminator));
        } else {
            tokens.push(Token::word(text, span));
        }
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenKind;
    use pretty_assertions::assert_eq;

    fn tokenize(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn word(s: &str) -> TokenKind {
        TokenKind::Word(s.to_string())
    }

    #[test]
    fn test_words_split_on_whitespace() {
        let kinds = tokenize("accept\tipsrc  10.0.0.0/8\r\n");
        assert_eq!(
            kinds,
            vec![word("accept"), word("ipsrc"), word("10.0.0.0/8")]
        );
    }

    #[test]
    fn test_trailing_semicolon_splits() {
        let kinds = tokenize("drop; ;");
        assert_eq!(
            kinds,
            vec![word("drop"), TokenKind::Terminator, TokenKind::Terminator]
        );
    }

    #[test]
    fn test_attached_terminator() {
        // GIVEN
        let attached = Lexer::new("drop;").tokenize();
        let separate = Lexer::new("drop ;").tokenize();

        // THEN
        assert!(attached[1].terminates(attached[0].span));
        assert!(!separate[1].terminates(separate[0].span));
        assert_eq!((separate[0].span.start, separate[0].span.end), (0, 4));
    }

    #[test]
    fn test_only_one_semicolon_stripped() {
        let kinds = tokenize("a;;");
        assert_eq!(kinds, vec![word("a;"), TokenKind::Terminator]);
    }

    #[test]
    fn test_comments_skipped() {
        let kinds = tokenize("# leading comment\naccept # trailing; not a terminator\ndrop");
        assert_eq!(kinds, vec![word("accept"), word("drop")]);
    }

    #[test]
    fn test_hash_inside_word_is_literal() {
        let kinds = tokenize("a#b");
        assert_eq!(kinds, vec![word("a#b")]);
    }

    #[test]
    fn test_positions() {
        // GIVEN
        let source = "tag role\n  id 7;";

        // WHEN
        let tokens = Lexer::new(source).tokenize();

        // THEN
        let positions: Vec<(usize, usize)> = tokens
            .iter()
            .map(|t| (t.span.line, t.span.column))
            .collect();
        assert_eq!(positions, vec![(1, 1), (1, 5), (2, 3), (2, 6), (2, 7)]);
        assert!(tokens[4].is_terminator());
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n# only a comment").is_empty());
    }
}
