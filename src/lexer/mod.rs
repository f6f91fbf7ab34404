mod token;

pub use token::{Position, Token, TokenKind};

use std::{iter::Peekable, str::Chars};

/// Streams UTF-8 source text into [`Token`]s. Stateless beyond a character
/// cursor and a line/column counter; `next_token` may be called past end of
/// input and will keep returning [`TokenKind::Eof`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        (self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some('\r') => {
                    // Treat a lone '\r' and a '\r\n' pair both as a single newline.
                    self.advance();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while !matches!(self.peek(), Some('\n') | None) {
                            self.advance();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    fn read_string(&mut self) -> String {
        let mut out = String::new();
        loop {
            match self.advance() {
                None | Some('"') => break,
                Some('\\') => {
                    if let Some(escaped) = self.advance() {
                        out.push(escaped);
                    }
                }
                Some(c) => out.push(c),
            }
        }
        out
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let position = self.position();

        let Some(c) = self.advance() else {
            return Token::new(TokenKind::Eof, position);
        };

        let kind = match c {
            '=' => self.two_char('=', TokenKind::Eq, TokenKind::Assign),
            '+' => self.two_char('+', TokenKind::Increment, TokenKind::Plus),
            '-' => self.two_char('-', TokenKind::Decrement, TokenKind::Minus),
            '!' => self.two_char('=', TokenKind::NotEq, TokenKind::Bang),
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => self.two_char('=', TokenKind::Lte, TokenKind::Lt),
            '>' => self.two_char('=', TokenKind::Gte, TokenKind::Gt),
            '&' => self.two_char('&', TokenKind::And, TokenKind::Illegal('&')),
            '|' => self.two_char('|', TokenKind::Or, TokenKind::Illegal('|')),
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '"' => TokenKind::Str(self.read_string()),
            c if c.is_ascii_digit() => {
                let mut digits = String::from(c);
                digits.push_str(&self.read_while(|c| c.is_ascii_digit()));
                TokenKind::Int(digits.parse().expect("maximal digit run parses as u64"))
            }
            c if c == '_' || c.is_alphabetic() => {
                let mut ident = String::from(c);
                ident.push_str(&self.read_while(|c| c == '_' || c.is_alphanumeric()));
                Token::keyword(&ident).unwrap_or(TokenKind::Ident(ident))
            }
            other => TokenKind::Illegal(other),
        };

        Token::new(kind, position)
    }

    /// Consumes a second character if it matches `expected`, yielding `two`;
    /// otherwise yields `one` without consuming anything further.
    fn two_char(&mut self, expected: char, two: TokenKind, one: TokenKind) -> TokenKind {
        if self.peek() == Some(expected) {
            self.advance();
            two
        } else {
            one
        }
    }

    pub fn source(&self) -> &'a str {
        self.input
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = vec![];
        loop {
            let tok = lexer.next_token();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn lexes_basic_let_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("let five = 5;"),
            vec![Let, Ident("five".into()), Assign, Int(5), Semicolon]
        );
    }

    #[test]
    fn lexes_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != <= >= && || % ++ --"),
            vec![Eq, NotEq, Lte, Gte, And, Or, Percent, Increment, Decrement]
        );
    }

    #[test]
    fn lexes_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("fn let true false if else return while for break continue"),
            vec![
                Function, Let, True, False, If, Else, Return, While, For, Break, Continue
            ]
        );
    }

    #[test]
    fn lexes_string_with_escaped_quote() {
        use TokenKind::*;
        assert_eq!(kinds(r#""say \"hi\"""#), vec![Str("say \"hi\"".into())]);
    }

    #[test]
    fn skips_line_comments() {
        use TokenKind::*;
        assert_eq!(kinds("5 // ignored\n6"), vec![Int(5), Int(6)]);
    }

    #[test]
    fn treats_crlf_as_single_newline() {
        use TokenKind::*;
        let mut lexer = Lexer::new("1\r\n2");
        let first = lexer.next_token();
        assert_eq!(first.kind, Int(1));
        let second = lexer.next_token();
        assert_eq!(second.kind, Int(2));
        assert_eq!(second.position.0, 2);
    }

    #[test]
    fn illegal_byte_is_tagged() {
        let mut lexer = Lexer::new("@");
        assert_eq!(lexer.next_token().kind, TokenKind::Illegal('@'));
    }

    #[test]
    fn repeated_eof() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
