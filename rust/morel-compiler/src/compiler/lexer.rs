//! Lexer for ML source text.

use crate::compiler::tokens::{Pos, Token, TokenKind};
use num_bigint::BigInt;
use num_traits::Num;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("unterminated comment at line {line}, col {col}")]
    UnterminatedComment { line: usize, col: usize },
    #[error("invalid number at line {line}, col {col}")]
    InvalidNumber { line: usize, col: usize },
    #[error("invalid character literal at line {line}, col {col}")]
    InvalidCharLiteral { line: usize, col: usize },
    #[error("invalid escape '\\{ch}' at line {line}, col {col}")]
    InvalidEscape { ch: char, line: usize, col: usize },
}

/// Characters that may form symbolic identifiers.
const SYMBOL_CHARS: &str = "!%&$#+-/:<=>?@\\~`^|*";

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.source.get(self.pos + 2).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Position of the most recently consumed character.
    fn end_mark(&self) -> (usize, usize) {
        if self.col > 1 {
            (self.line, self.col - 1)
        } else {
            (self.line, 1)
        }
    }

    fn span_from(&self, start: (usize, usize)) -> Pos {
        let (el, ec) = self.end_mark();
        Pos::new(start.0, start.1, el, ec)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = (self.line, self.col);
            let ch = match self.current() {
                Some(ch) => ch,
                None => {
                    tokens.push(Token::new(TokenKind::Eof, Pos::new(self.line, self.col, self.line, self.col)));
                    return Ok(tokens);
                }
            };
            let kind = if ch.is_ascii_digit() {
                self.lex_number(false)?
            } else if ch == '~' && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
                self.lex_number(true)?
            } else if ch.is_alphabetic() {
                self.lex_word()
            } else if ch == '\'' {
                self.lex_ty_var()?
            } else if ch == '"' {
                self.lex_string(start)?
            } else if ch == '#' && self.peek() == Some('"') {
                self.lex_char(start)?
            } else {
                match ch {
                    '(' => {
                        self.advance();
                        TokenKind::LParen
                    }
                    ')' => {
                        self.advance();
                        TokenKind::RParen
                    }
                    '[' => {
                        self.advance();
                        TokenKind::LBracket
                    }
                    ']' => {
                        self.advance();
                        TokenKind::RBracket
                    }
                    '{' => {
                        self.advance();
                        TokenKind::LBrace
                    }
                    '}' => {
                        self.advance();
                        TokenKind::RBrace
                    }
                    ',' => {
                        self.advance();
                        TokenKind::Comma
                    }
                    ';' => {
                        self.advance();
                        TokenKind::Semi
                    }
                    '_' => {
                        self.advance();
                        TokenKind::Underscore
                    }
                    '.' => {
                        if self.peek() == Some('.') && self.peek2() == Some('.') {
                            self.advance();
                            self.advance();
                            self.advance();
                            TokenKind::Ellipsis
                        } else {
                            return Err(LexError::UnexpectedChar {
                                ch,
                                line: self.line,
                                col: self.col,
                            });
                        }
                    }
                    _ if SYMBOL_CHARS.contains(ch) => self.lex_symbolic(),
                    _ => {
                        return Err(LexError::UnexpectedChar {
                            ch,
                            line: self.line,
                            col: self.col,
                        })
                    }
                }
            };
            let pos = self.span_from(start);
            tokens.push(Token::new(kind, pos));
        }
    }

    /// Skip whitespace and (possibly nested) `(* … *)` comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('(') if self.peek() == Some('*') => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 {
                        match self.current() {
                            Some('(') if self.peek() == Some('*') => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            Some('*') if self.peek() == Some(')') => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => return Err(LexError::UnterminatedComment { line, col }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Numeric literal; the leading `~`, if any, has been consumed.
    fn lex_number(&mut self, negated: bool) -> Result<TokenKind, LexError> {
        let (line, col) = (self.line, self.col);
        let mut digits = String::new();
        if self.current() == Some('0') && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(LexError::InvalidNumber { line, col });
            }
            let mut n = BigInt::from_str_radix(&digits, 16)
                .map_err(|_| LexError::InvalidNumber { line, col })?;
            if negated {
                n = -n;
            }
            return Ok(TokenKind::Int(n));
        }
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let mut is_real = false;
        let mut text = digits;
        if self.current() == Some('.') && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_real = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            let mut k = self.pos + 1;
            let mut exp_neg = false;
            if self.source.get(k) == Some(&'~') {
                exp_neg = true;
                k += 1;
            }
            if self.source.get(k).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_real = true;
                self.advance(); // e
                if exp_neg {
                    self.advance(); // ~
                }
                text.push('e');
                if exp_neg {
                    text.push('-');
                }
                while let Some(c) = self.current() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_real {
            let mut v: f64 = text
                .parse()
                .map_err(|_| LexError::InvalidNumber { line, col })?;
            if negated {
                v = -v;
            }
            Ok(TokenKind::Real(v))
        } else {
            let mut n: BigInt = text
                .parse()
                .map_err(|_| LexError::InvalidNumber { line, col })?;
            if negated {
                n = -n;
            }
            Ok(TokenKind::Int(n))
        }
    }

    /// Alphanumeric identifier or keyword; dotted identifiers (`List.map`)
    /// are joined into a single token.
    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' || c == '\'' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if let Some(kw) = TokenKind::keyword(&word) {
            return kw;
        }
        // Qualified name: ident '.' ident, repeated.
        while self.current() == Some('.')
            && self.peek().map(|c| c.is_alphabetic()).unwrap_or(false)
        {
            self.advance();
            word.push('.');
            while let Some(c) = self.current() {
                if c.is_alphanumeric() || c == '_' || c == '\'' {
                    word.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        TokenKind::Ident(word)
    }

    fn lex_ty_var(&mut self) -> Result<TokenKind, LexError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // '
        let mut name = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(LexError::UnexpectedChar {
                ch: '\'',
                line,
                col,
            });
        }
        Ok(TokenKind::TyVar(name))
    }

    fn lex_string(&mut self, start: (usize, usize)) -> Result<TokenKind, LexError> {
        let body = self.lex_quoted(start)?;
        Ok(TokenKind::Str(body))
    }

    fn lex_char(&mut self, start: (usize, usize)) -> Result<TokenKind, LexError> {
        self.advance(); // #
        let body = self.lex_quoted(start)?;
        let mut chars = body.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(TokenKind::Char(c)),
            _ => Err(LexError::InvalidCharLiteral {
                line: start.0,
                col: start.1,
            }),
        }
    }

    /// The body of a `"…"` literal, with escapes resolved.
    fn lex_quoted(&mut self, start: (usize, usize)) -> Result<String, LexError> {
        self.advance(); // opening quote
        let mut body = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        line: start.0,
                        col: start.1,
                    })
                }
                Some('"') => {
                    self.advance();
                    return Ok(body);
                }
                Some('\\') => {
                    self.advance();
                    let (line, col) = (self.line, self.col);
                    let esc = self.advance().ok_or(LexError::UnterminatedString {
                        line: start.0,
                        col: start.1,
                    })?;
                    match esc {
                        'n' => body.push('\n'),
                        't' => body.push('\t'),
                        'r' => body.push('\r'),
                        'a' => body.push('\u{7}'),
                        'b' => body.push('\u{8}'),
                        'f' => body.push('\u{c}'),
                        'v' => body.push('\u{b}'),
                        '\\' => body.push('\\'),
                        '"' => body.push('"'),
                        c if c.is_ascii_digit() => {
                            let mut code = c.to_digit(10).unwrap();
                            for _ in 0..2 {
                                let d = self
                                    .current()
                                    .and_then(|c| c.to_digit(10))
                                    .ok_or(LexError::InvalidEscape { ch: c, line, col })?;
                                self.advance();
                                code = code * 10 + d;
                            }
                            let c2 = char::from_u32(code)
                                .ok_or(LexError::InvalidEscape { ch: c, line, col })?;
                            body.push(c2);
                        }
                        other => {
                            return Err(LexError::InvalidEscape {
                                ch: other,
                                line,
                                col,
                            })
                        }
                    }
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Maximal munch over the symbol characters, then reclassify the handful
    /// of reserved spellings.
    fn lex_symbolic(&mut self) -> TokenKind {
        let mut sym = String::new();
        while let Some(c) = self.current() {
            if SYMBOL_CHARS.contains(c) {
                sym.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match sym.as_str() {
            "=>" => TokenKind::DoubleArrow,
            "->" => TokenKind::Arrow,
            ":" => TokenKind::Colon,
            "|" => TokenKind::Bar,
            "#" => TokenKind::Hash,
            _ => TokenKind::Symbolic(sym),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut tokens = Lexer::new(source).tokenize().expect("lex failure");
        tokens.pop(); // drop EOF
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 ~2 0xFF ~0x10"),
            vec![
                TokenKind::Int(BigInt::from(1)),
                TokenKind::Int(BigInt::from(-2)),
                TokenKind::Int(BigInt::from(255)),
                TokenKind::Int(BigInt::from(-16)),
            ]
        );
        assert_eq!(
            kinds("1.5 ~2.25 1e3 2.5e~1"),
            vec![
                TokenKind::Real(1.5),
                TokenKind::Real(-2.25),
                TokenKind::Real(1000.0),
                TokenKind::Real(0.25),
            ]
        );
    }

    #[test]
    fn tilde_alone_is_symbolic() {
        assert_eq!(
            kinds("~ x"),
            vec![
                TokenKind::Symbolic("~".to_string()),
                TokenKind::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn symbolic_munch() {
        assert_eq!(
            kinds("a <= b :: c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Symbolic("<=".to_string()),
                TokenKind::Ident("b".to_string()),
                TokenKind::Symbolic("::".to_string()),
                TokenKind::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn qualified_identifier() {
        assert_eq!(
            kinds("List.map"),
            vec![TokenKind::Ident("List.map".to_string())]
        );
    }

    #[test]
    fn selector_and_char() {
        assert_eq!(
            kinds("#a #\"x\" #1"),
            vec![
                TokenKind::Hash,
                TokenKind::Ident("a".to_string()),
                TokenKind::Char('x'),
                TokenKind::Hash,
                TokenKind::Int(BigInt::from(1)),
            ]
        );
    }

    #[test]
    fn nested_comment() {
        assert_eq!(
            kinds("1 (* a (* b *) c *) 2"),
            vec![TokenKind::Int(BigInt::from(1)), TokenKind::Int(BigInt::from(2))]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\\\"""#),
            vec![TokenKind::Str("a\nb\\\"".to_string())]
        );
    }

    #[test]
    fn unterminated_comment_fails() {
        assert!(Lexer::new("(* oops").tokenize().is_err());
    }
}
