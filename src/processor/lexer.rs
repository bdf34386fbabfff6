//! Hand-written lexer for configuration scripts.
//!
//! The lexer only breaks the source into `Token`s and stamps each one with
//! its 1-based line. No keywords are recognised here: `web`, `do`, `end`
//! all come out as `Ident`. The parser gives them meaning.
//
//  Lexical items:
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]* ('::' Ident)*
//      Label    ::= Ident ':'            (not followed by another ':')
//      Symbol   ::= ':' Ident
//      Str      ::= '"' … '"' | '\'' … '\''   (\n \t \\ \" \' escapes)
//      Int      ::= '-'? [0-9]+
//      Float    ::= '-'? [0-9]+ '.' [0-9]+
//      Symbols  ::= ( ) { } [ ] , . | => ;
//      Newlines are tokens; other whitespace and `#` comments are dropped.

use crate::error::ConfigurationError;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Label(String),
    Symbol(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Pipe,
    FatArrow,
    Semicolon,
    Newline,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::Label(s) => write!(f, "`{s}:`"),
            Token::Symbol(s) => write!(f, "`:{s}`"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Int(i) => write!(f, "`{i}`"),
            Token::Float(x) => write!(f, "`{x}`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBrace => f.write_str("`{`"),
            Token::RBrace => f.write_str("`}`"),
            Token::LBracket => f.write_str("`[`"),
            Token::RBracket => f.write_str("`]`"),
            Token::Comma => f.write_str("`,`"),
            Token::Dot => f.write_str("`.`"),
            Token::Pipe => f.write_str("`|`"),
            Token::FatArrow => f.write_str("`=>`"),
            Token::Semicolon => f.write_str("`;`"),
            Token::Newline => f.write_str("end of line"),
            Token::Eof => f.write_str("end of script"),
        }
    }
}

/// A token together with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            finished: false,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Looks one character past `peek_char`.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ConfigurationError {
        ConfigurationError::at(message, self.line)
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        loop {
            self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut id);
            // constant paths: Outer::Inner
            let joined = self.peek_char() == Some(':')
                && self.peek_second() == Some(':')
                && {
                    let mut ahead = self.chars.clone();
                    ahead.nth(1);
                    ahead.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                };
            if !joined {
                return id;
            }
            self.next_char();
            self.next_char();
            id.push_str("::");
        }
    }

    fn read_number(&mut self, first: char, negative: bool) -> Result<Token, ConfigurationError> {
        let mut num = String::new();
        if negative {
            num.push('-');
        }
        num.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut num);

        let is_float =
            self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            num.push('.');
            self.next_char();
            self.consume_while(|c| c.is_ascii_digit(), &mut num);
            return num
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|e| self.error(format!("invalid number {num}: {e}")));
        }

        num.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.error(format!("integer out of range: {num}")))
    }

    fn read_string(&mut self, quote: char) -> Result<String, ConfigurationError> {
        let start = self.line;
        let mut txt = String::new();
        while let Some(c) = self.next_char() {
            match c {
                c if c == quote => return Ok(txt),
                '\\' => {
                    let escaped = match self.next_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => break,
                    };
                    txt.push(escaped);
                }
                '\n' => {
                    self.line += 1;
                    txt.push(c);
                }
                c => txt.push(c),
            }
        }
        Err(ConfigurationError::at(
            format!("unterminated string, no closing {quote} found"),
            start,
        ))
    }

    fn skip_blank(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.next_char();
                }
                '#' => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.next_char();
                    }
                }
                _ => break,
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Spanned, ConfigurationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_blank();
        let line = self.line;

        let ch = match self.next_char() {
            Some(c) => c,
            None => {
                self.finished = true;
                return Some(Ok(Spanned {
                    token: Token::Eof,
                    line,
                }));
            }
        };

        let tok_res = match ch {
            '\n' => {
                self.line += 1;
                Ok(Token::Newline)
            }
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '{' => Ok(Token::LBrace),
            '}' => Ok(Token::RBrace),
            '[' => Ok(Token::LBracket),
            ']' => Ok(Token::RBracket),
            ',' => Ok(Token::Comma),
            '.' => Ok(Token::Dot),
            '|' => Ok(Token::Pipe),
            ';' => Ok(Token::Semicolon),
            '=' if self.peek_char() == Some('>') => {
                self.next_char();
                Ok(Token::FatArrow)
            }
            ':' => match self.next_char() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    Ok(Token::Symbol(self.read_identifier(c)))
                }
                _ => Err(self.error("expected a symbol name after ':'")),
            },
            '"' | '\'' => self.read_string(ch).map(Token::Str),
            '-' => match self.next_char() {
                Some(c) if c.is_ascii_digit() => self.read_number(c, true),
                _ => Err(self.error("expected a number after '-'")),
            },
            c if c.is_ascii_digit() => self.read_number(c, false),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let id = self.read_identifier(c);
                if self.peek_char() == Some(':') && self.peek_second() != Some(':') {
                    self.next_char();
                    Ok(Token::Label(id))
                } else {
                    Ok(Token::Ident(id))
                }
            }
            e => Err(self.error(format!("unexpected character {e:?}"))),
        };

        if tok_res.is_err() {
            self.finished = true;
        }
        Some(tok_res.map(|token| Spanned { token, line }))
    }
}
