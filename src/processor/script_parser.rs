//! Recursive-descent parser that consumes the lexer and builds the call tree.

use super::ast::{Block, Call, Script};
use super::lexer::{Lexer, Spanned, Token};
use crate::error::ConfigurationError;
use crate::model::{Map, Value};

/// Parses a whole script into its top-level calls.
pub fn parse_script(src: &str) -> Result<Script, ConfigurationError> {
    let mut p = Parser::new(src);
    let calls = p.parse_body(Terminator::Eof)?;
    Ok(Script { calls })
}

/// What closes the statement list currently being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Eof,
    Brace,
    End,
}

impl Terminator {
    fn matches(self, token: &Token) -> bool {
        match self {
            Terminator::Eof => *token == Token::Eof,
            Terminator::Brace => *token == Token::RBrace,
            Terminator::End => matches!(token, Token::Ident(id) if id == "end"),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Terminator::Eof => "end of script",
            Terminator::Brace => "`}`",
            Terminator::End => "`end`",
        }
    }
}

/// Deepest allowed nesting of blocks, lists and mappings combined.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    lex: std::iter::Peekable<Lexer<'a>>,
    line: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lex: Lexer::new(src).peekable(),
            line: 1,
            depth: 0,
        }
    }

    fn peek(&mut self) -> Result<Token, ConfigurationError> {
        match self.lex.peek() {
            Some(Ok(s)) => Ok(s.token.clone()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Token::Eof),
        }
    }

    fn peek_line(&mut self) -> usize {
        match self.lex.peek() {
            Some(Ok(s)) => s.line,
            _ => self.line,
        }
    }

    fn advance(&mut self) -> Result<Spanned, ConfigurationError> {
        match self.lex.next() {
            Some(Ok(s)) => {
                self.line = s.line;
                Ok(s)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Spanned {
                token: Token::Eof,
                line: self.line,
            }),
        }
    }

    fn unexpected(&self, found: &Token, line: usize, expected: &str) -> ConfigurationError {
        ConfigurationError::at(format!("expected {expected}, found {found}"), line)
    }

    fn expect(&mut self, token: Token) -> Result<(), ConfigurationError> {
        let next = self.advance()?;
        if next.token != token {
            return Err(self.unexpected(&next.token, next.line, &token.to_string()));
        }
        Ok(())
    }

    fn enter(&mut self, line: usize) -> Result<(), ConfigurationError> {
        if self.depth >= MAX_DEPTH {
            return Err(ConfigurationError::at("nesting too deep", line));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_newlines(&mut self) -> Result<(), ConfigurationError> {
        while self.peek()? == Token::Newline {
            self.advance()?;
        }
        Ok(())
    }

    fn skip_separators(&mut self) -> Result<(), ConfigurationError> {
        while matches!(self.peek()?, Token::Newline | Token::Semicolon) {
            self.advance()?;
        }
        Ok(())
    }

    /// Statement list up to (not including) `end`.
    fn parse_body(&mut self, end: Terminator) -> Result<Vec<Call>, ConfigurationError> {
        let mut calls = Vec::new();
        loop {
            self.skip_separators()?;
            let next = self.peek()?;
            if end.matches(&next) {
                return Ok(calls);
            }
            if next == Token::Eof {
                return Err(ConfigurationError::at(
                    format!("unexpected end of script, expected {}", end.describe()),
                    self.peek_line(),
                ));
            }

            let call = self.parse_call()?;

            let after = self.peek()?;
            if !matches!(after, Token::Newline | Token::Semicolon) && !end.matches(&after) {
                let line = self.peek_line();
                return Err(ConfigurationError::at(
                    format!("unexpected {after} after `{}`", call.keyword),
                    line,
                ));
            }
            calls.push(call);
        }
    }

    fn parse_call(&mut self) -> Result<Call, ConfigurationError> {
        let head = self.advance()?;
        let name = match head.token {
            Token::Ident(id) if id != "end" && id != "do" => id,
            other => return Err(self.unexpected(&other, head.line, "a keyword")),
        };

        let mut call = if self.peek()? == Token::Dot {
            self.advance()?;
            let kw = self.advance()?;
            match kw.token {
                Token::Ident(keyword) => {
                    let mut call = Call::new(keyword, head.line);
                    call.receiver = Some(name);
                    call
                }
                other => return Err(self.unexpected(&other, kw.line, "a keyword after `.`")),
            }
        } else {
            Call::new(name, head.line)
        };

        let mut parens = false;
        let next = self.peek()?;
        if next == Token::LParen {
            self.advance()?;
            parens = true;
            call.args = self.parse_args(true)?;
            self.expect(Token::RParen)?;
        } else if starts_argument(&next) {
            call.args = self.parse_args(false)?;
        }

        match self.peek()? {
            Token::LBrace => {
                self.advance()?;
                call.block = Some(self.parse_block(Terminator::Brace)?);
            }
            Token::Ident(id) if id == "do" => {
                self.advance()?;
                call.block = Some(self.parse_block(Terminator::End)?);
            }
            _ => {}
        }

        call.bare = !parens && call.args.is_empty() && call.block.is_none();
        Ok(call)
    }

    fn parse_block(&mut self, end: Terminator) -> Result<Block, ConfigurationError> {
        self.enter(self.line)?;
        let mut block = Block::default();
        if self.peek()? == Token::Pipe {
            self.advance()?;
            let param = self.advance()?;
            match param.token {
                Token::Ident(id) => block.param = Some(id),
                other => return Err(self.unexpected(&other, param.line, "a block parameter")),
            }
            self.expect(Token::Pipe)?;
        }
        block.body = self.parse_body(end)?;
        // the terminator itself
        self.advance()?;
        self.leave();
        Ok(block)
    }

    /// Positional values, then optional trailing `key => value` pairs which
    /// fold into one mapping argument.
    fn parse_args(&mut self, parens: bool) -> Result<Vec<Value>, ConfigurationError> {
        let mut args = Vec::new();
        let mut pairs: Option<Map> = None;

        if parens {
            self.skip_newlines()?;
            if self.peek()? == Token::RParen {
                return Ok(args);
            }
        }

        loop {
            if parens {
                self.skip_newlines()?;
            }
            if let Token::Label(key) = self.peek()? {
                self.advance()?;
                let value = self.parse_value()?;
                pairs.get_or_insert_with(Map::new).insert(key, value);
            } else {
                let line = self.peek_line();
                let value = self.parse_value()?;
                if self.peek()? == Token::FatArrow {
                    self.advance()?;
                    let v = self.parse_value()?;
                    pairs.get_or_insert_with(Map::new).insert(value.to_string(), v);
                } else if pairs.is_some() {
                    return Err(ConfigurationError::at(
                        "positional argument after `key => value` pairs",
                        line,
                    ));
                } else {
                    args.push(value);
                }
            }
            if parens {
                self.skip_newlines()?;
            }
            if self.peek()? != Token::Comma {
                break;
            }
            self.advance()?;
            self.skip_newlines()?;
        }

        if let Some(map) = pairs {
            args.push(Value::Map(map));
        }
        Ok(args)
    }

    fn parse_value(&mut self) -> Result<Value, ConfigurationError> {
        let next = self.advance()?;
        let value = match next.token {
            Token::Str(s) | Token::Symbol(s) => Value::Str(s),
            Token::Int(i) => Value::Int(i),
            Token::Float(x) => Value::Float(x),
            Token::Ident(id) => match id.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "nil" => Value::Null,
                _ => {
                    tracing::debug!(name = %id, line = next.line, "bare identifier used as value");
                    Value::Str(id)
                }
            },
            Token::LBracket => {
                self.enter(next.line)?;
                let items = self.parse_list()?;
                self.leave();
                Value::List(items)
            }
            Token::LBrace => {
                self.enter(next.line)?;
                let map = self.parse_map()?;
                self.leave();
                Value::Map(map)
            }
            other => return Err(self.unexpected(&other, next.line, "a value")),
        };
        Ok(value)
    }

    fn parse_list(&mut self) -> Result<Vec<Value>, ConfigurationError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.peek()? == Token::RBracket {
                self.advance()?;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_newlines()?;
            match self.peek()? {
                Token::Comma => {
                    self.advance()?;
                }
                Token::RBracket => {}
                other => {
                    let line = self.peek_line();
                    return Err(self.unexpected(&other, line, "`,` or `]`"));
                }
            }
        }
    }

    fn parse_map(&mut self) -> Result<Map, ConfigurationError> {
        let mut map = Map::new();
        loop {
            self.skip_newlines()?;
            let key = match self.peek()? {
                Token::RBrace => {
                    self.advance()?;
                    return Ok(map);
                }
                Token::Label(key) => {
                    self.advance()?;
                    key
                }
                _ => {
                    let key = self.parse_value()?.to_string();
                    self.expect(Token::FatArrow)?;
                    key
                }
            };
            self.skip_newlines()?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_newlines()?;
            match self.peek()? {
                Token::Comma => {
                    self.advance()?;
                }
                Token::RBrace => {}
                other => {
                    let line = self.peek_line();
                    return Err(self.unexpected(&other, line, "`,` or `}`"));
                }
            }
        }
    }
}

/// Tokens that may open a paren-less argument list. `{` is excluded: after
/// a call head it always opens a block.
fn starts_argument(token: &Token) -> bool {
    match token {
        Token::Str(_)
        | Token::Int(_)
        | Token::Float(_)
        | Token::Symbol(_)
        | Token::Label(_)
        | Token::LBracket => true,
        Token::Ident(id) => id != "do" && id != "end",
        _ => false,
    }
}
