//! tokenizer for template expression bodies

use std::fmt;

use super::error::ScriptError;
use super::parser::MAX_DEPTH;

/// punctuators and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    QuestionDot,
    Semicolon,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    Nullish,
    Assign,
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::QuestionDot => "?.",
            Punct::Semicolon => ";",
            Punct::Colon => ":",
            Punct::Question => "?",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Bang => "!",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::EqEqEq => "===",
            Punct::NotEqEq => "!==",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Nullish => "??",
            Punct::Assign => "=",
        };
        write!(f, "{}", s)
    }
}

/// a lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    String(String),
    /// template literal: cooked string chunks and the raw source of each `${...}`
    Template {
        quasis: Vec<String>,
        exprs: Vec<String>,
    },
    Ident(String),
    Punct(Punct),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::String(_) => write!(f, "string"),
            Token::Template { .. } => write!(f, "template string"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Punct(p) => write!(f, "{}", p),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// token with its character offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
    /// a line break separates this token from the previous one
    pub newline_before: bool,
}

/// split an expression body into tokens, ending with [`Token::Eof`]
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ScriptError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        nesting: 0,
    };
    let mut tokens = Vec::new();

    loop {
        let newline_before = lexer.skip_trivia()?;
        let offset = lexer.pos;
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(Spanned {
            token,
            offset,
            newline_before,
        });
        if done {
            return Ok(tokens);
        }
    }
}

fn invalid_token() -> ScriptError {
    ScriptError::syntax("Invalid or unexpected token")
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    /// template literals currently open
    nesting: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// skip whitespace and comments, reporting whether a line break was crossed
    fn skip_trivia(&mut self) -> Result<bool, ScriptError> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    newline |= c == '\n';
                    self.pos += 1;
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            Some('*') if self.eat('/') => break,
                            Some(c) => newline |= c == '\n',
                            None => return Err(invalid_token()),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ScriptError> {
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return self.read_number();
        }
        if is_ident_start(c) {
            let start = self.pos;
            while self.peek().is_some_and(is_ident_part) {
                self.pos += 1;
            }
            return Ok(Token::Ident(self.chars[start..self.pos].iter().collect()));
        }
        if c == '\'' || c == '"' {
            self.pos += 1;
            return self.read_string(c).map(Token::String);
        }
        if c == '`' {
            self.pos += 1;
            let (quasis, exprs) = self.read_template()?;
            return Ok(Token::Template { quasis, exprs });
        }

        self.pos += 1;
        let punct = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            ',' => Punct::Comma,
            '.' => Punct::Dot,
            ';' => Punct::Semicolon,
            ':' => Punct::Colon,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '?' => {
                if self.eat('?') {
                    Punct::Nullish
                } else if self.peek() == Some('.')
                    && !self.peek_at(1).is_some_and(|n| n.is_ascii_digit())
                {
                    self.pos += 1;
                    Punct::QuestionDot
                } else {
                    Punct::Question
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Punct::NotEqEq
                    } else {
                        Punct::NotEq
                    }
                } else {
                    Punct::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Punct::EqEqEq
                    } else {
                        Punct::EqEq
                    }
                } else {
                    Punct::Assign
                }
            }
            '<' => {
                if self.eat('=') {
                    Punct::Le
                } else {
                    Punct::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Punct::Ge
                } else {
                    Punct::Gt
                }
            }
            '&' if self.eat('&') => Punct::AndAnd,
            '|' if self.eat('|') => Punct::OrOr,
            _ => return Err(invalid_token()),
        };
        Ok(Token::Punct(punct))
    }

    fn read_number(&mut self) -> Result<Token, ScriptError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            let value = u64::from_str_radix(&digits, 16).map_err(|_| invalid_token())?;
            self.reject_ident_suffix()?;
            return Ok(Token::Number(value as f64));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        self.reject_ident_suffix()?;
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| invalid_token())
    }

    // `3in` or `1abc` is not a number followed by an identifier
    fn reject_ident_suffix(&self) -> Result<(), ScriptError> {
        if self.peek().is_some_and(is_ident_start) {
            Err(invalid_token())
        } else {
            Ok(())
        }
    }

    /// read a quoted string, the opening quote already consumed
    fn read_string(&mut self, quote: char) -> Result<String, ScriptError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(invalid_token()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    if let Some(c) = self.read_escape()? {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// read a template literal, the opening backtick already consumed
    fn read_template(&mut self) -> Result<(Vec<String>, Vec<String>), ScriptError> {
        if self.nesting >= MAX_DEPTH {
            return Err(ScriptError::syntax("Expression nested too deeply"));
        }
        self.nesting += 1;
        let result = self.read_template_parts();
        self.nesting -= 1;
        result
    }

    fn read_template_parts(&mut self) -> Result<(Vec<String>, Vec<String>), ScriptError> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();

        loop {
            match self.bump() {
                None => return Err(ScriptError::syntax("Unterminated template literal")),
                Some('`') => {
                    quasis.push(current);
                    return Ok((quasis, exprs));
                }
                Some('\\') => {
                    if let Some(c) = self.read_escape()? {
                        current.push(c);
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    self.pos += 1;
                    quasis.push(std::mem::take(&mut current));
                    exprs.push(self.read_substitution()?);
                }
                Some(c) => current.push(c),
            }
        }
    }

    /// raw source of a `${...}` substitution, up to the matching brace
    fn read_substitution(&mut self) -> Result<String, ScriptError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            match c {
                '{' => {
                    depth += 1;
                    self.pos += 1;
                }
                '}' if depth == 0 => {
                    let source = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    return Ok(source);
                }
                '}' => {
                    depth -= 1;
                    self.pos += 1;
                }
                '\'' | '"' => {
                    self.pos += 1;
                    self.read_string(c)?;
                }
                '`' => {
                    self.pos += 1;
                    self.read_template()?;
                }
                _ => self.pos += 1,
            }
        }

        Err(ScriptError::syntax("Unterminated template literal"))
    }

    /// read an escape sequence after a backslash; line continuations yield nothing
    fn read_escape(&mut self) -> Result<Option<char>, ScriptError> {
        let c = self.bump().ok_or_else(invalid_token)?;
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !self.peek().is_some_and(|n| n.is_ascii_digit()) => '\0',
            '\n' => return Ok(None),
            'x' => {
                let code = self.read_hex_digits(2)?;
                char::from_u32(code).ok_or_else(invalid_token)?
            }
            'u' => {
                let code = if self.eat('{') {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let digits: String = self.chars[start..self.pos].iter().collect();
                    if !self.eat('}') {
                        return Err(invalid_token());
                    }
                    u32::from_str_radix(&digits, 16).map_err(|_| invalid_token())?
                } else {
                    self.read_hex_digits(4)?
                };
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            other => other,
        };
        Ok(Some(escaped))
    }

    fn read_hex_digits(&mut self, count: usize) -> Result<u32, ScriptError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(invalid_token)?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}
