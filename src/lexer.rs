//lexer.rs - converts config text into tokens
//never stops on bad input: problems are recorded as diagnostics and
//scanning keeps going, the caller decides what to do with them

use std::fmt;

use crate::error::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcLocation {
    pub line: usize,
    pub col: usize,
}

impl SrcLocation {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for SrcLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    Char(char), //any punctuation the parser interprets: ( ) [ ] { } , : .
    Eof,
    Identifier(String),
    Operator(char), //+ - * / % =
    Separator,      //;
    ObjType,
    Control,
    Renderer,
    Force,
    Number(f64),
    Color(u32),
    Str(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Char(c) => write!(f, "'{}'", c),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenKind::Operator(op) => write!(f, "operator '{}'", op),
            TokenKind::Separator => write!(f, "';'"),
            TokenKind::ObjType => write!(f, "keyword `objtype`"),
            TokenKind::Control => write!(f, "keyword `control`"),
            TokenKind::Renderer => write!(f, "keyword `renderer`"),
            TokenKind::Force => write!(f, "keyword `force`"),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Color(c) => write!(f, "color #{:06x}", c),
            TokenKind::Str(s) => write!(f, "string {:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SrcLocation,
}

impl Token {
    pub fn is_char(&self, c: char) -> bool {
        self.kind == TokenKind::Char(c)
    }
}

const KEYWORDS: [(&str, TokenKind); 4] = [
    ("objtype", TokenKind::ObjType),
    ("control", TokenKind::Control),
    ("renderer", TokenKind::Renderer),
    ("force", TokenKind::Force),
];

const OPERATORS: [char; 6] = ['+', '-', '*', '/', '%', '='];

const ESCAPES: [(char, char); 11] = [
    ('a', '\x07'),
    ('b', '\x08'),
    ('e', '\x1b'),
    ('f', '\x0c'),
    ('n', '\n'),
    ('r', '\r'),
    ('t', '\t'),
    ('v', '\x0b'),
    ('\\', '\\'),
    ('\'', '\''),
    ('"', '"'),
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    loc: SrcLocation,
    //true when the previous token can end an operand, so a following '-' is subtraction
    after_operand: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            loc: SrcLocation::new(1, 1),
            after_operand: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn had_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.loc.line += 1;
            self.loc.col = 1;
        } else {
            self.loc.col += 1;
        }
        Some(c)
    }

    //whitespace and // line comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let start = self.loc;

        let Some(c) = self.peek() else {
            return Token { kind: TokenKind::Eof, loc: start };
        };

        let kind = match c {
            c if c.is_ascii_alphabetic() => self.identifier(),
            '0'..='9' | '.' => self.number(start),
            '-' if !self.after_operand
                && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit() || d == '.') =>
            {
                self.number(start)
            }
            '#' => self.color(start),
            ';' => {
                self.bump();
                TokenKind::Separator
            }
            '"' => self.string(start),
            c if OPERATORS.contains(&c) => {
                self.bump();
                TokenKind::Operator(c)
            }
            c => {
                self.bump();
                TokenKind::Char(c)
            }
        };

        self.after_operand = matches!(
            kind,
            TokenKind::Identifier(_)
                | TokenKind::Number(_)
                | TokenKind::Color(_)
                | TokenKind::Str(_)
                | TokenKind::Char(')')
                | TokenKind::Char(']')
                | TokenKind::Char('}')
        );

        Token { kind, loc: start }
    }

    fn identifier(&mut self) -> TokenKind {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }

        for (word, kind) in KEYWORDS.iter() {
            if ident == *word {
                return kind.clone();
            }
        }
        TokenKind::Identifier(ident)
    }

    fn number(&mut self, start: SrcLocation) -> TokenKind {
        let mut buf = String::new();
        if self.peek() == Some('-') {
            buf.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                buf.push(c);
                self.bump();
            } else {
                break;
            }
        }

        match buf.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            //a lone dot is member access, not a broken number
            Err(_) if buf == "." => TokenKind::Char('.'),
            Err(_) => {
                self.error(Diagnostic::new(format!("lexer: unable to parse number `{}`", buf), start));
                TokenKind::Number(0.0)
            }
        }
    }

    fn color(&mut self, start: SrcLocation) -> TokenKind {
        self.bump();
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_hexdigit() {
                buf.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if buf.len() != 6 {
            self.error(
                Diagnostic::new("lexer: invalid color literal", start)
                    .with_fix("colors are written as #RRGGBB"),
            );
            return TokenKind::Color(0);
        }
        match u32::from_str_radix(&buf, 16) {
            Ok(v) => TokenKind::Color(v),
            Err(_) => {
                self.error(Diagnostic::new("lexer: invalid color literal", start));
                TokenKind::Color(0)
            }
        }
    }

    //escapes produce bytes; bytes are kept as the matching latin-1 char
    fn string(&mut self, start: SrcLocation) -> TokenKind {
        self.bump();
        let mut buf = String::new();

        loop {
            let Some(c) = self.bump() else {
                self.error(Diagnostic::new(
                    "lexer: unexpected end of input while parsing string literal",
                    start,
                ));
                return TokenKind::Str(buf);
            };

            match c {
                '"' => return TokenKind::Str(buf),
                '\\' => {
                    let esc_loc = self.loc;
                    let Some(e) = self.bump() else {
                        self.error(Diagnostic::new(
                            "lexer: unexpected end of input while parsing escape sequence",
                            start,
                        ));
                        return TokenKind::Str(buf);
                    };
                    match e {
                        '0'..='7' => {
                            let mut val = e as u32 - '0' as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ '0'..='7') => {
                                        val = (val << 3) + (d as u32 - '0' as u32);
                                        self.bump();
                                    }
                                    _ => break,
                                }
                            }
                            if val > i8::MAX as u32 {
                                self.error(Diagnostic::new("lexer: octal literal value overflow", esc_loc));
                            }
                            buf.push(char::from(val as u8));
                        }
                        'x' => {
                            let mut val: u8 = 0;
                            for _ in 0..2 {
                                match self.peek().and_then(|d| d.to_digit(16)) {
                                    Some(d) => {
                                        val = (val << 4) + d as u8;
                                        self.bump();
                                    }
                                    None => {
                                        let loc = self.loc;
                                        self.error(Diagnostic::new("lexer: invalid character in hex escape", loc));
                                        break;
                                    }
                                }
                            }
                            buf.push(char::from(val));
                        }
                        e => match ESCAPES.iter().find(|(k, _)| *k == e) {
                            Some((_, v)) => buf.push(*v),
                            None => self.error(Diagnostic::new(
                                format!("lexer: unrecognized character `{}` in escape sequence", e),
                                esc_loc,
                            )),
                        },
                    }
                }
                c if c == '\t' || !c.is_control() => buf.push(c),
                _ => {
                    let loc = self.loc;
                    self.error(Diagnostic::new("lexer: unrecognized character in string literal", loc));
                }
            }
        }
    }
}
