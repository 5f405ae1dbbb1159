use std::{collections::HashMap, iter::Peekable, str::Chars};

use once_cell::sync::Lazy;
use strum_macros::Display;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    String,
    Number,

    // Keywords.
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error,
    Eof,
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf::phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    token_type: Option<TokenType>,
}

/// Keyword trie: the first character selects a branch, the rest of the
/// lexeme must then match that branch's suffix exactly.
static TRIE_ROOT: Lazy<TrieNode> = Lazy::new(|| {
    let mut root = TrieNode::default();
    for (keyword, token_type) in KEYWORDS.entries() {
        let mut node = &mut root;
        for c in keyword.chars() {
            node = node.children.entry(c).or_default();
        }
        node.token_type = Some(*token_type);
    }
    root
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub token_type: TokenType,
    /// The lexeme, or the diagnostic message for `TokenType::Error`.
    pub value: &'a str,
    pub line: usize,
}

impl<'a> Token<'a> {
    /// A token that does not come from the source, e.g. the implicit `this` / `super` locals.
    pub fn synthetic(value: &'a str) -> Self {
        Token { token_type: TokenType::Identifier, value, line: 0 }
    }
}

pub struct Scanner<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    start: usize,
    current: usize,
    line: usize,
    reached_eof: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            chars: source.chars().peekable(),
            start: 0,
            current: 0,
            line: 1,
            reached_eof: false,
        }
    }

    /// Produces the next token. Once the input is exhausted every call returns `Eof`.
    pub fn scan_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_end() {
            return self.make_token(TokenType::Eof);
        }

        let c = self.advance();

        if Self::is_alpha(c) {
            return self.make_identifier_token();
        }

        if Self::is_digit(c) {
            return self.make_number_token();
        }

        match c {
            '(' => self.make_token(TokenType::LeftParen),
            ')' => self.make_token(TokenType::RightParen),
            '{' => self.make_token(TokenType::LeftBrace),
            '}' => self.make_token(TokenType::RightBrace),
            ';' => self.make_token(TokenType::Semicolon),
            ',' => self.make_token(TokenType::Comma),
            '.' => self.make_token(TokenType::Dot),
            '-' => self.make_token(TokenType::Minus),
            '+' => self.make_token(TokenType::Plus),
            '/' => self.make_token(TokenType::Slash),
            '*' => self.make_token(TokenType::Star),
            '"' => self.make_string_token(),
            '!' => self.make_two_char_token('=', TokenType::BangEqual, TokenType::Bang),
            '=' => self.make_two_char_token('=', TokenType::EqualEqual, TokenType::Equal),
            '<' => self.make_two_char_token('=', TokenType::LessEqual, TokenType::Less),
            '>' => self.make_two_char_token('=', TokenType::GreaterEqual, TokenType::Greater),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    fn is_alpha(ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_'
    }

    fn make_two_char_token(&mut self, expected: char, matched: TokenType, single: TokenType) -> Token<'a> {
        if self.match_char(expected) {
            self.make_token(matched)
        } else {
            self.make_token(single)
        }
    }

    fn make_identifier_token(&mut self) -> Token<'a> {
        while let Some(&c) = self.peek() {
            if !Self::is_alpha(c) && !Self::is_digit(c) {
                break;
            }
            self.advance();
        }
        let token_type = self.identifier_type();
        self.make_token(token_type)
    }

    fn identifier_type(&self) -> TokenType {
        let mut node: &TrieNode = &TRIE_ROOT;
        for ch in self.source[self.start..self.current].chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return TokenType::Identifier,
            }
        }
        node.token_type.unwrap_or(TokenType::Identifier)
    }

    fn make_number_token(&mut self) -> Token<'a> {
        self.consume_digits();

        // A fractional part needs at least one digit after the '.'.
        if let (Some('.'), Some(next)) = (self.peek().copied(), self.peek_next()) {
            if Self::is_digit(next) {
                self.advance();
                self.consume_digits();
            }
        }

        self.make_token(TokenType::Number)
    }

    fn consume_digits(&mut self) {
        while let Some(&c) = self.peek() {
            if !Self::is_digit(c) {
                break;
            }
            self.advance();
        }
    }

    fn make_string_token(&mut self) -> Token<'a> {
        loop {
            match self.peek() {
                None => return self.error_token("Unterminated string."),
                Some('"') => break,
                Some('\n') => {
                    self.line += 1;
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        // the closing quote
        self.advance();
        self.make_token(TokenType::String)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match (self.peek().copied(), self.peek_next()) {
                (Some('\n'), _) => {
                    self.line += 1;
                    self.advance();
                }
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(&ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn is_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn make_token(&self, token_type: TokenType) -> Token<'a> {
        Token {
            token_type,
            value: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, reason: &'static str) -> Token<'a> {
        Token {
            token_type: TokenType::Error,
            value: reason,
            line: self.line,
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(&expected) {
            self.advance();
            return true;
        }
        false
    }

    fn advance(&mut self) -> char {
        match self.chars.next() {
            Some(next_char) => {
                self.current += next_char.len_utf8();
                next_char
            }
            None => '\0',
        }
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reached_eof {
            return None;
        }
        let token = self.scan_token();
        if token.token_type == TokenType::Eof {
            self.reached_eof = true;
        }
        Some(token)
    }
}
