use crate::token::{Token, TokenKind, lookup_ident};

pub struct Scanner<'a> {
    chars: std::str::Chars<'a>,
    current: Option<char>,
    peek: Option<char>,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        let peek = chars.next();
        Self {
            chars,
            current,
            peek,
            line: 1,
            column: 1,
        }
    }

    /// Drains the whole input. The final token is always `Eof`.
    pub fn tokens(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) {
        if self.current == Some('\n') {
            self.line += 1;
            self.column = 0;
        }
        self.current = self.peek;
        self.peek = self.chars.next();
        self.column += 1;
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let Some(ch) = self.current else {
            return Token::new(TokenKind::Eof, "", line, column);
        };

        let kind = match ch {
            '"' | '\'' => return self.read_string(ch, line, column),
            '=' => self.pick('=', TokenKind::Eq, TokenKind::Assign),
            '!' => self.pick('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.pick('=', TokenKind::LtEq, TokenKind::Lt),
            '>' => self.pick('=', TokenKind::GtEq, TokenKind::Gt),
            ':' => self.pick('=', TokenKind::Declare, TokenKind::Colon),
            '+' => {
                if self.peek == Some('=') {
                    self.advance();
                    TokenKind::PlusAssign
                } else if self.peek == Some('+') {
                    self.advance();
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek == Some('=') {
                    self.advance();
                    TokenKind::MinusAssign
                } else if self.peek == Some('-') {
                    self.advance();
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '&' => {
                if self.peek == Some('&') {
                    self.advance();
                    TokenKind::And
                } else {
                    TokenKind::Illegal
                }
            }
            '|' => {
                if self.peek == Some('|') {
                    self.advance();
                    TokenKind::Or
                } else {
                    TokenKind::Illegal
                }
            }
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            _ => {
                if is_ident_start(ch) {
                    return self.read_identifier(line, column);
                }
                if ch.is_ascii_digit() {
                    return self.read_number(line, column);
                }
                TokenKind::Illegal
            }
        };

        let literal = match kind {
            TokenKind::Illegal => ch.to_string(),
            _ => kind.describe().to_string(),
        };
        self.advance();
        Token::new(kind, literal, line, column)
    }

    fn pick(&mut self, second: char, long: TokenKind, short: TokenKind) -> TokenKind {
        if self.peek == Some(second) {
            self.advance();
            long
        } else {
            short
        }
    }

    fn read_identifier(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current {
            if is_ident_continue(ch) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let kind = lookup_ident(&text);
        Token::new(kind, text, line, column)
    }

    fn read_number(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        let mut dot_seen = false;
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
                continue;
            }
            // Consume the dot only when a digit follows, so `x.y` stays
            // member access.
            if ch == '.' && !dot_seen && self.peek.is_some_and(|p| p.is_ascii_digit()) {
                dot_seen = true;
                text.push(ch);
                self.advance();
                continue;
            }
            break;
        }
        let kind = if dot_seen {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        Token::new(kind, text, line, column)
    }

    fn read_string(&mut self, quote: char, line: u32, column: u32) -> Token {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.current {
                None | Some('\n') => {
                    return Token::new(TokenKind::Illegal, quote.to_string(), line, column);
                }
                Some('\\') => {
                    self.advance();
                    let Some(escape) = self.current else {
                        return Token::new(TokenKind::Illegal, quote.to_string(), line, column);
                    };
                    match escape {
                        'n' => text.push('\n'),
                        'r' => text.push('\r'),
                        't' => text.push('\t'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        '\'' => text.push('\''),
                        'x' => {
                            self.advance();
                            let hi = self.current.and_then(from_hex);
                            self.advance();
                            let lo = self.current.and_then(from_hex);
                            let (Some(hi), Some(lo)) = (hi, lo) else {
                                return Token::new(
                                    TokenKind::Illegal,
                                    "x".to_string(),
                                    line,
                                    column,
                                );
                            };
                            text.push((hi << 4 | lo) as char);
                        }
                        other => {
                            return Token::new(
                                TokenKind::Illegal,
                                other.to_string(),
                                line,
                                column,
                            );
                        }
                    }
                    self.advance();
                }
                Some(ch) if ch == quote => {
                    self.advance(); // closing quote
                    return Token::new(TokenKind::Str, text, line, column);
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.current, Some(' ' | '\t' | '\r' | '\n')) {
                self.advance();
            }
            if self.current == Some('/') {
                match self.peek {
                    Some('/') => {
                        while self.current.is_some() && self.current != Some('\n') {
                            self.advance();
                        }
                        continue;
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        loop {
                            match self.current {
                                None => return,
                                Some('*') if self.peek == Some('/') => {
                                    self.advance();
                                    self.advance();
                                    break;
                                }
                                _ => self.advance(),
                            }
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            return;
        }
    }
}

pub fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

pub fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn from_hex(ch: char) -> Option<u8> {
    match ch {
        '0'..='9' => Some(ch as u8 - b'0'),
        'a'..='f' => Some(ch as u8 - b'a' + 10),
        'A'..='F' => Some(ch as u8 - b'A' + 10),
        _ => None,
    }
}
