//! Tokenizer for formula sources.

use chrono::TimeDelta;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Duration(TimeDelta),
    Ident(String),
    /// `@key`, stored without the `@`.
    Reference(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Token {
    pub fn fragment<'s>(&self, source: &'s str) -> &'s str {
        &source[self.offset..self.offset + self.len]
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split `source` into tokens, ending with a [`TokenKind::End`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    fn peek_at(&self, i: usize) -> Option<u8> {
        self.bytes.get(i).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            offset: start,
            len: self.pos - start,
        });
    }

    fn scan_while(&self, mut i: usize, pred: impl Fn(u8) -> bool) -> usize {
        while self.peek_at(i).is_some_and(&pred) {
            i += 1;
        }
        i
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while let Some(b) = self.peek_at(self.pos) {
            let start = self.pos;
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.peek_at(start + 1) == Some(b'/') => {
                    self.pos = self.scan_while(start, |c| c != b'\n');
                }
                b'+' | b'-' | b'*' | b'/' | b'(' | b')' | b',' => {
                    self.pos += 1;
                    let kind = match b {
                        b'+' => TokenKind::Plus,
                        b'-' => TokenKind::Minus,
                        b'*' => TokenKind::Star,
                        b'/' => TokenKind::Slash,
                        b'(' => TokenKind::LParen,
                        b')' => TokenKind::RParen,
                        _ => TokenKind::Comma,
                    };
                    self.push(kind, start);
                }
                b'@' => {
                    if !self.peek_at(start + 1).is_some_and(is_ident_start) {
                        return Err(ParseError::UnknownToken {
                            fragment: "@".into(),
                            offset: start,
                        });
                    }
                    self.pos = self.scan_while(start + 1, is_ident_continue);
                    let key = self.src[start + 1..self.pos].to_string();
                    self.push(TokenKind::Reference(key), start);
                }
                b'0'..=b'9' => self.number_or_duration(start)?,
                b if is_ident_start(b) => {
                    self.pos = self.scan_while(start, is_ident_continue);
                    let name = self.src[start..self.pos].to_string();
                    self.push(TokenKind::Ident(name), start);
                }
                _ => {
                    let ch = self.src[start..].chars().next().unwrap_or('?');
                    return Err(ParseError::UnknownToken {
                        fragment: ch.to_string(),
                        offset: start,
                    });
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::End,
            offset: self.bytes.len(),
            len: 0,
        });
        Ok(())
    }

    fn number_or_duration(&mut self, start: usize) -> Result<(), ParseError> {
        let mut end = self.scan_while(start, |c| c.is_ascii_digit());
        if self.peek_at(end) == Some(b'.') && self.peek_at(end + 1).is_some_and(|c| c.is_ascii_digit()) {
            end = self.scan_while(end + 1, |c| c.is_ascii_digit());
        }
        if self.peek_at(end).is_some_and(is_ident_start) {
            return self.duration(start);
        }
        let text = &self.src[start..end];
        let value: f64 = text.parse().map_err(|_| ParseError::UnknownToken {
            fragment: text.to_string(),
            offset: start,
        })?;
        self.pos = end;
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn malformed(&self, start: usize, at: usize, reason: &'static str) -> ParseError {
        let end = self.scan_while(at, |c| is_ident_continue(c) || c == b'.');
        ParseError::MalformedDuration {
            fragment: self.src[start..end].to_string(),
            offset: start,
            reason,
        }
    }

    /// `<int><unit>` components, hours before minutes, optionally separated by
    /// whitespace: `3h`, `90min`, `1h15min`, `1h 15min`.
    fn duration(&mut self, start: usize) -> Result<(), ParseError> {
        let mut hours: Option<i64> = None;
        let mut minutes: Option<i64> = None;
        let mut pos = start;

        loop {
            let digits_end = self.scan_while(pos, |c| c.is_ascii_digit());
            if self.peek_at(digits_end) == Some(b'.') {
                return Err(self.malformed(start, digits_end, "durations must be whole numbers"));
            }
            let value: i64 = self.src[pos..digits_end]
                .parse()
                .map_err(|_| self.malformed(start, digits_end, "value out of range"))?;
            let unit_end = self.scan_while(digits_end, |c| c.is_ascii_alphabetic() || c == b'_');
            match &self.src[digits_end..unit_end] {
                "h" | "hr" => {
                    if hours.is_some() || minutes.is_some() {
                        return Err(self.malformed(start, unit_end, "hours must come first and only once"));
                    }
                    hours = Some(value);
                }
                "min" => {
                    if minutes.is_some() {
                        return Err(self.malformed(start, unit_end, "minutes given twice"));
                    }
                    minutes = Some(value);
                }
                "" => return Err(self.malformed(start, unit_end, "missing unit (h, hr or min)")),
                _ => return Err(self.malformed(start, unit_end, "unknown unit (expected h, hr or min)")),
            }
            pos = unit_end;

            // Another component may follow directly or after whitespace.
            let next = self.scan_while(pos, |c| c == b' ' || c == b'\t');
            if !self.peek_at(next).is_some_and(|c| c.is_ascii_digit()) {
                break;
            }
            let next_digits_end = self.scan_while(next, |c| c.is_ascii_digit());
            let has_unit = self.peek_at(next_digits_end).is_some_and(is_ident_start);
            if has_unit {
                pos = next;
            } else if next == pos {
                return Err(self.malformed(start, next, "missing unit (h, hr or min)"));
            } else {
                break;
            }
        }

        if let (Some(_), Some(m)) = (hours, minutes) {
            if m >= 60 {
                return Err(self.malformed(start, pos, "minutes after hours must be below 60"));
            }
        }
        let total = hours
            .unwrap_or(0)
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes.unwrap_or(0)))
            .and_then(TimeDelta::try_minutes)
            .ok_or_else(|| self.malformed(start, pos, "value out of range"))?;

        self.pos = pos;
        self.push(TokenKind::Duration(total), start);
        Ok(())
    }
}
