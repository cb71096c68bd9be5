//! Config tokenizer
//!
//! Splits config text into whitespace separated words, one end-of-line token
//! per line that had words, and a final end-of-file token. Lines whose first
//! non-blank character is `#` are comments.

use std::io::Read;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A word as written
    String(String),
    /// Index into a keyword list
    Keyword(usize),
    /// Signed integer
    Integer(i64),
    /// `A:B` integer pair
    IntegerPair(i64, i64),
    /// End of a line that contained words
    EndOfLine,
    /// End of the stream
    EndOfFile,
}

/// A token with the line it was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Payload
    pub kind: TokenKind,
    /// 1-based source line
    pub line: usize,
}

impl Token {
    /// Create a token
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Text of a string token
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::String(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this token ends a line (or the file)
    pub fn is_line_end(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfLine | TokenKind::EndOfFile)
    }

    /// Convert a string token into a keyword token, see [`match_keyword`]
    pub fn to_keyword(&self, keywords: &[&str]) -> Option<Token> {
        match &self.kind {
            TokenKind::String(text) => match_keyword(text, keywords)
                .map(|index| Token::new(TokenKind::Keyword(index), self.line)),
            _ => None,
        }
    }

    /// Convert a string token into an integer token. Integer tokens convert
    /// to themselves.
    pub fn to_integer(&self) -> Option<Token> {
        match &self.kind {
            TokenKind::Integer(_) => Some(self.clone()),
            TokenKind::String(text) => {
                parse_integer(text).map(|value| Token::new(TokenKind::Integer(value), self.line))
            }
            _ => None,
        }
    }

    /// Convert a string token into an integer pair token
    pub fn to_integer_pair(&self) -> Option<Token> {
        match &self.kind {
            TokenKind::IntegerPair(..) => Some(self.clone()),
            TokenKind::String(text) => parse_integer_pair(text)
                .map(|(a, b)| Token::new(TokenKind::IntegerPair(a, b), self.line)),
            _ => None,
        }
    }
}

/// Tokenize a whole stream. Invalid UTF-8 is replaced, not rejected.
pub fn tokenize<R: Read>(mut reader: R) -> std::io::Result<Vec<Token>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(tokenize_str(&String::from_utf8_lossy(&bytes)))
}

/// Tokenize text
pub fn tokenize_str(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line_count = 0;

    for (i, line) in text.split('\n').enumerate() {
        let line_no = i + 1;
        line_count = line_no;

        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        tokens.extend(
            trimmed
                .split_whitespace()
                .map(|word| Token::new(TokenKind::String(word.to_string()), line_no)),
        );
        tokens.push(Token::new(TokenKind::EndOfLine, line_no));
    }

    tokens.push(Token::new(TokenKind::EndOfFile, line_count.max(1)));
    tokens
}

/// Match `text` against an ordered keyword list.
///
/// A word matches a keyword when it is the keyword or a non-empty prefix of
/// it, so keywords may be abbreviated. The first listed keyword wins when an
/// abbreviation is ambiguous.
pub fn match_keyword(text: &str, keywords: &[&str]) -> Option<usize> {
    if text.is_empty() {
        return None;
    }
    keywords.iter().position(|keyword| keyword.starts_with(text))
}

/// Parse a signed integer with C style base prefixes: `0x`/`0X` for hex,
/// a leading `0` for octal, decimal otherwise. The whole text must be used.
pub fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    // from_str_radix would accept a second sign.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse `A:B` where both halves are integers as in [`parse_integer`]
pub fn parse_integer_pair(text: &str) -> Option<(i64, i64)> {
    let (first, second) = text.split_once(':')?;
    Some((parse_integer(first)?, parse_integer(second)?))
}
