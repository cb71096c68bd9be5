//! Directive parser
//!
//! Turns the token stream of one config file into a list of directives.
//! `or`/`and` wrap the directive they guard, so the interpreter skips
//! structurally instead of rescanning tokens. Braces stay as open and close
//! markers because a block opened in one file may be closed by a file it
//! includes, or the other way round.

use super::token::{match_keyword, parse_integer, parse_integer_pair, Token, TokenKind};
use super::{LogLevel, ParseErrorKind};
use crate::hardware::HardwareType;
use crate::map::{
    BitField, BitPosition, ChecksumAlgorithm, ChecksumField, FieldDefinition, FieldKind, Region,
    BITFIELD_MAX_BITS,
};
use crate::NVRAM_SIZE;

/// Recognized directive keywords, in match priority order
pub const COMMANDS: &[&str] = &[
    "{", "}", "break", "continue", "or", "and", "fail", "log", "include", "hardware", "checksum",
    "bytearray", "string", "bitfield",
];

const BLOCK_START: usize = 0;
const BLOCK_END: usize = 1;
const BREAK: usize = 2;
const CONTINUE: usize = 3;
const OR: usize = 4;
const AND: usize = 5;
const FAIL: usize = 6;
const LOG: usize = 7;
const INCLUDE: usize = 8;
const HARDWARE: usize = 9;
const CHECKSUM: usize = 10;
const BYTEARRAY: usize = 11;
const STRING: usize = 12;
const BITFIELD: usize = 13;

/// A parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `{`
    BlockStart { line: usize },
    /// `}`
    BlockEnd { line: usize },
    /// Leave the enclosing block, marking it failed
    Break { line: usize },
    /// Leave the enclosing block, marking it succeeded
    Continue { line: usize },
    /// Run `guarded` only if the last status is failed
    Or { line: usize, guarded: Box<Directive> },
    /// Run `guarded` only if the last status is succeeded
    And { line: usize, guarded: Box<Directive> },
    /// Abort
    Fail { line: usize },
    /// Message for the diagnostic stream
    Log {
        line: usize,
        level: LogLevel,
        message: String,
    },
    /// Include another config file, path not yet templated
    Include { line: usize, path: String },
    /// Select the chipset type
    Hardware { line: usize, hardware: HardwareType },
    /// Declare a field
    Field { line: usize, field: FieldDefinition },
}

/// Non-fatal finding while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Source line
    pub line: usize,
    /// Message
    pub message: String,
}

/// A parse failure and where it happened
pub type Located = (usize, ParseErrorKind);

type ParseResult<T> = Result<T, Located>;

impl Directive {
    /// Whether running this directive opens a block, looking through
    /// `or`/`and` guards
    pub fn opens_block(&self) -> bool {
        match self {
            Directive::BlockStart { .. } => true,
            Directive::Or { guarded, .. } | Directive::And { guarded, .. } => {
                guarded.opens_block()
            }
            _ => false,
        }
    }
}

/// Parse the tokens of one file. Block balance is checked by the
/// interpreter across included files.
pub fn parse_tokens(tokens: &[Token]) -> Result<(Vec<Directive>, Vec<ParseWarning>), Located> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        warnings: Vec::new(),
    };
    let directives = parser.parse_all()?;
    Ok((directives, parser.warnings))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// Line of the current token, or of the last one past the end
    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    fn parse_all(&mut self) -> ParseResult<Vec<Directive>> {
        let mut directives = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::EndOfFile => break,
                TokenKind::EndOfLine => self.pos += 1,
                _ => directives.push(self.parse_statement()?),
            }
        }
        Ok(directives)
    }

    fn parse_statement(&mut self) -> ParseResult<Directive> {
        let (text, line) = self.expect_word()?;
        let Some(command) = match_keyword(&text, COMMANDS) else {
            return Err((line, ParseErrorKind::UnknownKeyword(text)));
        };

        let directive = match command {
            BLOCK_START => {
                self.end_of_line(&text);
                Directive::BlockStart { line }
            }
            BLOCK_END => {
                self.end_of_line(&text);
                Directive::BlockEnd { line }
            }
            BREAK => {
                self.end_of_line(&text);
                Directive::Break { line }
            }
            CONTINUE => {
                self.end_of_line(&text);
                Directive::Continue { line }
            }
            OR | AND => {
                let guarded = match self.parse_statement()? {
                    Directive::BlockEnd { .. } => {
                        return Err((line, ParseErrorKind::UnbalancedClose))
                    }
                    directive => Box::new(directive),
                };
                if command == OR {
                    Directive::Or { line, guarded }
                } else {
                    Directive::And { line, guarded }
                }
            }
            FAIL => {
                self.end_of_line(&text);
                Directive::Fail { line }
            }
            LOG => {
                let (level_text, level_line) = self.expect_word()?;
                let level = match_keyword(&level_text, LogLevel::KEYWORDS)
                    .and_then(LogLevel::from_keyword_index)
                    .ok_or((level_line, ParseErrorKind::UnknownLogLevel(level_text)))?;
                let mut words = Vec::new();
                while let Some(word) = self.peek().and_then(Token::text) {
                    words.push(word);
                    self.pos += 1;
                }
                self.end_of_line(&text);
                Directive::Log {
                    line,
                    level,
                    message: words.join(" "),
                }
            }
            INCLUDE => {
                let (path, _) = self.expect_word()?;
                self.end_of_line(&text);
                Directive::Include { line, path }
            }
            HARDWARE => {
                let (name, name_line) = self.expect_word()?;
                let hardware = match_keyword(&name, HardwareType::KEYWORDS)
                    .and_then(HardwareType::from_keyword_index)
                    .ok_or((name_line, ParseErrorKind::UnknownHardware(name)))?;
                self.end_of_line(&text);
                Directive::Hardware { line, hardware }
            }
            CHECKSUM | BYTEARRAY | STRING | BITFIELD => {
                let (name, _) = self.expect_word()?;
                let kind = match command {
                    CHECKSUM => self.parse_checksum()?,
                    BYTEARRAY => FieldKind::ByteArray(self.parse_region()?),
                    STRING => FieldKind::String(self.parse_region()?),
                    _ => self.parse_bitfield()?,
                };
                self.end_of_line(&text);
                Directive::Field {
                    line,
                    field: FieldDefinition { name, kind },
                }
            }
            _ => unreachable!("keyword index outside COMMANDS"),
        };
        Ok(directive)
    }

    fn parse_checksum(&mut self) -> ParseResult<FieldKind> {
        let (name, line) = self.expect_word()?;
        let algorithm = match_keyword(&name, ChecksumAlgorithm::KEYWORDS)
            .and_then(ChecksumAlgorithm::from_keyword_index)
            .ok_or((line, ParseErrorKind::UnknownChecksumAlgorithm(name)))?;

        let mut positions = Vec::with_capacity(algorithm.storage_bytes());
        for _ in 0..algorithm.storage_bytes() {
            let (position, line) = self.expect_integer()?;
            positions.push(address(position, line)?);
        }
        let region = self.parse_region()?;

        Ok(FieldKind::Checksum(ChecksumField {
            algorithm,
            positions,
            region,
        }))
    }

    fn parse_region(&mut self) -> ParseResult<Region> {
        let (position, _) = self.expect_integer()?;
        let (length, line) = self.expect_integer()?;
        let out_of_range = (line, ParseErrorKind::OutOfRange { position, length });
        let position = usize::try_from(position).map_err(|_| out_of_range.clone())?;
        let length = usize::try_from(length).map_err(|_| out_of_range.clone())?;
        Region::new(position, length).ok_or(out_of_range)
    }

    fn parse_bitfield(&mut self) -> ParseResult<FieldKind> {
        let (bits, line) = self.expect_integer()?;
        if !(1..=BITFIELD_MAX_BITS as i64).contains(&bits) {
            return Err((
                line,
                ParseErrorKind::BitCount {
                    got: bits,
                    max: BITFIELD_MAX_BITS,
                },
            ));
        }
        let bits = bits as usize;

        let mut positions = Vec::with_capacity(bits);
        for _ in 0..bits {
            let (text, line) = self.expect_word()?;
            let (byte, bit) = parse_integer_pair(&text)
                .ok_or((line, ParseErrorKind::InvalidIntegerPair(text)))?;
            if !(0..=7).contains(&bit) {
                return Err((line, ParseErrorKind::BitNumber(bit)));
            }
            positions.push(BitPosition {
                byte: address(byte, line)?,
                bit: bit as u8,
            });
        }

        let mut labels = Vec::with_capacity(1 << bits);
        for _ in 0..(1 << bits) {
            labels.push(self.expect_word()?.0);
        }

        Ok(FieldKind::BitField(BitField { positions, labels }))
    }

    /// Next token as a word; a line end here means the statement is short.
    fn expect_word(&mut self) -> ParseResult<(String, usize)> {
        match self.peek() {
            Some(token) => match &token.kind {
                TokenKind::String(text) => {
                    self.pos += 1;
                    Ok((text.clone(), token.line))
                }
                _ => Err((token.line, ParseErrorKind::IncompleteStatement)),
            },
            None => Err((self.line(), ParseErrorKind::IncompleteStatement)),
        }
    }

    fn expect_integer(&mut self) -> ParseResult<(i64, usize)> {
        let (text, line) = self.expect_word()?;
        match parse_integer(&text) {
            Some(value) => Ok((value, line)),
            None => Err((line, ParseErrorKind::InvalidInteger(text))),
        }
    }

    /// Consume the rest of the line, warning about surplus words
    fn end_of_line(&mut self, command: &str) {
        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::EndOfLine => {
                    self.pos += 1;
                    return;
                }
                TokenKind::EndOfFile => return,
                TokenKind::String(text) => {
                    self.warnings.push(ParseWarning {
                        line: token.line,
                        message: format!("additional parameter {text} in {command} statement"),
                    });
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }
}

fn address(value: i64, line: usize) -> ParseResult<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&a| a < NVRAM_SIZE)
        .ok_or((
            line,
            ParseErrorKind::OutOfRange {
                position: value,
                length: 1,
            },
        ))
}
