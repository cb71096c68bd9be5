//! Error types for config interpretation

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort reading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error loading config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error in config file {file}, line {line}: {kind}")]
    Parse {
        file: String,
        line: usize,
        kind: ParseErrorKind,
    },
}

impl ConfigError {
    /// The specific parse failure, if this is one
    pub fn kind(&self) -> Option<&ParseErrorKind> {
        match self {
            ConfigError::Parse { kind, .. } => Some(kind),
            ConfigError::Io { .. } => None,
        }
    }

    /// Line the error was found on, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::Parse { line, .. } => Some(*line),
            ConfigError::Io { .. } => None,
        }
    }
}

/// Fatal conditions found while interpreting directives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("incomplete statement")]
    IncompleteStatement,

    #[error("no such keyword {0}")]
    UnknownKeyword(String),

    #[error("not a valid integer: {0}")]
    InvalidInteger(String),

    #[error("not a valid integer pair: {0}")]
    InvalidIntegerPair(String),

    #[error("not a valid hardware description: {0}")]
    UnknownHardware(String),

    #[error("not a valid checksum algorithm: {0}")]
    UnknownChecksumAlgorithm(String),

    #[error("not a valid loglevel: {0}")]
    UnknownLogLevel(String),

    #[error("number of bits in a bitfield has to be between 1 and {max}, got {got}")]
    BitCount { got: i64, max: usize },

    #[error("bit number must be between 0 and 7, got {0}")]
    BitNumber(i64),

    #[error("position {position} / length {length} outside the NVRAM")]
    OutOfRange { position: i64, length: i64 },

    #[error("unbalanced }}")]
    UnbalancedClose,

    #[error("unbalanced {{, block not closed at end of file")]
    UnclosedBlock,

    #[error("{0} outside a {{...}} block")]
    OutsideBlock(&'static str),

    #[error("identifier {0} already used")]
    DuplicateName(String),

    #[error("maximum nesting level {0} reached. Maybe a loop?")]
    IncludeDepthExceeded(usize),

    #[error("invalid escape sequence in config file name {0}")]
    InvalidEscape(String),

    #[error("config file name longer than {0} bytes")]
    PathTooLong(usize),

    #[error("failed")]
    Failed,
}
