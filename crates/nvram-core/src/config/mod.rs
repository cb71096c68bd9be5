//! Config language
//!
//! The config language maps named fields onto NVRAM bytes and selects the
//! chipset. It is line oriented:
//!
//! ```text
//! # comment
//! hardware intel
//! {
//!     include boards/%mm/%mp.conf
//!     or log info no board config for %mp
//! }
//! checksum  sum      standard 0x2e 0x2f 0x10 30
//! bytearray boot     0x40 2
//! string    owner    0x50 16
//! bitfield  bootmode 1 0x3d:4 floppy disk
//! ```
//!
//! Keywords may be abbreviated. Every directive sets a succeeded/failed
//! status which `or` and `and` test; `{ ... }` groups directives and
//! `break`/`continue` leave the group early.

mod directive;
mod error;
mod interpreter;
mod path;
mod token;

pub use directive::{parse_tokens, Directive, ParseWarning, COMMANDS};
pub use error::{ConfigError, ParseErrorKind};
pub use path::{expand_path, PATH_LENGTH_MAX};
pub use token::{
    match_keyword, parse_integer, parse_integer_pair, tokenize, tokenize_str, Token, TokenKind,
};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::hardware::{HardwareDescriptor, HardwareType};
use crate::map::FieldMap;
use interpreter::Interpreter;

/// Default top level config file
pub const DEFAULT_CONFIG_FILE: &str = "/etc/nvram.conf";

/// Default directory relative includes are resolved against
pub const DEFAULT_CONFIG_DIR: &str = "/etc/nvram.d";

/// Default limit on nested includes
pub const MAX_INCLUDE_DEPTH: usize = 100;

/// Diagnostic levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Register traffic and interpreter steps
    Debug,
    /// Informational, including ignored include failures
    Info,
    /// Default
    #[default]
    Warning,
    /// Only errors
    Error,
}

impl LogLevel {
    /// Keywords in config files, indexed like the variants
    pub const KEYWORDS: &'static [&'static str] = &["debug", "info", "warning", "error"];

    /// Level for a [`LogLevel::KEYWORDS`] index
    pub fn from_keyword_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(LogLevel::Debug),
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Warning),
            3 => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Corresponding tracing level
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::KEYWORDS[*self as usize])
    }
}

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Messages below this level are not sent and `log` reports failure
    pub verbosity: LogLevel,
    /// Base for relative include paths
    pub config_dir: PathBuf,
    /// Nested include limit
    pub max_include_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            verbosity: LogLevel::default(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            max_include_depth: MAX_INCLUDE_DEPTH,
        }
    }
}

/// Result of interpreting a config tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct NvramConfig {
    /// Selected chipset, [`HardwareType::Standard`] unless a directive says otherwise
    pub hardware: HardwareType,
    /// Declared fields in declaration order
    pub fields: FieldMap,
}

impl NvramConfig {
    /// Interpret the config file at `path` and everything it includes
    pub fn load(
        path: impl AsRef<Path>,
        descriptor: &HardwareDescriptor,
        options: &InterpreterOptions,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!("reading config {}", path.display());
        Interpreter::new(descriptor, options).run_path(path)
    }

    /// Interpret config text; `name` identifies it in diagnostics
    pub fn from_str(
        name: &str,
        text: &str,
        descriptor: &HardwareDescriptor,
        options: &InterpreterOptions,
    ) -> Result<Self, ConfigError> {
        Interpreter::new(descriptor, options).run_str(name, text)
    }
}
