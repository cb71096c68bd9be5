//! Directive interpreter
//!
//! Executes directives with a single status flag. Included files are pushed
//! onto a stack of directive iterators, so their directives run as if they
//! were written in place of the `include` line. Blocks are counted across
//! that stack: a `{` in one file may be closed by a `}` in another.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::vec;

use super::directive::{parse_tokens, Directive};
use super::path::expand_path;
use super::token::{tokenize, tokenize_str, Token};
use super::{ConfigError, InterpreterOptions, LogLevel, NvramConfig, ParseErrorKind};
use crate::hardware::{HardwareDescriptor, HardwareType};
use crate::map::FieldMap;

/// Directives of one file still to run
struct Frame {
    file: String,
    directives: vec::IntoIter<Directive>,
    end_line: usize,
}

pub(crate) struct Interpreter<'a> {
    descriptor: &'a HardwareDescriptor,
    options: &'a InterpreterOptions,
    hardware: HardwareType,
    fields: FieldMap,
    status: bool,
    block_depth: usize,
    frames: Vec<Frame>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(descriptor: &'a HardwareDescriptor, options: &'a InterpreterOptions) -> Self {
        Self {
            descriptor,
            options,
            hardware: descriptor.hardware,
            fields: FieldMap::new(),
            status: false,
            block_depth: 0,
            frames: Vec::new(),
        }
    }

    /// Interpret a config file. Failing to open the top level file is fatal.
    pub(crate) fn run_path(mut self, path: &Path) -> Result<NvramConfig, ConfigError> {
        let tokens = read_tokens(path)?;
        self.push_file(path.display().to_string(), &tokens)?;
        self.run()?;
        Ok(self.finish())
    }

    /// Interpret config text. `name` is used in diagnostics.
    pub(crate) fn run_str(mut self, name: &str, text: &str) -> Result<NvramConfig, ConfigError> {
        self.push_file(name.to_string(), &tokenize_str(text))?;
        self.run()?;
        Ok(self.finish())
    }

    fn finish(self) -> NvramConfig {
        NvramConfig {
            hardware: self.hardware,
            fields: self.fields,
        }
    }

    /// Parse a file and make its directives the next ones to run
    fn push_file(&mut self, file: String, tokens: &[Token]) -> Result<(), ConfigError> {
        let (directives, warnings) =
            parse_tokens(tokens).map_err(|(line, kind)| parse_error(&file, line, kind))?;
        for warning in warnings {
            self.emit(
                LogLevel::Warning,
                &format!(
                    "config file {}, line {}: {}",
                    file, warning.line, warning.message
                ),
            );
        }
        self.frames.push(Frame {
            file,
            directives: directives.into_iter(),
            end_line: tokens.last().map_or(0, |t| t.line),
        });
        Ok(())
    }

    /// Files included below the top level one
    fn include_depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Next directive in reading order. Finished included files are dropped;
    /// the top level file stays so end of input can be reported against it.
    fn next_directive(&mut self) -> Option<Directive> {
        loop {
            let frame = self.frames.last_mut()?;
            if let Some(directive) = frame.directives.next() {
                return Some(directive);
            }
            if self.frames.len() == 1 {
                return None;
            }
            self.frames.pop();
        }
    }

    fn run(&mut self) -> Result<(), ConfigError> {
        while let Some(directive) = self.next_directive() {
            self.execute(directive)?;
        }
        if self.block_depth > 0 {
            return Err(self.end_of_input_error());
        }
        Ok(())
    }

    fn execute(&mut self, directive: Directive) -> Result<(), ConfigError> {
        match directive {
            Directive::BlockStart { .. } => {
                self.block_depth += 1;
                self.status = true;
            }
            Directive::BlockEnd { line } => {
                if self.block_depth == 0 {
                    return Err(self.error(line, ParseErrorKind::UnbalancedClose));
                }
                self.block_depth -= 1;
            }
            Directive::Break { line } => {
                self.leave_block(line, "break")?;
                self.status = false;
            }
            Directive::Continue { line } => {
                self.leave_block(line, "continue")?;
                self.status = true;
            }
            Directive::Or { guarded, .. } => {
                if self.status {
                    self.skip(&guarded)?;
                } else {
                    self.execute(*guarded)?;
                }
            }
            Directive::And { guarded, .. } => {
                if self.status {
                    self.execute(*guarded)?;
                } else {
                    self.skip(&guarded)?;
                }
            }
            Directive::Fail { line } => {
                return Err(self.error(line, ParseErrorKind::Failed));
            }
            Directive::Log { level, message, .. } => {
                self.status = self.emit(level, &message);
            }
            Directive::Include { line, path } => {
                self.include(line, &path)?;
            }
            Directive::Hardware { hardware, .. } => {
                tracing::debug!("hardware type {}", hardware);
                self.hardware = hardware;
                self.status = true;
            }
            Directive::Field { line, field } => {
                if let Err(field) = self.fields.insert(field) {
                    return Err(self.error(line, ParseErrorKind::DuplicateName(field.name)));
                }
                self.status = true;
            }
        }
        Ok(())
    }

    /// Skip a guarded directive that was not run. A guarded `{` takes the
    /// whole block with it.
    fn skip(&mut self, guarded: &Directive) -> Result<(), ConfigError> {
        if guarded.opens_block() {
            self.skip_to_block_end()?;
        }
        Ok(())
    }

    /// Leave the innermost open block, skipping to its `}`
    fn leave_block(&mut self, line: usize, keyword: &'static str) -> Result<(), ConfigError> {
        if self.block_depth == 0 {
            return Err(self.error(line, ParseErrorKind::OutsideBlock(keyword)));
        }
        self.skip_to_block_end()?;
        self.block_depth -= 1;
        Ok(())
    }

    /// Drop directives up to and including the `}` matching an already
    /// consumed `{`. Includes in the skipped range are not opened.
    fn skip_to_block_end(&mut self) -> Result<(), ConfigError> {
        let mut level = 1usize;
        while level > 0 {
            match self.next_directive() {
                Some(Directive::BlockEnd { .. }) => level -= 1,
                Some(directive) if directive.opens_block() => level += 1,
                Some(_) => {}
                None => return Err(self.end_of_input_error()),
            }
        }
        Ok(())
    }

    fn include(&mut self, line: usize, template: &str) -> Result<(), ConfigError> {
        if self.include_depth() > self.options.max_include_depth {
            return Err(self.error(
                line,
                ParseErrorKind::IncludeDepthExceeded(self.options.max_include_depth),
            ));
        }

        let expanded =
            expand_path(template, self.descriptor).map_err(|kind| self.error(line, kind))?;
        let path = self.resolve_include(&expanded);

        let reader = match File::open(&path) {
            Ok(reader) => reader,
            Err(e) => {
                self.emit(
                    LogLevel::Info,
                    &format!(
                        "(ignored) error opening include file {}: {}",
                        path.display(),
                        e
                    ),
                );
                self.status = false;
                return Ok(());
            }
        };
        let tokens = tokenize(reader).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("including {}", path.display());
        self.push_file(path.display().to_string(), &tokens)?;
        self.status = true;
        Ok(())
    }

    /// Relative include paths are resolved against the config directory
    fn resolve_include(&self, include_path: &str) -> PathBuf {
        let path = Path::new(include_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.options.config_dir.join(path)
        }
    }

    /// Send a message to the diagnostic stream if the verbosity allows it.
    /// Returns whether it was sent.
    fn emit(&self, level: LogLevel, message: &str) -> bool {
        if self.options.verbosity > level {
            return false;
        }
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        true
    }

    /// Error located in the file currently being run
    fn error(&self, line: usize, kind: ParseErrorKind) -> ConfigError {
        let file = self.frames.last().map_or("", |frame| frame.file.as_str());
        parse_error(file, line, kind)
    }

    fn end_of_input_error(&self) -> ConfigError {
        let line = self.frames.last().map_or(0, |frame| frame.end_line);
        self.error(line, ParseErrorKind::UnclosedBlock)
    }
}

fn read_tokens(path: &Path) -> Result<Vec<Token>, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = File::open(path).map_err(io_error)?;
    tokenize(reader).map_err(io_error)
}

fn parse_error(file: &str, line: usize, kind: ParseErrorKind) -> ConfigError {
    ConfigError::Parse {
        file: file.to_string(),
        line,
        kind,
    }
}
