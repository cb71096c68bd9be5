//! # nvram Core Library
//!
//! Core functionality for the nvram tool.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The NVRAM configuration language (tokenizer and interpreter)
//! - The field mapping table built from that configuration
//! - The register engine with its write-back cache and vendor addressing
//! - Hardware type detection by probing
//!
//! ## Supported chipsets
//!
//! - Standard MC146818-style RTC (128 bytes)
//! - Intel (second register pair 0x72/0x73)
//! - VIA 82Cxxx and VIA 823x southbridges
//! - Dallas DS1685 (bank switched extended RAM)
//!
//! ## Example
//!
//! ```rust,ignore
//! use nvram_core::prelude::*;
//!
//! let descriptor = HardwareDescriptor::default();
//! let config = NvramConfig::load("/etc/nvram.conf", &descriptor, &InterpreterOptions::default())?;
//!
//! let mut nvram = Nvram::open(DevPort::new(), config.hardware)?;
//! let field = config.fields.get("bootcount").unwrap();
//! println!("{}", read_field(&mut nvram, field)?);
//! nvram.close()?;
//! ```

pub mod config;
pub mod hardware;
pub mod map;
pub mod nvram;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, InterpreterOptions, LogLevel, NvramConfig};
    pub use crate::hardware::{HardwareDescriptor, HardwareType};
    pub use crate::map::{
        compute_checksum, read_field, update_checksums, verify_checksum, write_field,
        ChecksumAlgorithm, FieldDefinition, FieldError, FieldKind, FieldMap, FieldValue,
    };
    pub use crate::nvram::{DevPort, Nvram, NvramError, PortIo, RegisterFile, SimulatedChipset};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the addressable register file in bytes
pub const NVRAM_SIZE: usize = 256;
