//! Register engine errors

use thiserror::Error;

/// Errors that can occur while talking to the RTC ports
#[derive(Error, Debug)]
pub enum NvramError {
    #[error("cannot get access to the NVRAM ports: {0}")]
    Access(#[source] std::io::Error),

    #[error("cannot release access to the NVRAM ports: {0}")]
    Release(#[source] std::io::Error),

    #[error("I/O error on port {port:#04x}: {source}")]
    Port {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
