//! Port I/O backends
//!
//! The register engine only ever talks to a handful of 8-bit I/O ports. This
//! module hides how those ports are reached.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

/// Byte wide access to I/O ports
pub trait PortIo {
    /// Get exclusive access to the ports
    fn acquire(&mut self) -> io::Result<()>;

    /// Give up access to the ports
    fn release(&mut self) -> io::Result<()>;

    /// Read a byte from a port
    fn inb(&mut self, port: u16) -> io::Result<u8>;

    /// Write a byte to a port
    fn outb(&mut self, port: u16, value: u8) -> io::Result<()>;
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn acquire(&mut self) -> io::Result<()> {
        (**self).acquire()
    }

    fn release(&mut self) -> io::Result<()> {
        (**self).release()
    }

    fn inb(&mut self, port: u16) -> io::Result<u8> {
        (**self).inb(port)
    }

    fn outb(&mut self, port: u16, value: u8) -> io::Result<()> {
        (**self).outb(port, value)
    }
}

/// Default device exposing the I/O port space on Linux
pub const DEV_PORT: &str = "/dev/port";

/// Port access through the Linux `/dev/port` device, where the file offset is
/// the port number.
#[derive(Debug)]
pub struct DevPort {
    path: PathBuf,
    file: Option<File>,
}

impl DevPort {
    /// Use [`DEV_PORT`]
    pub fn new() -> Self {
        Self::with_path(DEV_PORT)
    }

    /// Use another device node
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn file(&self) -> io::Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "ports not acquired"))
    }
}

impl Default for DevPort {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for DevPort {
    fn acquire(&mut self) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            self.file = Some(file);
        }
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.file = None;
        Ok(())
    }

    fn inb(&mut self, port: u16) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.file()?.read_exact_at(&mut buf, port as u64)?;
        Ok(buf[0])
    }

    fn outb(&mut self, port: u16, value: u8) -> io::Result<()> {
        self.file()?.write_all_at(&[value], port as u64)
    }
}
