//! NVRAM session
//!
//! An [`Nvram`] owns the port backend, the bank-select snapshot and the
//! register cache for one open/close cycle. Reads are served from the cache
//! when possible, writes only touch the cache, and [`Nvram::flush`] is the
//! only path that commits to hardware.

use tracing::{debug, warn};

use super::cache::RegisterCache;
use super::detect;
use super::{NvramError, PortIo};
use crate::hardware::HardwareType;
use crate::NVRAM_SIZE;

/// Value returned for addresses that do not exist
pub const SENTINEL: u8 = 0xff;

/// Primary RTC index register
pub const RTC_INDEX: u16 = 0x70;
/// Primary RTC data register
pub const RTC_DATA: u16 = 0x71;
/// Intel / VIA 82Cxxx extended index register
pub const EXT_INDEX: u16 = 0x72;
/// Intel / VIA 82Cxxx extended data register
pub const EXT_DATA: u16 = 0x73;
/// VIA 823x extended index register
pub const VIA823X_INDEX: u16 = 0x74;
/// VIA 823x extended data register
pub const VIA823X_DATA: u16 = 0x75;

/// RTC register A, which holds the DS1685 bank select bit
pub const REGISTER_A: u8 = 0x0a;
/// DS1685 bank select bit in register A
pub const BANK_SELECT: u8 = 0x10;
/// DS1685 extended RAM address register (bank 1)
pub const DS1685_EXT_ADDRESS: u8 = 0x50;
/// DS1685 extended RAM data register (bank 1)
pub const DS1685_EXT_DATA: u8 = 0x53;

/// Byte addressable register store used by the field layer
pub trait RegisterFile {
    /// Read a byte. Addresses outside the register file read as [`SENTINEL`].
    fn read(&mut self, address: usize) -> Result<u8, NvramError>;

    /// Write a byte. Addresses outside the register file are ignored.
    fn write(&mut self, address: usize, value: u8);
}

/// An open NVRAM session
pub struct Nvram<P: PortIo> {
    ports: P,
    hardware: HardwareType,
    register_a: u8,
    cache: RegisterCache,
    closed: bool,
}

impl<P: PortIo> Nvram<P> {
    /// Get access to the ports and start a session.
    ///
    /// With [`HardwareType::Detect`] the hardware is probed first and the
    /// session uses the detected type.
    pub fn open(mut ports: P, hardware: HardwareType) -> Result<Self, NvramError> {
        let hardware = match hardware {
            HardwareType::Detect => detect::detect_hardware(&mut ports)?,
            other => other,
        };

        ports.acquire().map_err(NvramError::Access)?;

        let mut nvram = Self {
            ports,
            hardware,
            register_a: 0,
            cache: RegisterCache::new(),
            closed: false,
        };

        // Snapshot register A before any bank switching happens.
        nvram.outb(RTC_INDEX, REGISTER_A)?;
        nvram.register_a = nvram.inb(RTC_DATA)?;
        debug!(
            "opened NVRAM as {} (register A {:#04x})",
            nvram.hardware, nvram.register_a
        );

        Ok(nvram)
    }

    /// Restore the default bank and release the ports.
    ///
    /// Pending writes that were not flushed are discarded.
    pub fn close(mut self) -> Result<(), NvramError> {
        self.shutdown()
    }

    /// Hardware type used by this session
    pub fn hardware(&self) -> HardwareType {
        self.hardware
    }

    /// Read a byte through the cache
    pub fn read(&mut self, address: usize) -> Result<u8, NvramError> {
        if address >= NVRAM_SIZE {
            return Ok(SENTINEL);
        }
        if let Some(value) = self.cache.get(address) {
            return Ok(value);
        }

        let Some(data_port) = self.select(address)? else {
            return Ok(SENTINEL);
        };
        let value = self.inb(data_port)?;
        self.cache.fill(address, value);
        Ok(value)
    }

    /// Buffer a write. Nothing reaches the hardware until [`Nvram::flush`].
    pub fn write(&mut self, address: usize, value: u8) {
        if address < NVRAM_SIZE {
            self.cache.store(address, value);
        }
    }

    /// Commit every written, not yet flushed byte. Returns the number of
    /// bytes written to hardware.
    pub fn flush(&mut self) -> Result<usize, NvramError> {
        let mut flushed = 0;
        for (address, value) in self.cache.pending() {
            // Bytes the chipset cannot address stay pending.
            if let Some(data_port) = self.select(address)? {
                self.outb(data_port, value)?;
                self.cache.mark_flushed(address);
                flushed += 1;
            }
        }
        debug!("flushed {} byte(s) to NVRAM", flushed);
        Ok(flushed)
    }

    /// Number of buffered writes not yet committed
    pub fn pending_writes(&self) -> usize {
        self.cache.pending_count()
    }

    /// Read a byte straight from hardware, bypassing and then refreshing the
    /// cache.
    pub(crate) fn read_through(&mut self, address: usize) -> Result<u8, NvramError> {
        self.cache.invalidate(address);
        self.read(address)
    }

    /// Write a byte straight to hardware, leaving the cache consistent.
    pub(crate) fn write_through(&mut self, address: usize, value: u8) -> Result<(), NvramError> {
        if address >= NVRAM_SIZE {
            return Ok(());
        }
        if let Some(data_port) = self.select(address)? {
            self.outb(data_port, value)?;
        }
        self.cache.invalidate(address);
        Ok(())
    }

    /// Run the vendor addressing sequence for `address` and return the data
    /// port to use, or `None` if the chipset cannot reach it.
    fn select(&mut self, address: usize) -> Result<Option<u16>, NvramError> {
        debug_assert!(address < NVRAM_SIZE);
        let address = address as u8;

        if address < 0x80 {
            if self.hardware == HardwareType::Ds1685 {
                self.switch_bank(false)?;
            }
            self.outb(RTC_INDEX, address)?;
            return Ok(Some(RTC_DATA));
        }

        match self.hardware {
            HardwareType::Intel => {
                self.outb(EXT_INDEX, address - 0x80)?;
                Ok(Some(EXT_DATA))
            }
            HardwareType::Via82Cxx => {
                // Bit 7 of the index stays set.
                self.outb(EXT_INDEX, address)?;
                Ok(Some(EXT_DATA))
            }
            HardwareType::Via823x => {
                self.outb(VIA823X_INDEX, address)?;
                Ok(Some(VIA823X_DATA))
            }
            HardwareType::Ds1685 => {
                self.switch_bank(true)?;
                self.outb(RTC_INDEX, DS1685_EXT_ADDRESS)?;
                self.outb(RTC_DATA, address - 0x80)?;
                self.outb(RTC_INDEX, DS1685_EXT_DATA)?;
                Ok(Some(RTC_DATA))
            }
            HardwareType::Standard | HardwareType::Detect => Ok(None),
        }
    }

    /// Set the DS1685 bank bit in register A if it differs from the snapshot.
    fn switch_bank(&mut self, bank1: bool) -> Result<(), NvramError> {
        let selected = self.register_a & BANK_SELECT != 0;
        if selected == bank1 {
            return Ok(());
        }
        if bank1 {
            self.register_a |= BANK_SELECT;
        } else {
            self.register_a &= !BANK_SELECT;
        }
        self.outb(RTC_INDEX, REGISTER_A)?;
        self.outb(RTC_DATA, self.register_a)
    }

    fn shutdown(&mut self) -> Result<(), NvramError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let restored = if self.register_a & BANK_SELECT != 0 {
            self.switch_bank(false)
        } else {
            Ok(())
        };
        let released = self.ports.release().map_err(NvramError::Release);
        if self.cache.pending_count() > 0 {
            debug!("discarding {} unflushed byte(s)", self.cache.pending_count());
        }
        self.cache.clear();
        debug!("closed NVRAM");
        restored.and(released)
    }

    fn inb(&mut self, port: u16) -> Result<u8, NvramError> {
        self.ports
            .inb(port)
            .map_err(|source| NvramError::Port { port, source })
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<(), NvramError> {
        self.ports
            .outb(port, value)
            .map_err(|source| NvramError::Port { port, source })
    }
}

impl<P: PortIo> RegisterFile for Nvram<P> {
    fn read(&mut self, address: usize) -> Result<u8, NvramError> {
        Nvram::read(self, address)
    }

    fn write(&mut self, address: usize, value: u8) {
        Nvram::write(self, address, value)
    }
}

impl<P: PortIo> Drop for Nvram<P> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("closing NVRAM failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvram::{SimulatedChipset, SimulatedLayout};

    #[test]
    fn test_shutdown_drops_unflushed_writes() {
        let mut sim = SimulatedChipset::new(SimulatedLayout::Standard);
        let mut nvram = Nvram::open(&mut sim, HardwareType::Standard).unwrap();
        nvram.write(0x20, 0x42);
        assert_eq!(nvram.pending_writes(), 1);

        nvram.shutdown().unwrap();
        assert_eq!(nvram.pending_writes(), 0);
        assert_eq!(nvram.cache.get(0x20), None);
        drop(nvram);

        assert_eq!(sim.peek(0x20), 0);
        assert!(!sim.is_acquired());
    }
}
