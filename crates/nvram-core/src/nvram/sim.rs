//! Simulated RTC chipsets
//!
//! In-memory models of the port-level behaviour of the supported chipsets,
//! used to exercise the register engine and detection without touching real
//! hardware.

use std::io;

use super::session::{
    BANK_SELECT, DS1685_EXT_ADDRESS, DS1685_EXT_DATA, EXT_DATA, EXT_INDEX, REGISTER_A, RTC_DATA,
    RTC_INDEX, VIA823X_DATA, VIA823X_INDEX,
};
use super::PortIo;

/// Value read from a port nothing answers on
const FLOATING_BUS: u8 = 0xff;

/// Which chipset the simulation behaves like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedLayout {
    /// Only the 128 standard bytes exist
    Standard,
    /// 0x72/0x73 decode a 7 bit index onto the standard bytes
    MirroredExtended,
    /// Independent upper bank at 0x72/0x73, index bit 7 ignored
    Intel,
    /// Independent upper bank at 0x72/0x73, index must have bit 7 set
    Via82Cxx,
    /// Independent upper bank at 0x74/0x75
    Via823x,
    /// Upper bank behind the bank 1 extended address/data registers
    Ds1685,
}

/// A simulated RTC with 128 standard and up to 128 extended bytes
#[derive(Debug, Clone)]
pub struct SimulatedChipset {
    layout: SimulatedLayout,
    standard: [u8; 128],
    extended: [u8; 128],
    rtc_index: u8,
    ext_index: Option<u8>,
    ds_ext_address: u8,
    acquired: bool,
    available: bool,
    storage_writes: usize,
}

impl SimulatedChipset {
    /// Create a chipset with all storage cleared
    pub fn new(layout: SimulatedLayout) -> Self {
        Self {
            layout,
            standard: [0; 128],
            extended: [0; 128],
            rtc_index: 0,
            ext_index: None,
            ds_ext_address: 0,
            acquired: false,
            available: true,
            storage_writes: 0,
        }
    }

    /// A chipset whose ports can never be acquired
    pub fn unavailable(layout: SimulatedLayout) -> Self {
        Self {
            available: false,
            ..Self::new(layout)
        }
    }

    /// Layout being simulated
    pub fn layout(&self) -> SimulatedLayout {
        self.layout
    }

    /// Logical contents of an address, without side effects
    pub fn peek(&self, address: usize) -> u8 {
        match address {
            0..=0x7f => self.standard[address],
            0x80..=0xff => match self.layout {
                SimulatedLayout::Standard => FLOATING_BUS,
                SimulatedLayout::MirroredExtended => self.standard[address & 0x7f],
                _ => self.extended[address & 0x7f],
            },
            _ => FLOATING_BUS,
        }
    }

    /// Set the logical contents of an address, without counting a write
    pub fn poke(&mut self, address: usize, value: u8) {
        match address {
            0..=0x7f => self.standard[address] = value,
            0x80..=0xff => match self.layout {
                SimulatedLayout::Standard => {}
                SimulatedLayout::MirroredExtended => self.standard[address & 0x7f] = value,
                _ => self.extended[address & 0x7f] = value,
            },
            _ => {}
        }
    }

    /// Number of writes that reached storage cells
    pub fn storage_writes(&self) -> usize {
        self.storage_writes
    }

    /// Whether the ports are currently acquired
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Whether the DS1685 bank 1 is selected in register A
    pub fn bank1_selected(&self) -> bool {
        self.standard[REGISTER_A as usize] & BANK_SELECT != 0
    }

    fn ds1685_bank1(&self) -> bool {
        self.layout == SimulatedLayout::Ds1685 && self.bank1_selected()
    }

    fn ext_index_port(&self) -> Option<u16> {
        match self.layout {
            SimulatedLayout::MirroredExtended
            | SimulatedLayout::Intel
            | SimulatedLayout::Via82Cxx => Some(EXT_INDEX),
            SimulatedLayout::Via823x => Some(VIA823X_INDEX),
            SimulatedLayout::Standard | SimulatedLayout::Ds1685 => None,
        }
    }

    /// Decode a value written to the extended index port
    fn decode_ext_index(&self, value: u8) -> Option<u8> {
        match self.layout {
            SimulatedLayout::Via82Cxx if value & 0x80 == 0 => None,
            _ => Some(value & 0x7f),
        }
    }

    fn ext_data_port(&self) -> Option<u16> {
        match self.layout {
            SimulatedLayout::MirroredExtended
            | SimulatedLayout::Intel
            | SimulatedLayout::Via82Cxx => Some(EXT_DATA),
            SimulatedLayout::Via823x => Some(VIA823X_DATA),
            SimulatedLayout::Standard | SimulatedLayout::Ds1685 => None,
        }
    }

    fn ext_cell(&mut self) -> Option<&mut u8> {
        let index = self.ext_index? as usize;
        match self.layout {
            SimulatedLayout::MirroredExtended => Some(&mut self.standard[index]),
            _ => Some(&mut self.extended[index]),
        }
    }

    fn check_acquired(&self) -> io::Result<()> {
        if self.acquired {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "ports not acquired",
            ))
        }
    }
}

impl PortIo for SimulatedChipset {
    fn acquire(&mut self) -> io::Result<()> {
        if !self.available {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated ports unavailable",
            ));
        }
        self.acquired = true;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.check_acquired()?;
        self.acquired = false;
        Ok(())
    }

    fn inb(&mut self, port: u16) -> io::Result<u8> {
        self.check_acquired()?;
        let value = match port {
            RTC_DATA if self.ds1685_bank1() && self.rtc_index == DS1685_EXT_DATA => {
                self.extended[(self.ds_ext_address & 0x7f) as usize]
            }
            RTC_DATA => self.standard[self.rtc_index as usize],
            _ if Some(port) == self.ext_data_port() => match self.ext_cell() {
                Some(cell) => *cell,
                None => FLOATING_BUS,
            },
            _ => FLOATING_BUS,
        };
        Ok(value)
    }

    fn outb(&mut self, port: u16, value: u8) -> io::Result<()> {
        self.check_acquired()?;
        match port {
            RTC_INDEX => self.rtc_index = value & 0x7f,
            RTC_DATA if self.ds1685_bank1() && self.rtc_index == DS1685_EXT_ADDRESS => {
                self.ds_ext_address = value;
            }
            RTC_DATA if self.ds1685_bank1() && self.rtc_index == DS1685_EXT_DATA => {
                self.extended[(self.ds_ext_address & 0x7f) as usize] = value;
                self.storage_writes += 1;
            }
            RTC_DATA => {
                self.standard[self.rtc_index as usize] = value;
                self.storage_writes += 1;
            }
            _ if Some(port) == self.ext_index_port() => {
                self.ext_index = self.decode_ext_index(value);
            }
            _ if Some(port) == self.ext_data_port() => {
                if let Some(cell) = self.ext_cell() {
                    *cell = value;
                    self.storage_writes += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
