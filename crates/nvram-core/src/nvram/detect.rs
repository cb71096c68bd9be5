//! Hardware type detection
//!
//! Each extended addressing scheme is tried in priority order. A scheme is
//! accepted when the top cell of extended storage holds every test pattern
//! written to it while two guard cells, written with different patterns, do
//! not pick the pattern up. A guard reading back the pattern means the
//! "extended" address is a mirror of storage that exists anyway.

use tracing::debug;

use super::session::{DS1685_EXT_ADDRESS, DS1685_EXT_DATA};
use super::{Nvram, NvramError, PortIo};
use crate::hardware::HardwareType;

/// Top cell of extended storage
pub const PROBE_TOP: usize = 0xff;
/// Guard cell in standard storage, where a 7 bit index would alias the top cell
pub const PROBE_GUARD_STANDARD: usize = 0x7f;
/// Guard cell elsewhere in extended storage
pub const PROBE_GUARD_EXTENDED: usize = 0xbf;

/// Test patterns written to the top cell. Bit 7 is left out.
pub const PROBE_MASKS: [u8; 7] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40];

/// Probe the hardware and return the first confirmed extended storage type,
/// or [`HardwareType::Standard`] if none is confirmed.
pub fn detect_hardware(ports: &mut dyn PortIo) -> Result<HardwareType, NvramError> {
    for candidate in HardwareType::PROBE_ORDER {
        if probe(&mut *ports, candidate)? {
            debug!("detected hardware type {}", candidate);
            return Ok(candidate);
        }
        debug!("hardware type {} not present", candidate);
    }
    Ok(HardwareType::Standard)
}

/// Test a single candidate type, leaving the probe cells as they were.
pub fn probe(ports: &mut dyn PortIo, candidate: HardwareType) -> Result<bool, NvramError> {
    let mut nvram = Nvram::open(ports, candidate)?;

    // On chipsets without the DS1685 bank 1 registers, the extended
    // address/data register writes land in ordinary bank 0 bytes.
    let mut cells = match candidate {
        HardwareType::Ds1685 => vec![DS1685_EXT_ADDRESS as usize, DS1685_EXT_DATA as usize],
        _ => Vec::new(),
    };
    cells.extend([PROBE_TOP, PROBE_GUARD_STANDARD, PROBE_GUARD_EXTENDED]);

    let mut saved = Vec::with_capacity(cells.len());
    for &address in &cells {
        saved.push(nvram.read_through(address)?);
    }

    let outcome = run_patterns(&mut nvram);

    let mut restored = Ok(());
    for (&address, &value) in cells.iter().zip(saved.iter()).rev() {
        restored = restored.and(nvram.write_through(address, value));
    }
    let closed = nvram.close();

    let confirmed = outcome?;
    restored?;
    closed?;
    Ok(confirmed)
}

fn run_patterns<P: PortIo>(nvram: &mut Nvram<P>) -> Result<bool, NvramError> {
    for mask in PROBE_MASKS {
        nvram.write_through(PROBE_GUARD_STANDARD, !mask)?;
        nvram.write_through(PROBE_GUARD_EXTENDED, !mask.rotate_left(1))?;
        nvram.write_through(PROBE_TOP, mask)?;

        let top = nvram.read_through(PROBE_TOP)?;
        if top != mask {
            debug!(
                "{}: top cell read {:#04x} instead of {:#04x}",
                nvram.hardware(),
                top,
                mask
            );
            return Ok(false);
        }

        for guard in [PROBE_GUARD_STANDARD, PROBE_GUARD_EXTENDED] {
            if nvram.read_through(guard)? == mask {
                debug!("{}: cell {:#04x} mirrors the top cell", nvram.hardware(), guard);
                return Ok(false);
            }
        }
    }
    Ok(true)
}
