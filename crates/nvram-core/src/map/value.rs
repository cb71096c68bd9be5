//! Field values
//!
//! Translates field definitions into register reads and writes, and keeps
//! checksum fields up to date.

use std::fmt;
use thiserror::Error;

use super::field::{BitField, ChecksumField, FieldDefinition, FieldKind, Region};
use super::FieldMap;
use crate::nvram::{NvramError, RegisterFile};

/// Errors from reading or writing a field value
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("invalid value for field {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("string value for field {field} too long ({length} > {max} bytes)")]
    TooLong {
        field: String,
        length: usize,
        max: usize,
    },

    #[error("checksum field {0} is not writable")]
    ChecksumReadOnly(String),

    #[error(transparent)]
    Nvram(#[from] NvramError),
}

/// Current value of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Stored checksum
    Checksum {
        /// Stored value
        value: u32,
        /// Width in bytes
        size: usize,
    },
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Text up to the first NUL
    Text(String),
    /// Bitfield label
    Label(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Checksum { value, size } => {
                write!(f, "0x{:0width$x}", value, width = size * 2)
            }
            FieldValue::Bytes(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                f.write_str(&hex.join(" "))
            }
            FieldValue::Text(text) | FieldValue::Label(text) => f.write_str(text),
        }
    }
}

/// Read the current value of a field
pub fn read_field<R: RegisterFile + ?Sized>(
    regs: &mut R,
    field: &FieldDefinition,
) -> Result<FieldValue, NvramError> {
    match &field.kind {
        FieldKind::Checksum(checksum) => Ok(FieldValue::Checksum {
            value: stored_checksum(regs, checksum)?,
            size: checksum.size(),
        }),
        FieldKind::ByteArray(region) => Ok(FieldValue::Bytes(read_region(regs, region)?)),
        FieldKind::String(region) => {
            let bytes = read_region(regs, region)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            // Register bytes are single byte characters.
            Ok(FieldValue::Text(bytes[..end].iter().map(|&b| b as char).collect()))
        }
        FieldKind::BitField(bitfield) => {
            let index = read_bitfield_index(regs, bitfield)?;
            Ok(FieldValue::Label(bitfield.labels[index].clone()))
        }
    }
}

/// Parse `value` according to the field type and buffer the resulting writes
pub fn write_field<R: RegisterFile + ?Sized>(
    regs: &mut R,
    field: &FieldDefinition,
    value: &str,
) -> Result<(), FieldError> {
    match &field.kind {
        FieldKind::Checksum(_) => Err(FieldError::ChecksumReadOnly(field.name.clone())),
        FieldKind::ByteArray(region) => {
            let bytes = parse_hex_bytes(value, region.length).ok_or_else(|| {
                FieldError::InvalidValue {
                    field: field.name.clone(),
                    value: value.to_string(),
                }
            })?;
            for (address, byte) in region.addresses().zip(bytes) {
                regs.write(address, byte);
            }
            Ok(())
        }
        FieldKind::String(region) => {
            let bytes = value.as_bytes();
            if bytes.len() > region.length {
                return Err(FieldError::TooLong {
                    field: field.name.clone(),
                    length: bytes.len(),
                    max: region.length,
                });
            }
            for (address, &byte) in region.addresses().zip(bytes) {
                regs.write(address, byte);
            }
            if bytes.len() < region.length {
                regs.write(region.position + bytes.len(), 0);
            }
            Ok(())
        }
        FieldKind::BitField(bitfield) => {
            let index = bitfield
                .label_index(value)
                .ok_or_else(|| FieldError::InvalidValue {
                    field: field.name.clone(),
                    value: value.to_string(),
                })?;
            write_bitfield_index(regs, bitfield, index)?;
            Ok(())
        }
    }
}

/// Checksum over the field's region as it currently reads
pub fn compute_checksum<R: RegisterFile + ?Sized>(
    regs: &mut R,
    checksum: &ChecksumField,
) -> Result<u32, NvramError> {
    let mut sum = 0u32;
    for address in checksum.region.addresses() {
        sum = sum.wrapping_add(regs.read(address)? as u32);
    }
    if checksum.algorithm.is_negative() {
        sum = sum.wrapping_neg();
    }
    Ok(sum & checksum.mask())
}

/// Checksum as stored, least significant byte at the first position
pub fn stored_checksum<R: RegisterFile + ?Sized>(
    regs: &mut R,
    checksum: &ChecksumField,
) -> Result<u32, NvramError> {
    let mut value = 0u32;
    for &position in checksum.positions.iter().rev() {
        value = (value << 8) | regs.read(position)? as u32;
    }
    Ok(value)
}

/// Whether the stored checksum matches the computed one.
/// Returns `(computed, stored)` alongside.
pub fn verify_checksum<R: RegisterFile + ?Sized>(
    regs: &mut R,
    checksum: &ChecksumField,
) -> Result<(bool, u32, u32), NvramError> {
    let computed = compute_checksum(regs, checksum)?;
    let stored = stored_checksum(regs, checksum)?;
    Ok((computed == stored, computed, stored))
}

/// Recompute every checksum field of the table and buffer the new values
pub fn update_checksums<R: RegisterFile + ?Sized>(
    regs: &mut R,
    map: &FieldMap,
) -> Result<(), NvramError> {
    for (field, checksum) in map.checksums() {
        let value = compute_checksum(regs, checksum)?;
        for (i, &position) in checksum.positions.iter().enumerate() {
            regs.write(position, (value >> (8 * i)) as u8);
        }
        tracing::debug!("checksum {} updated to {:#x}", field.name, value);
    }
    Ok(())
}

fn read_region<R: RegisterFile + ?Sized>(
    regs: &mut R,
    region: &Region,
) -> Result<Vec<u8>, NvramError> {
    region.addresses().map(|address| regs.read(address)).collect()
}

fn read_bitfield_index<R: RegisterFile + ?Sized>(
    regs: &mut R,
    bitfield: &BitField,
) -> Result<usize, NvramError> {
    let mut index = 0;
    for (i, position) in bitfield.positions.iter().enumerate() {
        if regs.read(position.byte)? & (1 << position.bit) != 0 {
            index |= 1 << i;
        }
    }
    Ok(index)
}

fn write_bitfield_index<R: RegisterFile + ?Sized>(
    regs: &mut R,
    bitfield: &BitField,
    index: usize,
) -> Result<(), NvramError> {
    for (i, position) in bitfield.positions.iter().enumerate() {
        let mut byte = regs.read(position.byte)?;
        byte &= !(1 << position.bit);
        if index & (1 << i) != 0 {
            byte |= 1 << position.bit;
        }
        regs.write(position.byte, byte);
    }
    Ok(())
}

/// Parse exactly `length` two digit hex bytes separated by single spaces
fn parse_hex_bytes(text: &str, length: usize) -> Option<Vec<u8>> {
    if length == 0 {
        return text.is_empty().then(Vec::new);
    }
    let bytes: Vec<u8> = text
        .split(' ')
        .map(|part| {
            if part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()) {
                u8::from_str_radix(part, 16).ok()
            } else {
                None
            }
        })
        .collect::<Option<_>>()?;
    (bytes.len() == length).then_some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{BitPosition, ChecksumAlgorithm};
    use crate::NVRAM_SIZE;

    /// Plain memory standing in for an NVRAM session
    struct Memory([u8; NVRAM_SIZE]);

    impl RegisterFile for Memory {
        fn read(&mut self, address: usize) -> Result<u8, NvramError> {
            Ok(self.0.get(address).copied().unwrap_or(0xff))
        }

        fn write(&mut self, address: usize, value: u8) {
            if let Some(cell) = self.0.get_mut(address) {
                *cell = value;
            }
        }
    }

    fn checksum(algorithm: ChecksumAlgorithm, positions: Vec<usize>) -> ChecksumField {
        ChecksumField {
            algorithm,
            positions,
            region: Region::new(0x10, 4).unwrap(),
        }
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("00 05", 2), Some(vec![0x00, 0x05]));
        assert_eq!(parse_hex_bytes("aB", 1), Some(vec![0xab]));
        assert_eq!(parse_hex_bytes("00 05", 1), None);
        assert_eq!(parse_hex_bytes("00  05", 2), None);
        assert_eq!(parse_hex_bytes("0 05", 2), None);
        assert_eq!(parse_hex_bytes("zz", 1), None);
        assert_eq!(parse_hex_bytes("", 0), Some(vec![]));
    }

    #[test]
    fn test_standard_and_negative_sums() {
        let mut memory = Memory([0; NVRAM_SIZE]);
        memory.0[0x10..0x14].copy_from_slice(&[0xff, 0xff, 0x10, 0x01]);
        let sum: u32 = 0xff + 0xff + 0x10 + 0x01;

        let standard = checksum(ChecksumAlgorithm::Standard, vec![0x2e, 0x2f]);
        assert_eq!(compute_checksum(&mut memory, &standard).unwrap(), sum & 0xffff);

        let short = checksum(ChecksumAlgorithm::Short, vec![0x2e]);
        assert_eq!(compute_checksum(&mut memory, &short).unwrap(), sum & 0xff);

        let negative = checksum(ChecksumAlgorithm::NegativeSum, vec![0x2e, 0x2f]);
        assert_eq!(
            compute_checksum(&mut memory, &negative).unwrap(),
            0u32.wrapping_sub(sum) & 0xffff
        );

        let negative_short = checksum(ChecksumAlgorithm::NegativeShort, vec![0x2e]);
        assert_eq!(
            compute_checksum(&mut memory, &negative_short).unwrap(),
            0u32.wrapping_sub(sum) & 0xff
        );
    }

    #[test]
    fn test_stored_checksum_is_little_endian() {
        let mut memory = Memory([0; NVRAM_SIZE]);
        memory.0[0x2e] = 0x34;
        memory.0[0x2f] = 0x12;
        let standard = checksum(ChecksumAlgorithm::Standard, vec![0x2e, 0x2f]);
        assert_eq!(stored_checksum(&mut memory, &standard).unwrap(), 0x1234);

        let value = FieldValue::Checksum {
            value: 0x1234,
            size: 2,
        };
        assert_eq!(value.to_string(), "0x1234");
    }

    #[test]
    fn test_bitfield_keeps_other_bits() {
        let mut memory = Memory([0; NVRAM_SIZE]);
        memory.0[0x40] = 0b1010_0101;
        let field = FieldDefinition {
            name: "mode".to_string(),
            kind: FieldKind::BitField(BitField {
                positions: vec![BitPosition { byte: 0x40, bit: 1 }, BitPosition { byte: 0x41, bit: 7 }],
                labels: ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
            }),
        };

        write_field(&mut memory, &field, "d").unwrap();
        assert_eq!(memory.0[0x40], 0b1010_0111);
        assert_eq!(memory.0[0x41], 0b1000_0000);
        assert_eq!(read_field(&mut memory, &field).unwrap(), FieldValue::Label("d".to_string()));

        write_field(&mut memory, &field, "a").unwrap();
        assert_eq!(memory.0[0x40], 0b1010_0101);
        assert_eq!(memory.0[0x41], 0);

        assert!(matches!(
            write_field(&mut memory, &field, "e"),
            Err(FieldError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_string_terminates_short_values() {
        let mut memory = Memory([b'x'; NVRAM_SIZE]);
        let field = FieldDefinition {
            name: "owner".to_string(),
            kind: FieldKind::String(Region::new(0x50, 6).unwrap()),
        };

        write_field(&mut memory, &field, "abc").unwrap();
        assert_eq!(&memory.0[0x50..0x56], b"abc\0xx");
        assert_eq!(read_field(&mut memory, &field).unwrap(), FieldValue::Text("abc".to_string()));

        write_field(&mut memory, &field, "abcdef").unwrap();
        assert_eq!(read_field(&mut memory, &field).unwrap().to_string(), "abcdef");

        assert!(matches!(
            write_field(&mut memory, &field, "abcdefg"),
            Err(FieldError::TooLong { length: 7, max: 6, .. })
        ));
    }

    #[test]
    fn test_update_checksums_stores_low_byte_first() {
        let mut memory = Memory([0; NVRAM_SIZE]);
        memory.0[0x10] = 0xff;
        memory.0[0x11] = 0x02;
        let mut map = FieldMap::new();
        map.insert(FieldDefinition {
            name: "sum".to_string(),
            kind: FieldKind::Checksum(checksum(ChecksumAlgorithm::Standard, vec![0x2e, 0x2f])),
        })
        .unwrap();

        update_checksums(&mut memory, &map).unwrap();
        assert_eq!(memory.0[0x2e], 0x01);
        assert_eq!(memory.0[0x2f], 0x01);

        let (_, checksum) = map.checksums().next().unwrap();
        assert_eq!(verify_checksum(&mut memory, checksum).unwrap(), (true, 0x101, 0x101));
    }
}
