//! Field definitions
//!
//! Each entry of the mapping table names a region of the register file and
//! says how to interpret it.

use serde::Serialize;
use std::fmt;

use crate::NVRAM_SIZE;

/// Maximum number of bits in a bitfield
pub const BITFIELD_MAX_BITS: usize = 5;

/// A named field of the register file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    /// Unique field name
    pub name: String,
    /// Layout of the field
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Layout of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Checksum over a region, stored at one or two positions
    Checksum(ChecksumField),
    /// Raw bytes
    ByteArray(Region),
    /// NUL terminated text
    String(Region),
    /// Up to five bits scattered over the register file, mapped to labels
    BitField(BitField),
}

/// A contiguous run of bytes `[position, position + length)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    /// First address
    pub position: usize,
    /// Number of bytes
    pub length: usize,
}

impl Region {
    /// Create a region, checking that it lies inside the register file
    pub fn new(position: usize, length: usize) -> Option<Self> {
        if position < NVRAM_SIZE && position + length <= NVRAM_SIZE {
            Some(Self { position, length })
        } else {
            None
        }
    }

    /// Iterate over the addresses of the region
    pub fn addresses(&self) -> std::ops::Range<usize> {
        self.position..self.position + self.length
    }
}

/// Checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumAlgorithm {
    /// Two byte arithmetic sum
    Standard,
    /// One byte arithmetic sum
    Short,
    /// Two byte negated sum
    NegativeSum,
    /// One byte negated sum
    NegativeShort,
}

impl ChecksumAlgorithm {
    /// Keywords recognized by the `checksum` directive, in enum order
    pub const KEYWORDS: &'static [&'static str] =
        &["standard", "short", "negative_sum", "negative_short"];

    /// Map a keyword index back to an algorithm
    pub fn from_keyword_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ChecksumAlgorithm::Standard),
            1 => Some(ChecksumAlgorithm::Short),
            2 => Some(ChecksumAlgorithm::NegativeSum),
            3 => Some(ChecksumAlgorithm::NegativeShort),
            _ => None,
        }
    }

    /// Config keyword for this algorithm
    pub fn keyword(&self) -> &'static str {
        Self::KEYWORDS[*self as usize]
    }

    /// Number of storage positions, which is also the checksum width in bytes
    pub fn storage_bytes(&self) -> usize {
        match self {
            ChecksumAlgorithm::Standard | ChecksumAlgorithm::NegativeSum => 2,
            ChecksumAlgorithm::Short | ChecksumAlgorithm::NegativeShort => 1,
        }
    }

    /// Whether the sum is negated before storing
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            ChecksumAlgorithm::NegativeSum | ChecksumAlgorithm::NegativeShort
        )
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Checksum layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumField {
    /// Algorithm
    pub algorithm: ChecksumAlgorithm,
    /// Storage positions, least significant byte first
    pub positions: Vec<usize>,
    /// Region summed by the checksum
    pub region: Region,
}

impl ChecksumField {
    /// Checksum width in bytes
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Mask selecting the stored width of the checksum
    pub fn mask(&self) -> u32 {
        (1u32 << (8 * self.size())) - 1
    }
}

/// A single bit of the register file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BitPosition {
    /// Byte address
    pub byte: usize,
    /// Bit number, 0..=7
    pub bit: u8,
}

/// Bitfield layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitField {
    /// Bit positions, least significant bit of the index first
    pub positions: Vec<BitPosition>,
    /// One label per index value, `2^positions.len()` entries
    pub labels: Vec<String>,
}

impl BitField {
    /// Number of bits
    pub fn bits(&self) -> usize {
        self.positions.len()
    }

    /// Index of a label
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl FieldDefinition {
    /// Config keyword that declares this kind of field
    pub fn keyword(&self) -> &'static str {
        match self.kind {
            FieldKind::Checksum(_) => "checksum",
            FieldKind::ByteArray(_) => "bytearray",
            FieldKind::String(_) => "string",
            FieldKind::BitField(_) => "bitfield",
        }
    }
}

/// Formats the field as the directive that declares it
impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword(), self.name)?;
        match &self.kind {
            FieldKind::Checksum(checksum) => {
                write!(f, " {}", checksum.algorithm)?;
                for position in &checksum.positions {
                    write!(f, " {:#04x}", position)?;
                }
                write!(
                    f,
                    " {:#04x} {}",
                    checksum.region.position, checksum.region.length
                )
            }
            FieldKind::ByteArray(region) | FieldKind::String(region) => {
                write!(f, " {:#04x} {}", region.position, region.length)
            }
            FieldKind::BitField(bitfield) => {
                write!(f, " {}", bitfield.bits())?;
                for position in &bitfield.positions {
                    write!(f, " {:#04x}:{}", position.byte, position.bit)?;
                }
                for label in &bitfield.labels {
                    write!(f, " {}", label)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        assert!(Region::new(0, 256).is_some());
        assert!(Region::new(255, 1).is_some());
        assert!(Region::new(255, 2).is_none());
        assert!(Region::new(256, 0).is_none());
    }

    #[test]
    fn test_checksum_mask() {
        let checksum = ChecksumField {
            algorithm: ChecksumAlgorithm::Short,
            positions: vec![0x3f],
            region: Region::new(0x10, 4).unwrap(),
        };
        assert_eq!(checksum.mask(), 0xff);
        assert_eq!(checksum.size(), ChecksumAlgorithm::Short.storage_bytes());
    }

    #[test]
    fn test_display_matches_directive_syntax() {
        let field = FieldDefinition {
            name: "boot".to_string(),
            kind: FieldKind::BitField(BitField {
                positions: vec![BitPosition { byte: 0x40, bit: 3 }],
                labels: vec!["off".to_string(), "on".to_string()],
            }),
        };
        assert_eq!(field.to_string(), "bitfield boot 1 0x40:3 off on");

        let field = FieldDefinition {
            name: "sum".to_string(),
            kind: FieldKind::Checksum(ChecksumField {
                algorithm: ChecksumAlgorithm::Standard,
                positions: vec![0x2e, 0x2f],
                region: Region::new(0x10, 30).unwrap(),
            }),
        };
        assert_eq!(field.to_string(), "checksum sum standard 0x2e 0x2f 0x10 30");
    }
}
