//! Hardware identification
//!
//! The chipset type selects the addressing scheme used for the upper half of
//! the register file. The descriptor strings come from the BIOS/DMI tables and
//! are substituted into include paths by the config interpreter.

use serde::Serialize;
use std::fmt;

/// Chipset family, which decides how addresses 128..255 are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareType {
    /// Plain MC146818 compatible RTC without extended storage
    #[default]
    Standard,
    /// Intel: second index/data pair at 0x72/0x73
    Intel,
    /// VIA 82Cxxx: 0x72/0x73 indexed with bit 7 set
    Via82Cxx,
    /// VIA 823x: 0x74/0x75
    Via823x,
    /// Dallas DS1685: bank 1 extended address/data registers
    Ds1685,
    /// Probe the hardware on open
    Detect,
}

impl HardwareType {
    /// Keywords recognized by the `hardware` directive, in enum order.
    pub const KEYWORDS: &'static [&'static str] = &[
        "standard", "intel", "via82cxx", "via823x", "ds1685", "detect",
    ];

    /// Candidates tried by detection, highest priority first.
    pub const PROBE_ORDER: [HardwareType; 4] = [
        HardwareType::Intel,
        HardwareType::Via82Cxx,
        HardwareType::Via823x,
        HardwareType::Ds1685,
    ];

    /// Map a keyword index (see [`HardwareType::KEYWORDS`]) back to a type
    pub fn from_keyword_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(HardwareType::Standard),
            1 => Some(HardwareType::Intel),
            2 => Some(HardwareType::Via82Cxx),
            3 => Some(HardwareType::Via823x),
            4 => Some(HardwareType::Ds1685),
            5 => Some(HardwareType::Detect),
            _ => None,
        }
    }

    /// Config keyword for this type
    pub fn keyword(&self) -> &'static str {
        match self {
            HardwareType::Standard => "standard",
            HardwareType::Intel => "intel",
            HardwareType::Via82Cxx => "via82cxx",
            HardwareType::Via823x => "via823x",
            HardwareType::Ds1685 => "ds1685",
            HardwareType::Detect => "detect",
        }
    }

    /// Whether this type can reach addresses 128..255
    pub fn has_extended_storage(&self) -> bool {
        !matches!(self, HardwareType::Standard | HardwareType::Detect)
    }
}

impl fmt::Display for HardwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Identification of the machine, as read from DMI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareDescriptor {
    /// Initial chipset type; the `hardware` directive overrides it
    pub hardware: HardwareType,
    /// BIOS vendor (`%bm`)
    pub bios_vendor: String,
    /// BIOS version (`%bv`)
    pub bios_version: String,
    /// BIOS release date (`%br`)
    pub bios_release_date: String,
    /// System manufacturer (`%sm`)
    pub system_manufacturer: String,
    /// System product code (`%sp`)
    pub system_product: String,
    /// System version (`%sv`)
    pub system_version: String,
    /// Board manufacturer (`%mm`)
    pub board_manufacturer: String,
    /// Board product code (`%mp`)
    pub board_product: String,
    /// Board version (`%mv`)
    pub board_version: String,
}

impl HardwareDescriptor {
    /// Look up the string selected by a two character path escape
    /// (the characters following `%`).
    pub fn escape(&self, group: char, item: char) -> Option<&str> {
        let value = match (group, item) {
            ('b', 'm') => &self.bios_vendor,
            ('b', 'v') => &self.bios_version,
            ('b', 'r') => &self.bios_release_date,
            ('s', 'm') => &self.system_manufacturer,
            ('s', 'p') => &self.system_product,
            ('s', 'v') => &self.system_version,
            ('m', 'm') => &self.board_manufacturer,
            ('m', 'p') => &self.board_product,
            ('m', 'v') => &self.board_version,
            _ => return None,
        };
        Some(value.as_str())
    }
}
