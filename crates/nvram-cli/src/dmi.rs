//! Machine identification from the DMI tables exported in sysfs

use std::fs;
use std::path::Path;

use nvram_core::hardware::HardwareDescriptor;

/// Where the kernel exports the DMI identification strings
pub const DMI_DIR: &str = "/sys/class/dmi/id";

/// Read the identification strings from `dir`. Missing entries are empty,
/// bytes that are not UTF-8 become U+FFFD.
///
/// Cooked strings have `/` replaced by `%` so they can be used as path
/// components, and surrounding whitespace removed.
pub fn read_descriptor(dir: &Path, cook: bool) -> HardwareDescriptor {
    let read = |name: &str| {
        let raw = match fs::read(dir.join(name)) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!("DMI entry {} unavailable: {}", name, e);
                String::new()
            }
        };
        if cook {
            cook_string(&raw)
        } else {
            raw.strip_suffix('\n').unwrap_or(&raw).to_string()
        }
    };

    HardwareDescriptor {
        bios_vendor: read("bios_vendor"),
        bios_version: read("bios_version"),
        bios_release_date: read("bios_date"),
        system_manufacturer: read("sys_vendor"),
        system_product: read("product_name"),
        system_version: read("product_version"),
        board_manufacturer: read("board_vendor"),
        board_product: read("board_name"),
        board_version: read("board_version"),
        ..Default::default()
    }
}

fn cook_string(raw: &str) -> String {
    raw.replace('/', "%").trim().to_string()
}
