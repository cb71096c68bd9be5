//! Include path templating
//!
//! `%` escapes in include paths are replaced by the DMI strings of the
//! machine, which lets one config tree carry per-board mappings:
//!
//! | escape | replaced by          |
//! |--------|----------------------|
//! | `%bm`  | BIOS vendor          |
//! | `%bv`  | BIOS version         |
//! | `%br`  | BIOS release date    |
//! | `%sm`  | system manufacturer  |
//! | `%sp`  | system product code  |
//! | `%sv`  | system version       |
//! | `%mm`  | board manufacturer   |
//! | `%mp`  | board product code   |
//! | `%mv`  | board version        |

use super::ParseErrorKind;
use crate::hardware::HardwareDescriptor;

/// Maximum length of a resolved include path, in bytes
pub const PATH_LENGTH_MAX: usize = 1000;

/// Substitute the escapes in `template`
pub fn expand_path(
    template: &str,
    descriptor: &HardwareDescriptor,
) -> Result<String, ParseErrorKind> {
    let mut path = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            path.push(c);
            continue;
        }
        let replacement = match (chars.next(), chars.next()) {
            (Some(group), Some(item)) => descriptor.escape(group, item),
            _ => None,
        };
        match replacement {
            Some(value) => path.push_str(value),
            None => return Err(ParseErrorKind::InvalidEscape(template.to_string())),
        }
    }

    if path.len() > PATH_LENGTH_MAX {
        return Err(ParseErrorKind::PathTooLong(PATH_LENGTH_MAX));
    }
    Ok(path)
}
