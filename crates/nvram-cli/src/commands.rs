//! Command implementations
//!
//! Commands run against any [`PortIo`] backend and write their results to
//! the given writer, diagnostics go through `tracing`.

use std::io::Write;
use std::ops::Range;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

use nvram_core::map::stored_checksum;
use nvram_core::nvram::detect_hardware;
use nvram_core::prelude::*;

/// Behavior switches for `set`
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Recompute every checksum field after writing
    pub update_checksums: bool,
    /// Commit the buffered writes; false is a dry run
    pub write_to_nvram: bool,
}

/// Print the DMI strings, dump every addressing scheme and report the
/// detected hardware type.
pub fn probe(
    ports: &mut dyn PortIo,
    descriptor: &HardwareDescriptor,
    out: &mut dyn Write,
) -> Result<()> {
    writeln!(out, "BIOS vendor: '{}'", descriptor.bios_vendor)?;
    writeln!(out, "BIOS version: '{}'", descriptor.bios_version)?;
    writeln!(out, "BIOS release date: '{}'", descriptor.bios_release_date)?;
    writeln!(out, "System manufacturer: '{}'", descriptor.system_manufacturer)?;
    writeln!(out, "System productcode: '{}'", descriptor.system_product)?;
    writeln!(out, "System version: '{}'", descriptor.system_version)?;
    writeln!(out, "Board manufacturer: '{}'", descriptor.board_manufacturer)?;
    writeln!(out, "Board productcode: '{}'", descriptor.board_product)?;
    writeln!(out, "Board version: '{}'", descriptor.board_version)?;

    dump(
        ports,
        HardwareType::Standard,
        0..128,
        "Standard NVRAM (0..127):",
        out,
    )?;
    for hardware in HardwareType::PROBE_ORDER {
        let label = format!("Extended NVRAM ({}, 128..255):", hardware);
        dump(ports, hardware, 128..256, &label, out)?;
    }

    let detected = detect_hardware(ports).context("hardware detection failed")?;
    writeln!(out, "Detected hardware type: {}", detected)?;
    Ok(())
}

fn dump(
    ports: &mut dyn PortIo,
    hardware: HardwareType,
    range: Range<usize>,
    label: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let mut nvram = Nvram::open(&mut *ports, hardware)?;
    write!(out, "{}", label)?;
    for address in range {
        write!(out, " {:02x}", nvram.read(address)?)?;
    }
    writeln!(out)?;
    nvram.close()?;
    Ok(())
}

/// Print the field table in config syntax, or as JSON
pub fn list(config: &NvramConfig, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, &config.fields)?;
        writeln!(out)?;
        return Ok(());
    }
    for field in &config.fields {
        writeln!(out, "{}", field)?;
    }
    Ok(())
}

/// Print the value of each named field, one per line
pub fn get(
    ports: &mut dyn PortIo,
    config: &NvramConfig,
    names: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let fields = names
        .iter()
        .map(|name| lookup(config, name))
        .collect::<Result<Vec<_>>>()?;

    let mut nvram = Nvram::open(ports, config.hardware)?;
    for field in fields {
        let value = read_field(&mut nvram, field)
            .with_context(|| format!("reading field {}", field.name))?;
        writeln!(out, "{}", value)?;
    }
    nvram.close()?;
    Ok(())
}

/// Write `NAME VALUE` pairs, then update checksums and flush as configured
pub fn set(
    ports: &mut dyn PortIo,
    config: &NvramConfig,
    assignments: &[String],
    settings: &Settings,
) -> Result<()> {
    let mut pairs = Vec::with_capacity(assignments.len() / 2);
    for pair in assignments.chunks(2) {
        let field = lookup(config, &pair[0])?;
        let Some(value) = pair.get(1) else {
            bail!("value for field {} missing on command line", field.name);
        };
        pairs.push((field, value));
    }

    let mut nvram = Nvram::open(ports, config.hardware)?;
    for (field, value) in pairs {
        match write_field(&mut nvram, field, value) {
            Ok(()) => debug!("field {} set to {:?}", field.name, value),
            Err(FieldError::ChecksumReadOnly(name)) => {
                info!("(ignored) will not write checksum field {}", name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if settings.update_checksums {
        update_checksums(&mut nvram, &config.fields)?;
    }

    if settings.write_to_nvram {
        let written = nvram.flush()?;
        debug!("{} byte(s) written", written);
    } else {
        info!(
            "dry run, {} byte(s) not written to NVRAM",
            nvram.pending_writes()
        );
    }
    nvram.close()?;
    Ok(())
}

/// Verify checksum fields, all of them if `names` is empty. Named fields
/// that are not checksums are skipped.
pub fn check(
    ports: &mut dyn PortIo,
    config: &NvramConfig,
    names: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let fields: Vec<&FieldDefinition> = if names.is_empty() {
        config.fields.iter().collect()
    } else {
        names
            .iter()
            .map(|name| lookup(config, name))
            .collect::<Result<_>>()?
    };

    let mut nvram = Nvram::open(ports, config.hardware)?;
    for field in fields {
        let FieldKind::Checksum(checksum) = &field.kind else {
            continue;
        };
        let computed = compute_checksum(&mut nvram, checksum)?;
        let stored = stored_checksum(&mut nvram, checksum)?;
        if computed == stored {
            writeln!(out, "{} OK", field.name)?;
        } else {
            writeln!(
                out,
                "{} FAIL (0x{:08x} calculated vs. 0x{:08x} read)",
                field.name, computed, stored
            )?;
        }
    }
    nvram.close()?;
    Ok(())
}

fn lookup<'a>(config: &'a NvramConfig, name: &str) -> Result<&'a FieldDefinition> {
    config
        .fields
        .get(name)
        .ok_or_else(|| anyhow!("unknown field {}", name))
}
