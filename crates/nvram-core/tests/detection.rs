//! Tests for hardware type detection

use nvram_core::hardware::HardwareType;
use nvram_core::nvram::detect::{probe, PROBE_GUARD_EXTENDED, PROBE_GUARD_STANDARD, PROBE_TOP};
use nvram_core::nvram::{
    detect_hardware, SimulatedChipset, SimulatedLayout, DS1685_EXT_ADDRESS, DS1685_EXT_DATA,
    REGISTER_A,
};

fn detect(layout: SimulatedLayout) -> HardwareType {
    let mut sim = SimulatedChipset::new(layout);
    detect_hardware(&mut sim).unwrap()
}

#[test]
fn test_detect_each_layout() {
    assert_eq!(detect(SimulatedLayout::Standard), HardwareType::Standard);
    assert_eq!(detect(SimulatedLayout::Intel), HardwareType::Intel);
    assert_eq!(detect(SimulatedLayout::Via82Cxx), HardwareType::Via82Cxx);
    assert_eq!(detect(SimulatedLayout::Via823x), HardwareType::Via823x);
    assert_eq!(detect(SimulatedLayout::Ds1685), HardwareType::Ds1685);
}

#[test]
fn test_mirrored_extended_index_is_not_extended_storage() {
    // 0x72/0x73 answer, but only alias the standard bytes.
    assert_eq!(
        detect(SimulatedLayout::MirroredExtended),
        HardwareType::Standard
    );
}

#[test]
fn test_intel_probe_rejects_via82cxx() {
    let mut sim = SimulatedChipset::new(SimulatedLayout::Via82Cxx);
    assert!(!probe(&mut sim, HardwareType::Intel).unwrap());
    assert!(probe(&mut sim, HardwareType::Via82Cxx).unwrap());
}

#[test]
fn test_via82cxx_probe_on_intel_layout() {
    // Intel ignores index bit 7, so the VIA 82Cxxx sequence works there too.
    // Priority order keeps Intel first.
    let mut sim = SimulatedChipset::new(SimulatedLayout::Intel);
    assert!(probe(&mut sim, HardwareType::Via82Cxx).unwrap());
    assert_eq!(detect_hardware(&mut sim).unwrap(), HardwareType::Intel);
}

#[test]
fn test_probe_restores_cells() {
    let layouts = [
        SimulatedLayout::Standard,
        SimulatedLayout::MirroredExtended,
        SimulatedLayout::Intel,
        SimulatedLayout::Via82Cxx,
        SimulatedLayout::Via823x,
        SimulatedLayout::Ds1685,
    ];
    let cells = [
        PROBE_TOP,
        PROBE_GUARD_STANDARD,
        PROBE_GUARD_EXTENDED,
        DS1685_EXT_ADDRESS as usize,
        DS1685_EXT_DATA as usize,
        REGISTER_A as usize,
    ];

    for layout in layouts {
        let mut sim = SimulatedChipset::new(layout);
        for (i, &cell) in cells.iter().enumerate() {
            sim.poke(cell, 0x20 + i as u8);
        }
        let before: Vec<u8> = cells.iter().map(|&c| sim.peek(c)).collect();

        detect_hardware(&mut sim).unwrap();

        let after: Vec<u8> = cells.iter().map(|&c| sim.peek(c)).collect();
        assert_eq!(before, after, "{layout:?}");
        assert!(!sim.is_acquired(), "{layout:?}");
    }
}

#[test]
fn test_detect_without_port_access() {
    let mut sim = SimulatedChipset::unavailable(SimulatedLayout::Intel);
    assert!(detect_hardware(&mut sim).is_err());
}
