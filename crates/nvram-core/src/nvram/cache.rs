//! Write-back register cache
//!
//! Buffers every byte read from or written to the register file during one
//! session. Writes are only committed by an explicit flush.

use crate::NVRAM_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    value: u8,
    valid: bool,
    written: bool,
    flushed: bool,
}

/// Cache over the whole 256 byte address space
#[derive(Debug, Clone)]
pub struct RegisterCache {
    cells: [Cell; NVRAM_SIZE],
}

impl RegisterCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            cells: [Cell::default(); NVRAM_SIZE],
        }
    }

    /// Cached value, if the cell is valid
    pub fn get(&self, address: usize) -> Option<u8> {
        self.cells
            .get(address)
            .filter(|cell| cell.valid)
            .map(|cell| cell.value)
    }

    /// Record a value read from hardware
    pub fn fill(&mut self, address: usize, value: u8) {
        if let Some(cell) = self.cells.get_mut(address) {
            cell.value = value;
            cell.valid = true;
        }
    }

    /// Record a buffered write
    pub fn store(&mut self, address: usize, value: u8) {
        if let Some(cell) = self.cells.get_mut(address) {
            *cell = Cell {
                value,
                valid: true,
                written: true,
                flushed: false,
            };
        }
    }

    /// Mark a written cell as committed. `written` stays set.
    pub fn mark_flushed(&mut self, address: usize) {
        if let Some(cell) = self.cells.get_mut(address) {
            cell.flushed = true;
        }
    }

    /// Forget a cell, so the next read goes to hardware
    pub fn invalidate(&mut self, address: usize) {
        if let Some(cell) = self.cells.get_mut(address) {
            *cell = Cell::default();
        }
    }

    /// Whether a cell has been written in this session
    #[cfg(test)]
    pub(crate) fn is_written(&self, address: usize) -> bool {
        self.cells.get(address).is_some_and(|cell| cell.written)
    }

    /// Whether a cell has a write that has not been committed yet
    pub fn is_pending(&self, address: usize) -> bool {
        self.cells
            .get(address)
            .is_some_and(|cell| cell.valid && cell.written && !cell.flushed)
    }

    /// Cells eligible for flushing, as `(address, value)` in address order
    pub fn pending(&self) -> Vec<(usize, u8)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.valid && cell.written && !cell.flushed)
            .map(|(address, cell)| (address, cell.value))
            .collect()
    }

    /// Count of cells waiting for a flush
    pub fn pending_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.valid && cell.written && !cell.flushed)
            .count()
    }

    /// Drop every cached cell
    pub fn clear(&mut self) {
        self.cells = [Cell::default(); NVRAM_SIZE];
    }
}

impl Default for RegisterCache {
    fn default() -> Self {
        Self::new()
    }
}
