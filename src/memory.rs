use std::error;
use std::fmt;

pub mod parse;

/// A single memory cell. Programs routinely hold values well past 32 bits.
pub type Cell = i64;

/// Raised when a program touches an address below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegativeAddress {
    pub address: Cell,
}

impl fmt::Display for NegativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "negative memory address `{}`", self.address)
    }
}

impl error::Error for NegativeAddress {}

/// Emulates memory for use with the machine.
///
/// The store grows on demand: reads past the current extent yield 0 and
/// writes past it zero-fill up to the written address. Growth goes through
/// `Vec::resize`, so capacity expands geometrically rather than per-write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Memory {
    cells: Vec<Cell>,
}

impl Memory {
    /// Initializes the memory from an image.
    pub fn new(image: Vec<Cell>) -> Self {
        Memory { cells: image }
    }

    /// Reads the cell at `address`. Never-written addresses read as 0.
    pub fn read(&self, address: Cell) -> Result<Cell, NegativeAddress> {
        let index = self.index(address)?;
        Ok(self.cells.get(index).copied().unwrap_or(0))
    }

    /// Writes `value` to `address`, growing the store if needed.
    pub fn write(&mut self, address: Cell, value: Cell) -> Result<(), NegativeAddress> {
        let index = self.index(address)?;
        if index >= self.cells.len() {
            self.cells.resize(index + 1, 0);
        }
        self.cells[index] = value;
        Ok(())
    }

    /// Number of cells currently backed by storage.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, address: Cell) -> Result<usize, NegativeAddress> {
        if address < 0 {
            Err(NegativeAddress { address })
        } else {
            Ok(address as usize)
        }
    }
}
