use std::error;
use std::fmt;

use log::*;

use crate::memory::{Cell, Memory};
use crate::processor::{ExecError, Program};

/// Raised when a probe run cannot produce a verdict for a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The probe program faulted or ran out of input.
    Exec { x: Cell, y: Cell, err: ExecError },
    /// The probe program produced something other than one verdict value.
    BadVerdict {
        x: Cell,
        y: Cell,
        outputs: Vec<Cell>,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Exec { x, y, err } => {
                write!(f, "probe at ({}, {}) failed: {}", x, y, err)
            }
            ScanError::BadVerdict { x, y, outputs } => {
                write!(
                    f,
                    "probe at ({}, {}) produced {} outputs instead of one verdict: {:?}",
                    x,
                    y,
                    outputs.len(),
                    outputs
                )
            }
        }
    }
}

impl error::Error for ScanError {}

/// Runs one fresh program per grid point and collects the membership
/// verdicts.
///
/// Every probe clones its own program from the image, feeds it exactly the
/// point's two coordinates, and reads back a single value: zero for
/// outside, anything else for inside. Probes share nothing, so their order
/// is irrelevant.
#[derive(Debug, Clone)]
pub struct Scanner {
    image: Memory,
}

impl Scanner {
    /// Creates a scanner probing with `image`.
    pub fn new(image: Memory) -> Self {
        Self { image }
    }

    /// Tests a single point for membership.
    pub fn probe(&self, x: Cell, y: Cell) -> Result<bool, ScanError> {
        let mut program = Program::new(self.image.clone());
        let outputs = program
            .run_batch(&[x, y])
            .map_err(|err| ScanError::Exec { x, y, err })?;

        match outputs.as_slice() {
            [verdict] => Ok(*verdict != 0),
            _ => Err(ScanError::BadVerdict { x, y, outputs }),
        }
    }

    /// Probes every point of the `width` x `height` domain.
    pub fn scan(&self, width: usize, height: usize) -> Result<Grid, ScanError> {
        let mut cells = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                cells.push(self.probe(x as Cell, y as Cell)?);
            }
        }

        let grid = Grid {
            width,
            height,
            cells,
        };
        info!("{} of {} points are inside", grid.count(), width * height);

        Ok(grid)
    }
}

/// Membership verdicts for a rectangular domain, row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the point at `(x, y)` is a member.
    ///
    /// # Panics
    ///
    /// Panics when the point lies outside the scanned domain.
    pub fn get(&self, x: usize, y: usize) -> bool {
        assert!(x < self.width && y < self.height);
        self.cells[y * self.width + x]
    }

    /// Number of member points.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&inside| inside).count()
    }
}

impl fmt::Display for Grid {
    /// Renders one text row per `y`, `#` for members and `.` for the rest.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width) {
            for &inside in row {
                f.write_str(if inside { "#" } else { "." })?;
            }
            f.write_str("\n")?;
        }

        Ok(())
    }
}
