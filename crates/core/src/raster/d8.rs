//! D8 direction records for single-flow-direction routing
//!
//! Direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = no outflow (pit/flat), 1-8 = compass direction of the receiving
//! neighbor. Every flow-routing algorithm iterates the one record table
//! below instead of branching per direction code.

use std::f64::consts::SQRT_2;

/// Direction code for cells with no outflow.
pub const NO_FLOW: u8 = 0;

/// Nodata sentinel for direction rasters. A valid cell is 0-8, so 255 never
/// collides with a direction code or an inflow bitmask.
pub const DIR_NODATA: u8 = u8::MAX;

/// One of the eight compass directions a cell can drain toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    /// Direction code, 1-8
    pub code: u8,
    /// Bit flagging this direction in an inflow bitmask: `1 << (code - 1)`
    pub mask_bit: u8,
    /// Row offset toward the receiving neighbor
    pub dr: isize,
    /// Column offset toward the receiving neighbor
    pub dc: isize,
    /// Code of the reciprocal direction
    pub opposite: u8,
    /// Center-to-center distance in cell-size units (1 or sqrt(2))
    pub distance: f64,
}

/// The eight directions in tie-break priority order: E, NE, N, NW, W, SW, S, SE.
pub const DIRECTIONS: [Direction; 8] = [
    Direction { code: 1, mask_bit: 1 << 0, dr: 0, dc: 1, opposite: 5, distance: 1.0 },
    Direction { code: 2, mask_bit: 1 << 1, dr: -1, dc: 1, opposite: 6, distance: SQRT_2 },
    Direction { code: 3, mask_bit: 1 << 2, dr: -1, dc: 0, opposite: 7, distance: 1.0 },
    Direction { code: 4, mask_bit: 1 << 3, dr: -1, dc: -1, opposite: 8, distance: SQRT_2 },
    Direction { code: 5, mask_bit: 1 << 4, dr: 0, dc: -1, opposite: 1, distance: 1.0 },
    Direction { code: 6, mask_bit: 1 << 5, dr: 1, dc: -1, opposite: 2, distance: SQRT_2 },
    Direction { code: 7, mask_bit: 1 << 6, dr: 1, dc: 0, opposite: 3, distance: 1.0 },
    Direction { code: 8, mask_bit: 1 << 7, dr: 1, dc: 1, opposite: 4, distance: SQRT_2 },
];

/// Look up the record for a direction code (1-8).
pub fn by_code(code: u8) -> Option<&'static Direction> {
    if (1..=8).contains(&code) {
        Some(&DIRECTIONS[(code - 1) as usize])
    } else {
        None
    }
}

/// Center-to-center distance factor for a direction code; cells without an
/// outflow direction traverse the orthogonal length.
pub fn distance_factor(code: u8) -> f64 {
    by_code(code).map_or(1.0, |d| d.distance)
}
