//! D8 flow direction and inflow masks
//!
//! Calculates, per cell, the single steepest-descent outflow direction over
//! the filled DEM, and the bitmask of neighbors whose outflow points back at
//! the cell.
//!
//! Direction encoding (see [`d8`]):
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = no outflow (pit or flat), 255 = nodata. Descent is compared as
//! drop / planar distance, so diagonal neighbors are not favored over
//! nearer orthogonal ones. Ties keep the first direction in table priority
//! order (E, NE, N, NW, W, SW, S, SE).

use crate::maybe_rayon::par_rows;
use lsfactor_core::raster::{d8, Raster};
use lsfactor_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// The input should be hydrologically conditioned (sinks filled) so that
/// every cell away from flats has a strictly lower neighbor.
///
/// # Arguments
/// * `dem` - Input DEM (ideally filled)
///
/// # Returns
/// `Raster<u8>` with direction codes 1-8, [`d8::NO_FLOW`] for cells with no
/// strictly lower valid neighbor, and nodata [`d8::DIR_NODATA`] where the
/// DEM is nodata
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();

    let output_data: Vec<u8> = par_rows(rows, |row| {
        let mut row_data = vec![d8::DIR_NODATA; cols];

        for col in 0..cols {
            let center = unsafe { dem.get_unchecked(row, col) };
            if dem.is_nodata(center) {
                continue;
            }

            let mut max_gradient = 0.0_f64;
            let mut best_dir = d8::NO_FLOW;

            for dir in &d8::DIRECTIONS {
                if let Some(neighbor) = dem.valid_neighbor(row, col, dir.dr, dir.dc) {
                    let gradient = (center - neighbor) / (dir.distance * cell_size);
                    // Strict comparison: only downhill neighbors qualify and
                    // ties keep the earliest direction in priority order.
                    if gradient > max_gradient {
                        max_gradient = gradient;
                        best_dir = dir.code;
                    }
                }
            }

            row_data[col] = best_dir;
        }

        row_data
    });

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(d8::DIR_NODATA));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Derive the inflow mask from a D8 flow direction raster.
///
/// Direction *d* is flagged on cell *c* (bit `1 << (d - 1)`) when the
/// neighbor in direction *d* exists, is valid, and drains along the
/// reciprocal of *d*, i.e. into *c*. Out-of-extent neighbors contribute
/// nothing, so cells at the raster edge only ever carry in-extent inflow.
///
/// The mask carries no nodata sentinel: 0 means "no inflow", which is valid
/// data (a ridge top); nodata cells of the direction raster also get 0 and
/// are excluded downstream through the direction raster itself.
pub fn inflow_mask(flow_dir: &Raster<u8>) -> Result<Raster<u8>> {
    let (rows, cols) = flow_dir.shape();

    let output_data: Vec<u8> = par_rows(rows, |row| {
        let mut row_data = vec![0u8; cols];

        for col in 0..cols {
            let center = unsafe { flow_dir.get_unchecked(row, col) };
            if flow_dir.is_nodata(center) {
                continue;
            }

            let mut mask = 0u8;
            for dir in &d8::DIRECTIONS {
                if let Some(code) = flow_dir.valid_neighbor(row, col, dir.dr, dir.dc) {
                    if code == dir.opposite {
                        mask |= dir.mask_bit;
                    }
                }
            }
            row_data[col] = mask;
        }

        row_data
    });

    let mut output = flow_dir.with_same_meta::<u8>(rows, cols);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
