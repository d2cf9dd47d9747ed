//! Depression filling for flow routing
//!
//! Raises every local minimum ("sink": a cell strictly below all of its
//! valid neighbors) to the minimum of those neighbors, repeating whole-grid
//! passes until a pass performs no replacement. Elevations only ever
//! increase and are bounded by their neighbors, so the fixed point is
//! reached in finitely many passes. Flat plateaus left behind are handled
//! downstream by the angle floor, not here.
//!
//! Cells on the raster border would read their missing neighbors as nodata
//! and be misclassified as sinks; filling therefore runs on a one-ring
//! buffered grid whose perimeter is seeded with local minima
//! (see [`buffer_elevation`]).

use crate::maybe_rayon::par_rows;
use lsfactor_core::raster::{d8, Raster};
use lsfactor_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// Fill sinks algorithm
#[derive(Debug, Clone, Default)]
pub struct FillSinks;

impl Algorithm for FillSinks {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fill Sinks"
    }

    fn description(&self) -> &'static str {
        "Raise depressions in a DEM to the minimum of their neighbors until none remains"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        fill_sinks(&input)
    }
}

/// Grow `dem` by one ring and seed every nodata perimeter cell with the
/// minimum of its valid neighbors.
///
/// Border cells of the original extent then see a neighbor no higher than
/// their own lowest valid neighbor instead of a nodata wall, so they fill
/// and route flow like interior cells. Ring cells with no valid neighbor
/// (outside the data footprint entirely) stay nodata.
pub fn buffer_elevation(dem: &Raster<f64>) -> Raster<f64> {
    let mut grown = dem.expand(1, f64::NAN);
    let (rows, cols) = grown.shape();

    // Seed values are computed from the unseeded grid, then applied, so no
    // ring cell reads another ring cell assigned in the same pass.
    let mut seeds: Vec<(usize, usize, f64)> = Vec::with_capacity(2 * (rows + cols));
    for row in 0..rows {
        for col in 0..cols {
            if row != 0 && row != rows - 1 && col != 0 && col != cols - 1 {
                continue;
            }
            let center = unsafe { grown.get_unchecked(row, col) };
            if !grown.is_nodata(center) {
                continue;
            }
            let mut min_neighbor = f64::INFINITY;
            for dir in &d8::DIRECTIONS {
                if let Some(n) = grown.valid_neighbor(row, col, dir.dr, dir.dc) {
                    if n < min_neighbor {
                        min_neighbor = n;
                    }
                }
            }
            if min_neighbor.is_finite() {
                seeds.push((row, col, min_neighbor));
            }
        }
    }
    for (row, col, value) in seeds {
        grown.data_mut()[(row, col)] = value;
    }

    grown
}

/// Fill depressions in a DEM.
///
/// Buffers the perimeter, raises sinks to the minimum of their neighbors
/// until stable, and clips back to the input extent. The result has no
/// strict local minimum away from the data boundary, so D8 routing finds a
/// downslope neighbor everywhere except on flats.
///
/// # Arguments
/// * `dem` - Input DEM raster
///
/// # Returns
/// A new raster with all depressions filled, same extent as the input
pub fn fill_sinks(dem: &Raster<f64>) -> Result<Raster<f64>> {
    let buffered = buffer_elevation(dem);
    fill_to_convergence(&buffered)?.shrink(1)
}

/// Repeat sink-raising passes until a pass replaces nothing.
///
/// Used directly by the pipeline, which keeps the buffered extent alive
/// through flow-direction and angle computation before clipping.
pub(crate) fn fill_to_convergence(dem: &Raster<f64>) -> Result<Raster<f64>> {
    let mut current = dem.clone();
    loop {
        let (next, replaced) = fill_pass(&current)?;
        current = next;
        if replaced == 0 {
            return Ok(current);
        }
    }
}

/// One synchronized whole-grid pass: every sink is replaced by the minimum
/// of its valid neighbors, reading only the previous generation.
fn fill_pass(dem: &Raster<f64>) -> Result<(Raster<f64>, usize)> {
    let (rows, cols) = dem.shape();

    let data = par_rows(rows, |row| {
        let mut row_data = vec![f64::NAN; cols];
        for col in 0..cols {
            let center = unsafe { dem.get_unchecked(row, col) };
            if dem.is_nodata(center) {
                continue;
            }

            let mut min_neighbor = f64::INFINITY;
            let mut has_lower_or_equal = false;
            let mut has_valid = false;
            for dir in &d8::DIRECTIONS {
                if let Some(n) = dem.valid_neighbor(row, col, dir.dr, dir.dc) {
                    has_valid = true;
                    if n <= center {
                        has_lower_or_equal = true;
                    }
                    if n < min_neighbor {
                        min_neighbor = n;
                    }
                }
            }

            // Sink test: strictly below every valid neighbor. Isolated cells
            // (no valid neighbor at all) are left untouched.
            row_data[col] = if has_valid && !has_lower_or_equal {
                min_neighbor
            } else {
                center
            };
        }
        row_data
    });

    let mut output = dem.like(f64::NAN);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    let replaced = output
        .data()
        .iter()
        .zip(dem.data().iter())
        .filter(|(new, old)| new > old)
        .count();

    Ok((output, replaced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsfactor_core::GeoTransform;

    fn create_dem_with_sink() -> Raster<f64> {
        // 7x7 DEM with a depression in the center
        //
        // 9 9 9 9 9 9 9
        // 9 8 8 8 8 8 9
        // 9 8 7 7 7 8 9
        // 9 8 7 3 7 8 9   <- center cell is a sink (3 < 7)
        // 9 8 7 7 7 8 9
        // 9 8 8 8 8 8 9
        // 9 9 9 9 9 9 9
        let values = vec![
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 3.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
        ];

        let mut dem = Raster::from_vec(values, 7, 7).unwrap();
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        dem
    }

    #[test]
    fn sink_is_raised_to_neighbor_minimum() {
        let dem = create_dem_with_sink();
        let filled = fill_sinks(&dem).unwrap();

        // The center cell (3,3) had value 3.0; the minimum of its eight
        // neighbors is 7.0.
        assert_eq!(filled.get(3, 3).unwrap(), 7.0);
    }

    #[test]
    fn fill_is_monotone_and_preserves_non_sinks() {
        let dem = create_dem_with_sink();
        let filled = fill_sinks(&dem).unwrap();

        for row in 0..7 {
            for col in 0..7 {
                let orig = dem.get(row, col).unwrap();
                let fill = filled.get(row, col).unwrap();
                assert!(
                    fill >= orig,
                    "filled value should be >= original at ({}, {})",
                    row,
                    col
                );
                if (row, col) != (3, 3) {
                    assert_eq!(fill, orig, "non-sink changed at ({}, {})", row, col);
                }
            }
        }
    }

    #[test]
    fn no_strict_interior_minimum_after_filling() {
        let dem = create_dem_with_sink();
        let filled = fill_sinks(&dem).unwrap();

        for row in 0..7 {
            for col in 0..7 {
                let center = filled.get(row, col).unwrap();
                let strictly_below_all = d8::DIRECTIONS.iter().all(|dir| {
                    filled
                        .valid_neighbor(row, col, dir.dr, dir.dc)
                        .map_or(true, |n| center < n)
                });
                let has_neighbor = d8::DIRECTIONS
                    .iter()
                    .any(|dir| filled.valid_neighbor(row, col, dir.dr, dir.dc).is_some());
                assert!(
                    !(has_neighbor && strictly_below_all),
                    "strict sink left at ({}, {})",
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn border_outlet_is_not_filled() {
        // A low border cell is a legitimate outlet: the perimeter buffer
        // seeds its ring neighbors with the local minimum, so it must not be
        // treated as a sink.
        let mut dem = Raster::filled(5, 5, 10.0);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        dem.set(4, 2, 2.0).unwrap();

        let filled = fill_sinks(&dem).unwrap();
        assert_eq!(filled.get(4, 2).unwrap(), 2.0);
    }

    #[test]
    fn interior_nodata_neighbors_are_ignored_by_the_sink_test() {
        // Column 0 is nodata; (1, 1) is strictly below every *valid*
        // neighbor, so it is a depression regardless of the nodata strip
        // beside it, and nodata cells themselves stay nodata.
        let mut dem = Raster::filled(3, 3, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        for row in 0..3 {
            dem.set(row, 0, f64::NAN).unwrap();
        }
        dem.set(1, 1, 1.0).unwrap();

        let filled = fill_sinks(&dem).unwrap();
        assert_eq!(filled.get(1, 1).unwrap(), 5.0);
        assert!(filled.get(1, 0).unwrap().is_nan());
    }

    #[test]
    fn all_nodata_grid_converges_unchanged() {
        let dem: Raster<f64> = Raster::filled(4, 4, f64::NAN);
        let filled = fill_sinks(&dem).unwrap();
        assert_eq!(filled.count_nodata(), 16);
    }

    #[test]
    fn buffer_seeds_perimeter_with_local_minimum() {
        let mut dem = Raster::filled(3, 3, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        dem.set(0, 0, 2.0).unwrap();

        let buffered = buffer_elevation(&dem);
        assert_eq!(buffered.shape(), (5, 5));
        // Ring cell diagonally outside (0,0) sees only that corner.
        assert_eq!(buffered.get(0, 0).unwrap(), 2.0);
        // Ring cell outside (0,1) sees 2.0 and 5.0.
        assert_eq!(buffered.get(0, 2).unwrap(), 2.0);
        assert_eq!(buffered.get(0, 4).unwrap(), 5.0);
    }
}
