//! Downslope angle along the D8 outflow direction
//!
//! For each cell with an outflow direction, the slope angle is
//! `atan(drop / traversal distance)` in degrees, where the traversal
//! distance is the cell size (orthogonal) or cell size x sqrt(2) (diagonal).
//! Cells with no outflow, or with a non-positive angle, are floored to a
//! small positive value so that every cell stays connected to the slope
//! length accumulation.

use crate::maybe_rayon::par_rows;
use lsfactor_core::raster::{d8, Raster};
use lsfactor_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// Parameters for downslope angle calculation
#[derive(Debug, Clone)]
pub struct DownslopeAngleParams {
    /// Floor (degrees) assigned to flat or no-outflow cells; never zero
    pub flat_floor_deg: f64,
}

impl Default for DownslopeAngleParams {
    fn default() -> Self {
        Self {
            flat_floor_deg: 0.1,
        }
    }
}

/// Downslope angle algorithm
#[derive(Debug, Clone, Default)]
pub struct DownslopeAngle;

impl Algorithm for DownslopeAngle {
    type Input = (Raster<f64>, Raster<u8>);
    type Output = Raster<f64>;
    type Params = DownslopeAngleParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Downslope Angle"
    }

    fn description(&self) -> &'static str {
        "Slope angle along the D8 outflow direction, floored on flats"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        downslope_angle(&input.0, &input.1, params)
    }
}

/// Calculate the downslope angle (degrees) along each cell's outflow
/// direction.
///
/// # Arguments
/// * `filled` - Filled DEM the directions were derived from
/// * `flow_dir` - D8 flow direction raster
/// * `params` - Flat-area floor
///
/// # Returns
/// `Raster<f64>` of angles in degrees, >= the floor everywhere a direction
/// is defined; NaN on nodata cells
pub fn downslope_angle(
    filled: &Raster<f64>,
    flow_dir: &Raster<u8>,
    params: DownslopeAngleParams,
) -> Result<Raster<f64>> {
    if filled.shape() != flow_dir.shape() {
        let (er, ec) = filled.shape();
        let (ar, ac) = flow_dir.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let (rows, cols) = filled.shape();
    let cell_size = filled.cell_size();
    let floor = params.flat_floor_deg;

    let output_data: Vec<f64> = par_rows(rows, |row| {
        let mut row_data = vec![f64::NAN; cols];

        for col in 0..cols {
            let center = unsafe { filled.get_unchecked(row, col) };
            let code = unsafe { flow_dir.get_unchecked(row, col) };
            if filled.is_nodata(center) || flow_dir.is_nodata(code) {
                continue;
            }

            let angle = match d8::by_code(code) {
                Some(dir) => match filled.valid_neighbor(row, col, dir.dr, dir.dc) {
                    Some(neighbor) => {
                        let drop = center - neighbor;
                        (drop / (dir.distance * cell_size)).atan().to_degrees()
                    }
                    None => floor,
                },
                None => floor,
            };

            row_data[col] = if angle > 0.0 { angle } else { floor };
        }

        row_data
    });

    let mut output = filled.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction::flow_direction;
    use approx::assert_relative_eq;
    use lsfactor_core::GeoTransform;

    fn east_ramp(drop_per_cell: f64, cell_size: f64) -> Raster<f64> {
        let mut dem = Raster::new(3, 5);
        dem.set_transform(GeoTransform::new(0.0, 3.0 * cell_size, cell_size, -cell_size));
        for row in 0..3 {
            for col in 0..5 {
                dem.set(row, col, (4 - col) as f64 * drop_per_cell).unwrap();
            }
        }
        dem
    }

    #[test]
    fn angle_matches_arctangent_of_gradient() {
        // 1 unit drop over 30 units of travel
        let dem = east_ramp(1.0, 30.0);
        let fdir = flow_direction(&dem).unwrap();
        let angle = downslope_angle(&dem, &fdir, DownslopeAngleParams::default()).unwrap();

        let expected = (1.0_f64 / 30.0).atan().to_degrees();
        assert_relative_eq!(angle.get(1, 2).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn flat_cells_receive_the_floor() {
        let mut dem = Raster::filled(3, 3, 10.0);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        let fdir = flow_direction(&dem).unwrap();
        let angle = downslope_angle(&dem, &fdir, DownslopeAngleParams::default()).unwrap();

        for row in 0..3 {
            for col in 0..3 {
                assert_eq!(angle.get(row, col).unwrap(), 0.1);
            }
        }
    }

    #[test]
    fn custom_floor_is_applied() {
        let mut dem = Raster::filled(2, 2, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        let fdir = flow_direction(&dem).unwrap();
        let angle =
            downslope_angle(&dem, &fdir, DownslopeAngleParams { flat_floor_deg: 0.05 }).unwrap();

        assert_eq!(angle.get(0, 0).unwrap(), 0.05);
    }

    #[test]
    fn nodata_stays_nodata() {
        let mut dem = east_ramp(1.0, 10.0);
        dem.set(0, 0, f64::NAN).unwrap();
        let fdir = flow_direction(&dem).unwrap();
        let angle = downslope_angle(&dem, &fdir, DownslopeAngleParams::default()).unwrap();

        assert!(angle.get(0, 0).unwrap().is_nan());
        assert!(angle.get(1, 1).unwrap() > 0.0);
    }

    #[test]
    fn diagonal_travel_reduces_the_angle() {
        // Flow SE over a diagonal ramp: same drop, longer travel.
        let mut dem = Raster::new(3, 3);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        for row in 0..3 {
            for col in 0..3 {
                dem.set(row, col, (4 - row - col) as f64).unwrap();
            }
        }
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(1, 1).unwrap(), 8);

        let angle = downslope_angle(&dem, &fdir, DownslopeAngleParams::default()).unwrap();
        let expected = (2.0_f64 / std::f64::consts::SQRT_2).atan().to_degrees();
        assert_relative_eq!(angle.get(1, 1).unwrap(), expected, epsilon = 1e-12);
    }
}
