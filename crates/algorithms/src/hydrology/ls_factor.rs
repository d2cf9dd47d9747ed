//! RUSLE L and S constituents and the composed LS grid
//!
//! L converts accumulated slope length to feet and raises it against the
//! 72.6 ft unit plot, with the slope-length exponent looked up from a
//! 21-bin table keyed on the downslope angle. S is the two-branch
//! sine formula split at a 9 percent grade. The product is stored as
//! `round(LS * 100)` in an integer grid masked to the supplied watershed
//! boundary, with a scaled `ls_factor` attribute per distinct value.

use lsfactor_core::raster::Raster;
use lsfactor_core::{Algorithm, Error, Result};
use std::collections::BTreeSet;

/// Nodata sentinel of the stored LS grid.
pub const LS_NODATA: i32 = i32::MIN;

/// Feet per meter, applied when the horizontal unit is meters.
const FEET_PER_METER: f64 = 3.280_839_895_013_123;

/// RUSLE unit plot length in feet.
const UNIT_PLOT_FEET: f64 = 72.6;

/// Angle (degrees) of a 9 percent grade: the S-formula breakpoint.
const S_BREAK_DEG: f64 = 5.1428;

/// Upper bin edges (degrees) of the slope-length exponent table.
const M_BREAKS: [f64; 20] = [
    0.1, 0.2, 0.4, 0.85, 1.4, 2.0, 2.6, 3.1, 3.7, 5.2, 6.3, 7.4, 8.6, 10.3, 12.9, 15.7, 20.0,
    25.8, 31.5, 37.2,
];

/// Slope-length exponent per bin; angles above the last edge use 0.56.
const M_VALUES: [f64; 21] = [
    0.01, 0.02, 0.04, 0.08, 0.14, 0.18, 0.22, 0.25, 0.28, 0.32, 0.35, 0.37, 0.40, 0.41, 0.44,
    0.47, 0.49, 0.52, 0.54, 0.55, 0.56,
];

/// Linear unit of the elevation raster's horizontal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearUnit {
    /// Lengths are converted to feet before the L formula
    #[default]
    Meters,
    /// Lengths pass through unconverted
    Feet,
}

/// Parameters for LS composition
#[derive(Debug, Clone, Default)]
pub struct LsFactorParams {
    /// Horizontal unit of the input rasters
    pub unit: LinearUnit,
}

/// One attribute row of the stored LS grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LsAttribute {
    /// Distinct stored cell value, `round(LS * 100)`
    pub value: i32,
    /// Scaled factor, `value / 100`, two-decimal precision
    pub ls_factor: f64,
}

/// Output of LS composition.
#[derive(Debug, Clone)]
pub struct LsFactorOutput {
    /// `round(LS * 100)` per cell; [`LS_NODATA`] outside the boundary mask
    pub grid: Raster<i32>,
    /// One row per distinct stored value, ascending
    pub attributes: Vec<LsAttribute>,
}

/// LS composition algorithm
#[derive(Debug, Clone, Default)]
pub struct LsFactor;

impl Algorithm for LsFactor {
    type Input = (Raster<f64>, Raster<f64>, Raster<u8>);
    type Output = LsFactorOutput;
    type Params = LsFactorParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LS Factor"
    }

    fn description(&self) -> &'static str {
        "Compose L and S constituents into the masked, integer-scaled LS grid"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        ls_factor(&input.0, &input.1, &input.2, params)
    }
}

/// Slope-length exponent `m` for a downslope angle in degrees.
///
/// Angles at or above the last bin edge take the top exponent, so both
/// table endpoints are inclusive (<= 0.1 maps to 0.01, >= 37.2 to 0.56).
pub fn length_exponent(angle_deg: f64) -> f64 {
    let top = M_VALUES[M_VALUES.len() - 1];
    if angle_deg >= M_BREAKS[M_BREAKS.len() - 1] {
        return top;
    }
    for (idx, &edge) in M_BREAKS.iter().enumerate() {
        if angle_deg <= edge {
            return M_VALUES[idx];
        }
    }
    top
}

/// L constituent: `(length_in_feet / 72.6) ^ m`.
pub fn length_constituent(length: f64, angle_deg: f64, unit: LinearUnit) -> f64 {
    let feet = match unit {
        LinearUnit::Meters => length * FEET_PER_METER,
        LinearUnit::Feet => length,
    };
    (feet / UNIT_PLOT_FEET).powf(length_exponent(angle_deg))
}

/// S constituent: `16.8 sin a - 0.50` at or above a 9 percent grade,
/// `10.8 sin a + 0.03` below it.
pub fn steepness_constituent(angle_deg: f64) -> f64 {
    let sin_a = angle_deg.to_radians().sin();
    if angle_deg >= S_BREAK_DEG {
        16.8 * sin_a - 0.50
    } else {
        10.8 * sin_a + 0.03
    }
}

/// Compose the LS grid from accumulated slope length and downslope angle,
/// masked to the watershed boundary.
///
/// # Arguments
/// * `length` - Cumulative slope length raster (linear units)
/// * `angle` - Downslope angle raster (degrees)
/// * `boundary` - Watershed mask; zero cells fall outside
/// * `params` - Horizontal unit
///
/// # Returns
/// The stored grid (`round(LS * 100)` as i32, nodata outside the boundary
/// or where an input is nodata) and its attribute rows.
pub fn ls_factor(
    length: &Raster<f64>,
    angle: &Raster<f64>,
    boundary: &Raster<u8>,
    params: LsFactorParams,
) -> Result<LsFactorOutput> {
    let stored = length.zip_map(angle, |len, a| {
        if len.is_nan() || a.is_nan() {
            LS_NODATA
        } else {
            let ls = length_constituent(len, a, params.unit) * steepness_constituent(a);
            // Round half up; LS is never negative, so adding 0.5 and
            // truncating toward zero is exact.
            (ls * 100.0 + 0.5) as i32
        }
    })?;

    let mut grid = Raster::choose(boundary, &stored, &stored.like(LS_NODATA))?;
    grid.set_nodata(Some(LS_NODATA));

    let distinct: BTreeSet<i32> = grid
        .data()
        .iter()
        .copied()
        .filter(|&v| v != LS_NODATA)
        .collect();
    let attributes = distinct
        .into_iter()
        .map(|value| LsAttribute {
            value,
            ls_factor: value as f64 / 100.0,
        })
        .collect();

    Ok(LsFactorOutput { grid, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponent_table_endpoints_and_monotonicity() {
        assert_eq!(length_exponent(0.05), 0.01);
        assert_eq!(length_exponent(0.1), 0.01);
        assert_eq!(length_exponent(37.19), 0.55);
        assert_eq!(length_exponent(37.2), 0.56);
        assert_eq!(length_exponent(80.0), 0.56);

        let mut prev = 0.0;
        for step in 0..500 {
            let m = length_exponent(step as f64 * 0.1);
            assert!(m >= prev, "exponent table must be non-decreasing");
            prev = m;
        }
    }

    #[test]
    fn unit_plot_length_yields_unit_l() {
        // 72.6 ft is the unit plot: L = 1 regardless of the exponent.
        assert_relative_eq!(
            length_constituent(72.6, 3.0, LinearUnit::Feet),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            length_constituent(72.6 / 3.280_839_895_013_123, 3.0, LinearUnit::Meters),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn feet_input_skips_conversion() {
        let meters = length_constituent(100.0, 10.0, LinearUnit::Meters);
        let feet = length_constituent(100.0, 10.0, LinearUnit::Feet);
        assert!(meters > feet, "meters input must be scaled up to feet");
        assert_relative_eq!(
            feet,
            (100.0_f64 / 72.6).powf(0.41),
            epsilon = 1e-12
        );
    }

    #[test]
    fn steepness_branches_at_nine_percent_grade() {
        let below = steepness_constituent(5.0);
        assert_relative_eq!(
            below,
            10.8 * 5.0_f64.to_radians().sin() + 0.03,
            epsilon = 1e-12
        );

        let above = steepness_constituent(6.0);
        assert_relative_eq!(
            above,
            16.8 * 6.0_f64.to_radians().sin() - 0.50,
            epsilon = 1e-12
        );

        // The two branches are close but not equal at the split.
        let at = steepness_constituent(S_BREAK_DEG);
        assert_relative_eq!(
            at,
            16.8 * S_BREAK_DEG.to_radians().sin() - 0.50,
            epsilon = 1e-12
        );
    }

    fn fixture() -> (Raster<f64>, Raster<f64>, Raster<u8>) {
        let length = Raster::from_vec(vec![72.6, 145.2, 72.6, f64::NAN], 2, 2).unwrap();
        let angle = Raster::from_vec(vec![3.0, 3.0, 10.0, 3.0], 2, 2).unwrap();
        let boundary = Raster::from_vec(vec![1u8, 1, 0, 1], 2, 2).unwrap();
        (length, angle, boundary)
    }

    #[test]
    fn composes_scales_and_masks() {
        let (length, angle, boundary) = fixture();
        let out = ls_factor(&length, &angle, &boundary, LsFactorParams { unit: LinearUnit::Feet })
            .unwrap();

        // (0,0): L = 1, S = 10.8 sin(3 deg) + 0.03
        let s3 = 10.8 * 3.0_f64.to_radians().sin() + 0.03;
        let expected00 = (s3 * 100.0 + 0.5) as i32;
        assert_eq!(out.grid.get(0, 0).unwrap(), expected00);

        // (1,0) is outside the boundary, (1,1) has nodata length.
        assert_eq!(out.grid.get(1, 0).unwrap(), LS_NODATA);
        assert_eq!(out.grid.get(1, 1).unwrap(), LS_NODATA);
    }

    #[test]
    fn rounding_is_half_up() {
        let length = Raster::from_vec(vec![72.6], 1, 1).unwrap();
        let angle = Raster::from_vec(vec![3.0], 1, 1).unwrap();
        let boundary = Raster::from_vec(vec![1u8], 1, 1).unwrap();

        let out = ls_factor(&length, &angle, &boundary, LsFactorParams { unit: LinearUnit::Feet })
            .unwrap();
        // L = 1 exactly, so the stored value is round(S * 100).
        let s = 10.8 * 3.0_f64.to_radians().sin() + 0.03;
        assert_eq!(out.grid.get(0, 0).unwrap(), (s * 100.0 + 0.5) as i32);
        assert_eq!(out.attributes.len(), 1);
        assert_relative_eq!(
            out.attributes[0].ls_factor,
            out.attributes[0].value as f64 / 100.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn attributes_are_distinct_and_ascending() {
        let (length, angle, boundary) = fixture();
        let out = ls_factor(&length, &angle, &boundary, LsFactorParams { unit: LinearUnit::Feet })
            .unwrap();

        let values: Vec<i32> = out.attributes.iter().map(|a| a.value).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(values, sorted);
        // Two valid in-boundary cells with different lengths.
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn composition_is_idempotent() {
        let (length, angle, boundary) = fixture();
        let params = LsFactorParams { unit: LinearUnit::Feet };
        let a = ls_factor(&length, &angle, &boundary, params.clone()).unwrap();
        let b = ls_factor(&length, &angle, &boundary, params).unwrap();

        assert_eq!(a.grid.data(), b.grid.data());
        assert_eq!(a.attributes, b.attributes);
    }
}
