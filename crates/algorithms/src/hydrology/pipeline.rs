//! End-to-end LS derivation
//!
//! Chains the pipeline stages over one DEM: perimeter buffering, depression
//! filling, D8 flow direction and downslope angle on the buffered grid,
//! clipping back to the input extent, inflow masks, slope length
//! accumulation and LS composition against the supplied watershed boundary.
//!
//! This is also the validation boundary of the system: structural
//! preconditions (empty grid, all nodata, non-positive cell size) and
//! configuration (cutoff range, angle floor, boundary shape) are rejected
//! here before any work is allocated; the stages themselves assume
//! validated inputs.

use crate::hydrology::downslope_angle::{downslope_angle, DownslopeAngleParams};
use crate::hydrology::fill_sinks::{buffer_elevation, fill_to_convergence};
use crate::hydrology::flow_direction::{flow_direction, inflow_mask};
use crate::hydrology::ls_factor::{ls_factor, LinearUnit, LsFactorOutput, LsFactorParams};
use crate::hydrology::slope_length::{slope_length, Convergence, SlopeLengthParams};
use lsfactor_core::raster::Raster;
use lsfactor_core::{Algorithm, Error, Result};
use tracing::debug;

/// Parameters for the full LS pipeline
#[derive(Debug, Clone)]
pub struct LsPipelineParams {
    /// Horizontal/elevation unit of the DEM
    pub unit: LinearUnit,
    /// Floor (degrees) for flat or no-outflow cells
    pub flat_floor_deg: f64,
    /// Slope-break cutoff for cells on grades below 5 percent; must lie in
    /// (0, 1.1)
    pub cutoff_gentle: f64,
    /// Slope-break cutoff for cells on grades of 5 percent and above; must
    /// lie in (0, 1.1)
    pub cutoff_steep: f64,
    /// Optional hard bound on accumulation rounds
    pub max_rounds: Option<usize>,
}

impl Default for LsPipelineParams {
    fn default() -> Self {
        Self {
            unit: LinearUnit::Meters,
            flat_floor_deg: 0.1,
            cutoff_gentle: 0.7,
            cutoff_steep: 0.5,
            max_rounds: None,
        }
    }
}

/// Output of the full LS pipeline
#[derive(Debug, Clone)]
pub struct LsPipelineOutput {
    /// Stored LS grid and attribute rows
    pub ls: LsFactorOutput,
    /// How the slope length accumulation ended
    pub convergence: Convergence,
    /// Accumulation rounds executed
    pub rounds: usize,
}

/// Full LS pipeline algorithm
#[derive(Debug, Clone, Default)]
pub struct LsPipeline;

impl Algorithm for LsPipeline {
    type Input = (Raster<f64>, Raster<u8>);
    type Output = LsPipelineOutput;
    type Params = LsPipelineParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LS Pipeline"
    }

    fn description(&self) -> &'static str {
        "Derive the RUSLE LS grid from a DEM and a watershed boundary mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        derive_ls(&input.0, &input.1, params)
    }
}

/// Derive the LS grid from a DEM and a watershed boundary mask.
///
/// # Arguments
/// * `dem` - Elevation raster (nodata-aware, square cells)
/// * `boundary` - Watershed mask, same shape as `dem`; zero cells fall
///   outside and come out nodata
/// * `params` - Unit flag, angle floor, cutoffs and optional round cap
///
/// # Errors
/// Structural anomalies (empty raster, all nodata, non-positive cell size)
/// and invalid configuration are rejected before any stage runs. A stalled
/// accumulation is *not* an error; it is reported in the output status.
pub fn derive_ls(
    dem: &Raster<f64>,
    boundary: &Raster<u8>,
    params: LsPipelineParams,
) -> Result<LsPipelineOutput> {
    validate(dem, boundary, &params)?;

    let buffered = buffer_elevation(dem);
    let filled = fill_to_convergence(&buffered)?;
    debug!("depressions filled");

    // Direction and angle read the buffered surface so border cells are not
    // biased by the nodata rim; the buffer is discarded afterwards.
    let fdir_buf = flow_direction(&filled)?;
    let angle_buf = downslope_angle(
        &filled,
        &fdir_buf,
        DownslopeAngleParams {
            flat_floor_deg: params.flat_floor_deg,
        },
    )?;
    let fdir = fdir_buf.shrink(1)?;
    let angle = angle_buf.shrink(1)?;

    // The accumulator runs on the clipped extent: inflow derived here never
    // references a buffer cell, and out-of-extent predecessors are absent.
    let inflow = inflow_mask(&fdir)?;
    let accumulated = slope_length(
        &fdir,
        &inflow,
        &angle,
        SlopeLengthParams {
            cutoff_gentle: params.cutoff_gentle,
            cutoff_steep: params.cutoff_steep,
            max_rounds: params.max_rounds,
        },
    )?;
    debug!(rounds = accumulated.rounds, "slope length accumulated");

    let ls = ls_factor(
        &accumulated.length,
        &angle,
        boundary,
        LsFactorParams { unit: params.unit },
    )?;

    Ok(LsPipelineOutput {
        ls,
        convergence: accumulated.convergence,
        rounds: accumulated.rounds,
    })
}

fn validate(dem: &Raster<f64>, boundary: &Raster<u8>, params: &LsPipelineParams) -> Result<()> {
    if dem.is_empty() {
        return Err(Error::InvalidDimensions {
            width: dem.cols(),
            height: dem.rows(),
        });
    }

    let cell_size = dem.cell_size();
    if !(cell_size > 0.0) {
        return Err(Error::NonPositiveCellSize(cell_size));
    }

    if dem.statistics().valid_count == 0 {
        return Err(Error::AllNodata);
    }

    if boundary.shape() != dem.shape() {
        let (er, ec) = dem.shape();
        let (ar, ac) = boundary.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    check_cutoff("cutoff_gentle", params.cutoff_gentle)?;
    check_cutoff("cutoff_steep", params.cutoff_steep)?;

    if !(params.flat_floor_deg > 0.0) {
        return Err(Error::InvalidParameter {
            name: "flat_floor_deg",
            value: params.flat_floor_deg.to_string(),
            reason: "must be positive".to_string(),
        });
    }

    Ok(())
}

fn check_cutoff(name: &'static str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.1) {
        return Err(Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "must lie in (0, 1.1)".to_string(),
        });
    }
    Ok(())
}
