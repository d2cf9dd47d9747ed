//! Cumulative slope length over the D8 flow graph
//!
//! Fixed-point propagation of flow-path slope length from ridge/sink
//! "begin" cells toward outlets. Each cell's outflow defines a graph with
//! out-degree <= 1 and in-degree 0-8; every round recomputes the whole grid
//! from the previous round's values only, so rounds are barrier-separated
//! generations and row-parallel.
//!
//! A cell begins a new flow path (pinned forever to half its own traversal
//! length) when it has no surviving inflow: a ridge top, a filled sink, or
//! a cell whose every upslope contribution is severed by the slope-break
//! reset rule `angle(c) < angle(p) * cutoff(c)`. The reset test reads only
//! the static angle grid, so surviving inflow directions and begin cells
//! are computed once up front.
//!
//! Termination is a three-state machine: `Propagating` until either every
//! routable cell holds a value (`Converged`), or the undefined count
//! repeats across two consecutive rounds or a caller-imposed round cap is
//! hit (`Stalled`, non-fatal: the leftover cells stay nodata and a warning
//! is emitted). Plain round-counting would be unsafe: the rounds needed
//! equal the longest flow path in cells, and disconnected residue (e.g. a
//! clipped-boundary nodata strip) would otherwise never settle.

use crate::maybe_rayon::par_rows;
use lsfactor_core::raster::{d8, Raster};
use lsfactor_core::{Algorithm, Error, Result};
use ndarray::Array2;
use tracing::{debug, warn};

/// Parameters for slope length accumulation
#[derive(Debug, Clone)]
pub struct SlopeLengthParams {
    /// Slope-break cutoff for cells on grades below 5 percent
    pub cutoff_gentle: f64,
    /// Slope-break cutoff for cells on grades of 5 percent and above
    pub cutoff_steep: f64,
    /// Hard bound on propagation rounds; reaching it reports the same
    /// stalled state as a natural plateau
    pub max_rounds: Option<usize>,
}

impl Default for SlopeLengthParams {
    fn default() -> Self {
        Self {
            cutoff_gentle: 0.7,
            cutoff_steep: 0.5,
            max_rounds: None,
        }
    }
}

/// How a slope length run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Every routable cell received a cumulative length
    Converged,
    /// Propagation plateaued or hit the round cap; `unresolved` routable
    /// cells were left as nodata
    Stalled { unresolved: usize },
}

/// Result of slope length accumulation
#[derive(Debug, Clone)]
pub struct SlopeLengthResult {
    /// Cumulative slope length per cell (linear units); nodata where the
    /// input was nodata or where propagation stalled
    pub length: Raster<f64>,
    /// Number of whole-grid rounds executed
    pub rounds: usize,
    /// Whether the run converged or stalled
    pub convergence: Convergence,
}

/// Slope length accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct SlopeLength;

impl Algorithm for SlopeLength {
    type Input = (Raster<u8>, Raster<u8>, Raster<f64>);
    type Output = SlopeLengthResult;
    type Params = SlopeLengthParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope Length"
    }

    fn description(&self) -> &'static str {
        "Accumulate flow-path slope length over the D8 flow graph to convergence"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope_length(&input.0, &input.1, &input.2, params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Propagating,
    Converged,
    Stalled,
}

/// Per-cell constants derived before the first round.
struct FlowStatics {
    /// Traversal length (linear units); NaN on nodata cells
    travel: Array2<f64>,
    /// Inflow mask surviving the reciprocity re-check and the reset rule;
    /// a valid cell with 0 is a begin point
    surviving: Array2<u8>,
}

/// Accumulate cumulative slope length over the flow-direction graph.
///
/// # Arguments
/// * `flow_dir` - D8 flow direction raster
/// * `inflow` - Inflow bitmask raster (see `inflow_mask`)
/// * `angle` - Downslope angle raster, degrees, floored on flats
/// * `params` - Cutoff factors and optional round cap
///
/// # Returns
/// The length grid plus round count and convergence status. A stalled run
/// is not an error: remaining cells are nodata and a `tracing` warning is
/// emitted.
pub fn slope_length(
    flow_dir: &Raster<u8>,
    inflow: &Raster<u8>,
    angle: &Raster<f64>,
    params: SlopeLengthParams,
) -> Result<SlopeLengthResult> {
    check_shape(flow_dir, inflow)?;
    check_shape(flow_dir, angle)?;

    let (rows, cols) = flow_dir.shape();
    let statics = flow_statics(flow_dir, inflow, angle, &params);

    // Generation zero: begin points pinned to half their own traversal
    // length, everything else undefined.
    let mut current: Array2<f64> = {
        let data = par_rows(rows, |row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let code = unsafe { flow_dir.get_unchecked(row, col) };
                if flow_dir.is_nodata(code) {
                    continue;
                }
                if statics.surviving[(row, col)] == 0 {
                    row_data[col] = 0.5 * statics.travel[(row, col)];
                }
            }
            row_data
        });
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?
    };

    let mut undefined = count_undefined(&current, flow_dir);
    let mut rounds = 0usize;
    let mut phase = if undefined == 0 {
        Phase::Converged
    } else {
        Phase::Propagating
    };

    while phase == Phase::Propagating {
        let next = propagation_round(&current, &statics, flow_dir)?;
        rounds += 1;

        let next_undefined = count_undefined(&next, flow_dir);
        phase = if next_undefined == 0 {
            Phase::Converged
        } else if next_undefined == undefined {
            // No cell resolved across two consecutive rounds: the rest is
            // unreachable under the flow graph.
            Phase::Stalled
        } else if params.max_rounds.is_some_and(|cap| rounds >= cap) {
            Phase::Stalled
        } else {
            Phase::Propagating
        };

        undefined = next_undefined;
        current = next;
    }

    let convergence = match phase {
        Phase::Converged => {
            debug!(rounds, "slope length accumulation converged");
            Convergence::Converged
        }
        _ => {
            warn!(
                rounds,
                unresolved = undefined,
                "slope length accumulation stalled; unresolved cells left as nodata"
            );
            Convergence::Stalled {
                unresolved: undefined,
            }
        }
    };

    let mut length = flow_dir.with_same_meta::<f64>(rows, cols);
    length.set_nodata(Some(f64::NAN));
    *length.data_mut() = current;

    Ok(SlopeLengthResult {
        length,
        rounds,
        convergence,
    })
}

/// Precompute traversal lengths and the surviving inflow mask.
fn flow_statics(
    flow_dir: &Raster<u8>,
    inflow: &Raster<u8>,
    angle: &Raster<f64>,
    params: &SlopeLengthParams,
) -> FlowStatics {
    let (rows, cols) = flow_dir.shape();
    let cell_size = flow_dir.cell_size();
    // Angle of a 5 percent grade, the switch between the two cutoffs.
    let grade_break = 0.05_f64.atan().to_degrees();

    let data: Vec<(f64, u8)> = par_rows(rows, |row| {
        let mut row_data = vec![(f64::NAN, 0u8); cols];

        for col in 0..cols {
            let code = unsafe { flow_dir.get_unchecked(row, col) };
            if flow_dir.is_nodata(code) {
                continue;
            }
            let travel = d8::distance_factor(code) * cell_size;

            let cell_angle = unsafe { angle.get_unchecked(row, col) };
            let mask = unsafe { inflow.get_unchecked(row, col) };
            let cutoff = if cell_angle >= grade_break {
                params.cutoff_steep
            } else {
                params.cutoff_gentle
            };

            let mut surviving = 0u8;
            for dir in &d8::DIRECTIONS {
                if mask & dir.mask_bit == 0 {
                    continue;
                }
                // Re-check that the flagged neighbor really drains here; a
                // mask built from a different direction grid is ignored.
                match flow_dir.valid_neighbor(row, col, dir.dr, dir.dc) {
                    Some(upslope_code) if upslope_code == dir.opposite => {}
                    _ => continue,
                }
                let Some(upslope_angle) = angle.valid_neighbor(row, col, dir.dr, dir.dc) else {
                    continue;
                };
                // Slope-break reset: the path ends upslope and restarts
                // here, so this direction contributes nothing.
                if cell_angle < upslope_angle * cutoff {
                    continue;
                }
                surviving |= dir.mask_bit;
            }

            row_data[col] = (travel, surviving);
        }
        row_data
    });

    let mut travel = Array2::from_elem((rows, cols), f64::NAN);
    let mut surviving = Array2::zeros((rows, cols));
    for (idx, (t, s)) in data.into_iter().enumerate() {
        let pos = (idx / cols, idx % cols);
        travel[pos] = t;
        surviving[pos] = s;
    }

    FlowStatics { travel, surviving }
}

/// One synchronized round: every cell is recomputed from the previous
/// generation only.
fn propagation_round(
    prev: &Array2<f64>,
    statics: &FlowStatics,
    flow_dir: &Raster<u8>,
) -> Result<Array2<f64>> {
    let (rows, cols) = flow_dir.shape();

    let data = par_rows(rows, |row| {
        let mut row_data = vec![f64::NAN; cols];

        for col in 0..cols {
            let code = unsafe { flow_dir.get_unchecked(row, col) };
            if flow_dir.is_nodata(code) {
                continue;
            }

            let mask = statics.surviving[(row, col)];
            if mask == 0 {
                // Begin point: pinned, never overwritten by inflow.
                row_data[col] = 0.5 * statics.travel[(row, col)];
                continue;
            }

            let mut best = f64::NAN;
            for dir in &d8::DIRECTIONS {
                if mask & dir.mask_bit == 0 {
                    continue;
                }
                // Surviving bits are only ever set for in-extent neighbors.
                let nr = (row as isize + dir.dr) as usize;
                let nc = (col as isize + dir.dc) as usize;
                let upslope = prev[(nr, nc)];
                if upslope.is_nan() {
                    // Not yet available; excluded from the max, not zero.
                    continue;
                }
                let candidate = upslope + statics.travel[(nr, nc)];
                if best.is_nan() || candidate > best {
                    best = candidate;
                }
            }
            row_data[col] = best;
        }
        row_data
    });

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

/// Routable cells still undefined after a round.
fn count_undefined(lengths: &Array2<f64>, flow_dir: &Raster<u8>) -> usize {
    lengths
        .iter()
        .zip(flow_dir.data().iter())
        .filter(|&(len, &code)| !flow_dir.is_nodata(code) && len.is_nan())
        .count()
}

fn check_shape<T, U>(a: &Raster<T>, b: &Raster<U>) -> Result<()>
where
    T: lsfactor_core::RasterElement,
    U: lsfactor_core::RasterElement,
{
    if a.shape() != b.shape() {
        let (er, ec) = a.shape();
        let (ar, ac) = b.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}
