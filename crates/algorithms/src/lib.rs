//! # LsFactor Algorithms
//!
//! RUSLE LS-factor derivation from digital elevation models.
//!
//! The pipeline, in data-flow order:
//!
//! - **fill_sinks**: raise depressions so every cell keeps a downslope path
//! - **flow_direction**: D8 steepest-descent outflow + inflow bitmasks
//! - **downslope_angle**: slope angle along the outflow direction
//! - **slope_length**: iterative flow-path slope-length accumulation
//! - **ls_factor**: L and S constituents composed into the LS grid
//! - **derive_ls**: the validated end-to-end chain

pub mod hydrology;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        derive_ls, downslope_angle, fill_sinks, flow_direction, inflow_mask, ls_factor,
        slope_length, Convergence, DownslopeAngleParams, LinearUnit, LsAttribute,
        LsFactorOutput, LsFactorParams, LsPipelineOutput, LsPipelineParams, SlopeLengthParams,
        SlopeLengthResult, LS_NODATA,
    };
    pub use lsfactor_core::prelude::*;
}
