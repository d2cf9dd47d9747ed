//! RUSLE LS-factor hydrology pipeline
//!
//! Stages for deriving the LS erosion factor from a DEM:
//! - Fill sinks: raise local minima so flow is continuous
//! - Flow direction: D8 single flow direction + inflow bitmasks
//! - Downslope angle: slope along the outflow direction, flat-floored
//! - Slope length: iterative flow-path length accumulation to convergence
//! - LS factor: L and S constituents composed, scaled and masked

mod downslope_angle;
mod fill_sinks;
mod flow_direction;
mod ls_factor;
mod pipeline;
mod slope_length;

pub use downslope_angle::{downslope_angle, DownslopeAngle, DownslopeAngleParams};
pub use fill_sinks::{buffer_elevation, fill_sinks, FillSinks};
pub use flow_direction::{flow_direction, inflow_mask, FlowDirection};
pub use ls_factor::{
    length_constituent, length_exponent, ls_factor, steepness_constituent, LinearUnit,
    LsAttribute, LsFactor, LsFactorOutput, LsFactorParams, LS_NODATA,
};
pub use pipeline::{derive_ls, LsPipeline, LsPipelineOutput, LsPipelineParams};
pub use slope_length::{
    slope_length, Convergence, SlopeLength, SlopeLengthParams, SlopeLengthResult,
};
