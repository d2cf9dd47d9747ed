//! # LsFactor Core
//!
//! Core types and traits for the lsfactor erosion-modelling library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type with nodata semantics
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `d8`: The eight-direction record table used by flow routing
//! - Algorithm trait for consistent API
//!
//! Raster file encodings and coordinate reference systems are the concern of
//! the embedding application; this crate only models grids held in memory.

pub mod error;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{d8, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{d8, GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in lsfactor.
///
/// Algorithms are pure functions that transform input data according to
/// parameters. Multi-input stages use tuple inputs.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
