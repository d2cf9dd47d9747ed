//! Compatibility layer for rayon/sequential execution.
//!
//! Every stage of the pipeline is a whole-grid pass in which each output row
//! depends only on the previous generation's grids, so passes are executed
//! as row-partitioned maps with no inter-worker communication. Collecting
//! the rows is the synchronization barrier; the caller then assembles the
//! fresh output raster and computes any global reductions.
//!
//! With the `parallel` feature disabled (e.g. WASM builds) the same pass
//! runs sequentially through an identical signature.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run one whole-grid pass: `f` builds the complete output row `row`.
#[cfg(feature = "parallel")]
pub fn par_rows<T, F>(rows: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Send + Sync,
{
    (0..rows).into_par_iter().flat_map(f).collect()
}

/// Sequential stand-in with the same signature.
#[cfg(not(feature = "parallel"))]
pub fn par_rows<T, F>(rows: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Send + Sync,
{
    (0..rows).flat_map(f).collect()
}
