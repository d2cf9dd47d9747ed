//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid addressed by
/// (row, col), with an affine transform and an optional nodata sentinel.
/// Every derived raster in a processing chain shares the shape and cell
/// size of its inputs unless an explicit ring expansion is applied.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`RasterElement`]
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a raster from existing data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            transform: GeoTransform::default(),
            nodata: None,
        })
    }

    /// Create a raster with the same transform but a different cell type,
    /// filled with zeros
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    // Neighbor addressing

    /// Value of the cell at `(row + dr, col + dc)`, or `None` when the
    /// offset falls outside the current extent.
    pub fn neighbor_value(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<T> {
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= self.rows() as isize || nc >= self.cols() as isize {
            return None;
        }
        Some(unsafe { self.get_unchecked(nr as usize, nc as usize) })
    }

    /// Like [`neighbor_value`](Self::neighbor_value), but out-of-extent and
    /// nodata neighbors are both `None`.
    pub fn valid_neighbor(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<T> {
        self.neighbor_value(row, col, dr, dc)
            .filter(|&v| !self.is_nodata(v))
    }

    // Elementwise construction

    /// Build a new raster by applying `f` to every cell of `self`.
    ///
    /// The closure sees only the input cell, never other cells of the output
    /// being built, so the pass stays pure and parallelizable.
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        Raster {
            data: self.data.mapv(f),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Build a new raster by applying `f` to every pair of cells of `self`
    /// and `other`.
    pub fn zip_map<U, V, F>(&self, other: &Raster<U>, f: F) -> Result<Raster<V>>
    where
        U: RasterElement,
        V: RasterElement,
        F: Fn(T, U) -> V,
    {
        self.check_same_shape(other)?;
        let data = ndarray::Zip::from(&self.data)
            .and(other.data())
            .map_collect(|&a, &b| f(a, b));
        Ok(Raster {
            data,
            transform: self.transform,
            nodata: None,
        })
    }

    /// Conditional selection: cell from `a` where `cond` is non-zero,
    /// else the cell from `b`.
    pub fn choose(cond: &Raster<u8>, a: &Raster<T>, b: &Raster<T>) -> Result<Raster<T>> {
        a.check_same_shape(cond)?;
        a.check_same_shape(b)?;
        let data = ndarray::Zip::from(cond.data())
            .and(a.data())
            .and(b.data())
            .map_collect(|&c, &av, &bv| if c != 0 { av } else { bv });
        Ok(Raster {
            data,
            transform: a.transform,
            nodata: a.nodata,
        })
    }

    // Extent change

    /// Grow the raster by `rings` whole cells on every side, filling the new
    /// cells with `fill`. The geotransform origin shifts accordingly.
    pub fn expand(&self, rings: usize, fill: T) -> Self {
        let (rows, cols) = self.shape();
        let mut data = Array2::from_elem((rows + 2 * rings, cols + 2 * rings), fill);
        data.slice_mut(s![rings..rings + rows, rings..rings + cols])
            .assign(&self.data);
        Self {
            data,
            transform: self.transform.expanded(rings),
            nodata: self.nodata,
        }
    }

    /// Remove `rings` whole cells from every side, restoring the extent a
    /// matching [`expand`](Self::expand) call grew.
    pub fn shrink(&self, rings: usize) -> Result<Self> {
        let (rows, cols) = self.shape();
        if rows <= 2 * rings || cols <= 2 * rings {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let data = self
            .data
            .slice(s![rings..rows - rings, rings..cols - rings])
            .to_owned();
        Ok(Self {
            data,
            transform: self.transform.shrunk(rings),
            nodata: self.nodata,
        })
    }

    // Reductions

    /// Count of cells holding nodata
    pub fn count_nodata(&self) -> usize {
        self.data.iter().filter(|&&v| self.is_nodata(v)).count()
    }

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min = None;
        let mut max = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.is_none() || value < min.unwrap() {
                min = Some(value);
            }
            if max.is_none() || value > max.unwrap() {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }

    fn check_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = other.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
