//! Tri-state voxel mask backing the isocontour and freehand ROI shapes.
//!
//! Cells are 0 (outside), 1 (boundary) or 2 (interior). The storage is
//! shared when an ROI is duplicated without redrawing, and cloned on the
//! first edit through either handle, so edits never leak between copies.

use std::cell::Cell;
use std::sync::Arc;

use ndarray::Array3;

use crate::index::{BoxDim, Index3};
use crate::types::{Point, Vector, Weight};

pub const OUTSIDE: u8 = 0;
pub const EDGE:    u8 = 1;
pub const INSIDE:  u8 = 2;

/// Fraction contributed by a mask cell. The 0.5 for boundary cells softens
/// the binary mask so statistics don't see harsh edges; it is a fixed
/// legacy constant, not derived from any physical model.
#[inline]
pub fn weight_of(value: u8) -> Weight {
    match value {
        OUTSIDE => 0.0,
        EDGE    => 0.5,
        INSIDE  => 1.0,
        other   => panic!("mask cells are tri-state (0/1/2); found {other}"),
    }
}

/// Mask storage: a 3-d cell grid (`[z, y, x]` layout) with its own cell
/// size, expressed in the owning ROI's frame. The center of mass is
/// computed lazily and cached until the next edit.
#[derive(Clone, Debug)]
pub struct Mask {
    data: Arc<Array3<u8>>,
    voxel_size: Vector,
    com: Cell<Option<Point>>,
    com_evals: Cell<usize>,
}

impl Mask {

    pub fn empty(voxel_size: Vector) -> Self {
        Self::new(Array3::zeros((0, 0, 0)), voxel_size)
    }

    pub fn new(data: Array3<u8>, voxel_size: Vector) -> Self {
        assert!(voxel_size.iter().all(|&s| s > 0.0),
                "mask voxel size must be positive: {voxel_size:?}");
        debug_assert!(data.iter().all(|&v| v <= INSIDE),
                      "mask cells are tri-state (0/1/2)");
        Mask {
            data: Arc::new(data),
            voxel_size,
            com: Cell::new(None),
            com_evals: Cell::new(0),
        }
    }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Cell grid dimensions `[nx, ny, nz]`.
    pub fn dim(&self) -> BoxDim {
        let (nz, ny, nx) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn voxel_size(&self) -> Vector { self.voxel_size }

    pub fn set_voxel_size(&mut self, voxel_size: Vector) -> bool {
        assert!(voxel_size.iter().all(|&s| s > 0.0),
                "mask voxel size must be positive: {voxel_size:?}");
        if self.voxel_size == voxel_size { return false; }
        self.voxel_size = voxel_size;
        self.com.set(None);
        true
    }

    pub fn data(&self) -> &Array3<u8> { &self.data }

    /// Cell value by index; out-of-bounds indices are a contract violation.
    #[inline]
    pub fn value(&self, [x, y, z]: Index3) -> u8 {
        self.data[[z, y, x]]
    }

    /// Nearest-neighbor lookup for a point in the ROI's frame. Points
    /// outside the grid are outside the region.
    #[inline]
    pub fn sample(&self, p: Point) -> u8 {
        let i = (p.x / self.voxel_size.x).floor();
        let j = (p.y / self.voxel_size.y).floor();
        let k = (p.z / self.voxel_size.z).floor();
        if i < 0.0 || j < 0.0 || k < 0.0 { return OUTSIDE; }
        let (nz, ny, nx) = self.data.dim();
        let (i, j, k) = (i as usize, j as usize, k as usize);
        if i >= nx || j >= ny || k >= nz { return OUTSIDE; }
        self.data[[k, j, i]]
    }

    /// Set one cell, cloning the storage first if it is shared with
    /// another ROI. Reports whether the cell actually changed.
    pub fn paint(&mut self, [x, y, z]: Index3, value: u8) -> bool {
        assert!(value <= INSIDE, "mask cells are tri-state (0/1/2); got {value}");
        let [nx, ny, nz] = self.dim();
        assert!(x < nx && y < ny && z < nz,
                "cell [{x}, {y}, {z}] outside mask dimensions [{nx}, {ny}, {nz}]");
        if self.data[[z, y, x]] == value { return false; }
        Arc::make_mut(&mut self.data)[[z, y, x]] = value;
        self.com.set(None);
        true
    }

    /// Whether this mask still shares storage with `other` (i.e. neither
    /// side has been edited since the duplication).
    pub fn shares_storage_with(&self, other: &Mask) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Mass-weighted centroid of the region, in the ROI's own frame:
    /// interior cells count fully, boundary cells at half weight. `None`
    /// for a mask with no marked cells.
    pub fn center_of_mass(&self) -> Option<Point> {
        if let Some(cached) = self.com.get() {
            return Some(cached);
        }
        self.com_evals.set(self.com_evals.get() + 1);
        let s = self.voxel_size;
        let mut total = 0.0;
        let mut sum = Vector::zeros();
        for ((z, y, x), &v) in self.data.indexed_iter() {
            let w = weight_of(v);
            if w == 0.0 { continue; }
            total += w;
            sum += w * Vector::new((x as f64 + 0.5) * s.x,
                                   (y as f64 + 0.5) * s.y,
                                   (z as f64 + 0.5) * s.z);
        }
        if total == 0.0 { return None; }
        let com = Point::from(sum / total);
        self.com.set(Some(com));
        Some(com)
    }

    pub fn center_of_mass_cached(&self) -> bool {
        self.com.get().is_some()
    }

    #[cfg(test)]
    pub(crate) fn center_of_mass_evals(&self) -> usize {
        self.com_evals.get()
    }
}
