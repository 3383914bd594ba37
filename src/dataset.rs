//! A multi-dimensional image data set: a voxel grid positioned in space,
//! with optional time frames and respiratory/cardiac gates.
//!
//! The raw intensities live in a dense 5-d array laid out
//! `[frame, gate, z, y, x]`; the spatial part is tied to a `Volume` whose
//! far corner is always `voxel_size * grid dimensions` (the box is derived
//! from the grid, never set independently).

use std::path::Path;

use ndarray::Array5;

use crate::index::{index1_to_3, BoxDim, Index1, Index3};
use crate::io;
use crate::space::Space;
use crate::types::{Intensity, Point, Vector};
use crate::volume::Volume;

#[derive(Clone, Debug)]
pub struct DataSet {
    volume: Volume,
    voxel_size: Vector,
    data: Array5<Intensity>,
}

impl DataSet {

    pub fn new(space: Space, voxel_size: Vector, data: Array5<Intensity>) -> Self {
        assert!(voxel_size.iter().all(|&s| s > 0.0),
                "voxel size must be positive: {voxel_size:?}");
        let (_, _, nz, ny, nx) = data.dim();
        let mut volume = Volume::from_space(space);
        volume.set_corner(Point::new(nx as f64 * voxel_size.x,
                                     ny as f64 * voxel_size.y,
                                     nz as f64 * voxel_size.z));
        DataSet { volume, voxel_size, data }
    }

    /// Load a single-frame, single-gate data set from a raw little-endian
    /// f32 file, the interchange format the persistence layer writes voxel
    /// blobs in.
    pub fn from_raw_file(
        path: &Path,
        (nx, ny, nz): (usize, usize, usize),
        voxel_size: Vector,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let values = io::raw::read(path)?.collect::<Result<Vec<_>, _>>()?;
        let data = Array5::from_shape_vec(
            (1, 1, nz, ny, nx),
            values.into_iter().map(|v| v as Intensity).collect(),
        )?;
        Ok(Self::new(Space::new(), voxel_size, data))
    }

    pub fn volume(&self) -> &Volume { &self.volume }
    pub fn volume_mut(&mut self) -> &mut Volume { &mut self.volume }
    pub fn voxel_size(&self) -> Vector { self.voxel_size }
    pub fn data(&self) -> &Array5<Intensity> { &self.data }

    /// Spatial grid dimensions `[nx, ny, nz]`.
    pub fn dim(&self) -> BoxDim {
        let (_, _, nz, ny, nx) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn num_frames(&self) -> usize { self.data.dim().0 }
    pub fn num_gates(&self)  -> usize { self.data.dim().1 }

    /// Volume of one voxel.
    pub fn voxel_volume(&self) -> f64 {
        self.voxel_size.x * self.voxel_size.y * self.voxel_size.z
    }

    #[inline]
    pub fn value(&self, frame: usize, gate: usize, [x, y, z]: Index3) -> Intensity {
        self.data[[frame, gate, z, y, x]]
    }

    /// Center of the voxel with the given 3-d index, in this data set's own
    /// frame.
    #[inline]
    pub fn voxel_center(&self, [x, y, z]: Index3) -> Point {
        let s = self.voxel_size;
        Point::new((x as f64 + 0.5) * s.x,
                   (y as f64 + 0.5) * s.y,
                   (z as f64 + 0.5) * s.z)
    }

    /// Center of the voxel with the given 1-d index.
    #[inline]
    pub fn voxel_center1(&self, i: Index1) -> Point {
        self.voxel_center(index1_to_3(i, self.dim()))
    }
}

// ------------------------------ TESTS ------------------------------
#[cfg(test)]
mod test {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use float_eq::assert_float_eq;
    use rstest::rstest;

    fn iota_set(nx: usize, ny: usize, nz: usize) -> DataSet {
        let n = nx * ny * nz;
        let data = Array5::from_shape_vec(
            (1, 1, nz, ny, nx),
            (0..n).map(|i| i as Intensity).collect(),
        ).unwrap();
        DataSet::new(Space::new(), Vector::new(1.0, 1.0, 1.0), data)
    }

    #[test]
    fn corner_is_derived_from_grid_and_voxel_size() {
        let data = Array5::zeros((1, 1, 4, 3, 2));
        let ds = DataSet::new(Space::new(), Vector::new(2.0, 3.0, 0.5), data);
        let c = ds.volume().corner();
        assert_float_eq!(c.x,  4.0, abs <= 1e-12);
        assert_float_eq!(c.y,  9.0, abs <= 1e-12);
        assert_float_eq!(c.z,  2.0, abs <= 1e-12);
        assert_eq!(ds.dim(), [2, 3, 4]);
    }

    #[test]
    fn value_uses_x_fastest_layout() {
        let ds = iota_set(4, 3, 2);
        assert_eq!(ds.value(0, 0, [0, 0, 0]), 0.0);
        assert_eq!(ds.value(0, 0, [1, 0, 0]), 1.0);
        assert_eq!(ds.value(0, 0, [0, 1, 0]), 4.0);
        assert_eq!(ds.value(0, 0, [0, 0, 1]), 12.0);
    }

    #[rstest(/**/ index  , expected_position,
             case([0,0,0], [1.0, 1.0, 1.0]),
             case([1,0,0], [3.0, 1.0, 1.0]),
             case([0,1,0], [1.0, 3.0, 1.0]),
             case([0,0,1], [1.0, 1.0, 3.0]),
             case([1,1,1], [3.0, 3.0, 3.0]),
    )]
    fn voxel_centers(index: Index3, expected_position: [f64; 3]) {
        let data = Array5::zeros((1, 1, 2, 2, 2));
        let ds = DataSet::new(Space::new(), Vector::new(2.0, 2.0, 2.0), data);
        let c = ds.voxel_center(index);
        assert_float_eq!(c.x, expected_position[0], abs <= 1e-12);
        assert_float_eq!(c.y, expected_position[1], abs <= 1e-12);
        assert_float_eq!(c.z, expected_position[2], abs <= 1e-12);
    }

    #[test]
    fn one_dimensional_indices_agree_with_three_dimensional_ones() {
        let ds = iota_set(4, 3, 2);
        assert_eq!(ds.voxel_center1(0), ds.voxel_center([0, 0, 0]));
        assert_eq!(ds.voxel_center1(5), ds.voxel_center([1, 1, 0]));
        assert_eq!(ds.voxel_center1(13), ds.voxel_center([1, 0, 1]));
    }
}
