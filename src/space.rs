//! An affine coordinate frame relative to the fixed base frame.
//!
//! A `Space` is an offset plus three orthonormal axis vectors, all expressed
//! in base-frame coordinates. Rotation lives here; size does not (a
//! `Volume`'s corner carries size), so the axes stay unit length through
//! every operation, including `scale`.
//!
//! Two invariants are maintained by every mutator:
//!
//! 1. The axes remain mutually orthogonal and unit length. Compositions are
//!    re-orthogonalized to absorb floating-point drift.
//!
//! 2. No non-finite state escapes. A composition that produces NaN/Inf
//!    (typically malformed offsets from imported legacy files) resets the
//!    frame to identity and logs a warning instead of corrupting callers.

use nalgebra::{Matrix3, Rotation3, Unit};

use geometry::point_is_finite;
use log::warn;

use crate::types::{Length, Point, Vector};

/// Tolerance below which two frames are considered interchangeable.
pub const CLOSE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis { X = 0, Y = 1, Z = 2 }

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// An affine frame: `offset` positions this frame's origin in the base
/// frame, row `i` of `axes` is this frame's i-th basis vector in base
/// coordinates. Orthonormal rows make the matrix orthogonal, so its
/// transpose is its inverse; both conversion directions are cheap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Space {
    offset: Point,
    axes: Matrix3<f64>,
}

impl Default for Space {
    fn default() -> Self { Self::new() }
}

impl Space {

    pub fn new() -> Self {
        Space { offset: Point::origin(), axes: Matrix3::identity() }
    }

    /// Build a frame from raw parts (e.g. deserialized offsets and axes).
    /// The axes are re-orthonormalized; garbage input yields the identity.
    pub fn from_parts(offset: Point, axes: [Vector; 3]) -> Self {
        let mut space = Space {
            offset,
            axes: Self::orthonormalize(rows(axes)),
        };
        space.guard();
        space
    }

    pub fn offset(&self) -> Point { self.offset }

    pub fn axis(&self, axis: Axis) -> Vector {
        self.axes.row(axis as usize).transpose()
    }

    pub fn axes(&self) -> [Vector; 3] {
        [self.axis(Axis::X), self.axis(Axis::Y), self.axis(Axis::Z)]
    }

    // ------------------------------ mutators ------------------------------
    //
    // Each returns whether the frame actually changed, so owning code can
    // propagate change notifications without a signal system.

    pub fn set_offset(&mut self, offset: Point) -> bool {
        let before = *self;
        self.offset = offset;
        self.guard();
        *self != before
    }

    pub fn set_axes(&mut self, axes: [Vector; 3]) -> bool {
        let before = *self;
        self.axes = Self::orthonormalize(rows(axes));
        self.guard();
        *self != before
    }

    pub fn shift(&mut self, displacement: Vector) -> bool {
        let before = *self;
        self.offset += displacement;
        self.guard();
        *self != before
    }

    /// Negate one axis, keeping the base-frame point `center` at the same
    /// in-frame coordinates. Note that this flips the frame's handedness.
    pub fn invert_axis(&mut self, axis: Axis, center: Point) -> bool {
        let before = *self;
        let old_axes = self.axes;
        let negated = -self.axes.row(axis as usize).clone_owned();
        self.axes.set_row(axis as usize, &negated);
        self.axes = Self::orthonormalize(self.axes);
        self.offset = hold_fixed(center, &old_axes, before.offset, &self.axes);
        self.guard();
        *self != before
    }

    /// Rotate the axes by `theta` radians about the free vector `vector`,
    /// keeping the base-frame point `center` at the same in-frame
    /// coordinates. A zero rotation vector is treated as corruption.
    pub fn rotate_on_vector(&mut self, vector: Vector, theta: Length, center: Point) -> bool {
        let before = *self;
        let old_axes = self.axes;
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(vector), theta);
        // Each basis vector is rotated in the base frame; with axes as rows
        // this is a right-multiplication by the transposed rotation matrix.
        self.axes = Self::orthonormalize(self.axes * rotation.matrix().transpose());
        self.offset = hold_fixed(center, &old_axes, before.offset, &self.axes);
        self.guard();
        *self != before
    }

    /// Compose this frame with a transform frame (e.g. a rigid-alignment
    /// result from `calculate_transform`).
    pub fn transform(&mut self, t: &Space) -> bool {
        let before = *self;
        self.offset += t.offset.coords;
        self.axes = Self::orthonormalize(t.axes * self.axes);
        self.guard();
        *self != before
    }

    /// Like `transform`, but axes only, keeping the base-frame point
    /// `center` at the same in-frame coordinates.
    pub fn transform_axes(&mut self, axes: [Vector; 3], center: Point) -> bool {
        let before = *self;
        let old_axes = self.axes;
        self.axes = Self::orthonormalize(rows(axes) * self.axes);
        self.offset = hold_fixed(center, &old_axes, before.offset, &self.axes);
        self.guard();
        *self != before
    }

    /// Move the offset proportionally to its displacement from
    /// `reference`. The axes are deliberately untouched: they encode pure
    /// rotation and must stay unit length; `Volume::scale` rescales the
    /// corner separately.
    pub fn scale(&mut self, reference: Point, factors: Vector) -> bool {
        let before = *self;
        let displacement = self.offset - reference;
        self.offset = reference + displacement.component_mul(&factors);
        self.guard();
        *self != before
    }

    // --------------------------- conversions ------------------------------

    /// Convert a base-frame point into this frame: subtract the offset,
    /// then project onto each axis (multiplication by the orthogonal axis
    /// matrix, whose transpose is its inverse).
    #[inline]
    pub fn b2s(&self, p: Point) -> Point {
        Point::from(self.axes * (p - self.offset))
    }

    /// Convert a point in this frame back to the base frame.
    #[inline]
    pub fn s2b(&self, p: Point) -> Point {
        self.offset + self.axes.transpose() * p.coords
    }

    /// Convert a dimensional quantity (e.g. a voxel size) from the base
    /// frame into this frame. Dimensions carry no sign, so each positive
    /// unit displacement is transformed independently and the absolute
    /// components summed, which reduces to |axes|·d.
    #[inline]
    pub fn b2s_dim(&self, d: Vector) -> Vector {
        self.axes.abs() * d
    }

    /// Inverse of `b2s_dim`.
    #[inline]
    pub fn s2b_dim(&self, d: Vector) -> Vector {
        self.axes.transpose().abs() * d
    }

    /// The transform `T` such that applying `T` to `src` yields `dest`;
    /// this is what a rigid-body registration hands back to its caller.
    pub fn calculate_transform(dest: &Space, src: &Space) -> Space {
        let mut t = Space {
            offset: Point::from(dest.offset - src.offset),
            axes: Self::orthonormalize(dest.axes * src.axes.transpose()),
        };
        t.guard();
        t
    }

    // ---------------------------- comparison ------------------------------

    /// Bit-identical axes. Used to short-circuit redundant recomputation.
    pub fn axes_equal(&self, other: &Space) -> bool {
        self.axes == other.axes
    }

    /// Axes equal within `CLOSE`.
    pub fn axes_close(&self, other: &Space) -> bool {
        self.axes.iter().zip(other.axes.iter())
            .all(|(a, b)| float_eq::float_eq!(a, b, abs <= CLOSE))
    }

    /// Whole frame (offset and axes) equal within `CLOSE`.
    pub fn close_to(&self, other: &Space) -> bool {
        self.axes_close(other) &&
            self.offset.coords.iter().zip(other.offset.coords.iter())
                .all(|(a, b)| float_eq::float_eq!(a, b, abs <= CLOSE))
    }

    // ----------------------------- internals ------------------------------

    /// Gram-Schmidt on the axis rows. Preserves each axis's own direction,
    /// so inverted (left-handed) frames stay inverted.
    fn orthonormalize(m: Matrix3<f64>) -> Matrix3<f64> {
        let x = m.row(0).transpose().normalize();
        let y_raw = m.row(1).transpose();
        let y = (y_raw - x * x.dot(&y_raw)).normalize();
        let z_raw = m.row(2).transpose();
        let z = (z_raw - x * x.dot(&z_raw) - y * y.dot(&z_raw)).normalize();
        rows([x, y, z])
    }

    /// Reset to identity if any component went non-finite.
    fn guard(&mut self) {
        let finite = point_is_finite(&self.offset) &&
            self.axes.iter().all(|c| c.is_finite());
        if !finite {
            warn!("coordinate frame went non-finite (offset {:?}); resetting to identity",
                  self.offset);
            *self = Space::new();
        }
    }
}

fn rows([x, y, z]: [Vector; 3]) -> Matrix3<f64> {
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

/// Offset correction shared by the axes-changing mutators: choose the new
/// offset so that `b2s(center)` is identical before and after the change.
fn hold_fixed(center: Point,
              old_axes: &Matrix3<f64>,
              old_offset: Point,
              new_axes: &Matrix3<f64>) -> Point {
    center - new_axes.transpose() * (old_axes * (center - old_offset))
}
