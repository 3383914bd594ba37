//! An axis-aligned box attached to a coordinate frame.
//!
//! The box lives in the frame's own coordinates: the near corner is always
//! the origin, `corner` is the far corner (so `corner` doubles as the box
//! extent). `valid` records whether a box has ever been established;
//! geometric queries on an invalid volume return empty results rather than
//! inventing a box.

use itertools::iproduct;

use geometry::{component_min, component_max};

use crate::space::Space;
use crate::types::{Point, Vector};

#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    space: Space,
    corner: Point,
    valid: bool,
}

impl Default for Volume {
    fn default() -> Self { Self::new() }
}

impl Volume {

    pub fn new() -> Self {
        Volume { space: Space::new(), corner: Point::origin(), valid: false }
    }

    pub fn from_space(space: Space) -> Self {
        Volume { space, corner: Point::origin(), valid: false }
    }

    pub fn space(&self) -> &Space { &self.space }
    pub fn space_mut(&mut self) -> &mut Space { &mut self.space }
    pub fn corner(&self) -> Point { self.corner }
    pub fn is_valid(&self) -> bool { self.valid }

    /// Establish the far corner. No-op (and no change report) if the
    /// volume already holds this exact box.
    pub fn set_corner(&mut self, corner: Point) -> bool {
        assert!(corner.coords.iter().all(|&c| c >= 0.0),
                "far corner must have non-negative components: {corner:?}");
        if self.valid && self.corner == corner { return false; }
        self.corner = corner;
        self.valid = true;
        true
    }

    /// Forget the box (e.g. after the defining mask was deleted).
    pub fn invalidate(&mut self) -> bool {
        let had_box = self.valid;
        self.corner = Point::origin();
        self.valid = false;
        had_box
    }

    /// Midpoint of the box, in base-frame coordinates. For an invalid
    /// volume this degenerates to the frame origin.
    pub fn center(&self) -> Point {
        self.space.s2b(Point::from(self.corner.coords / 2.0))
    }

    /// Rescale about `reference` (a base-frame point): the frame offset
    /// moves like any point, and the far corner is rescaled by reprojecting
    /// its displaced base-frame position back into this frame.
    pub fn scale(&mut self, reference: Point, factors: Vector) -> bool {
        let far = self.valid.then(|| self.space.s2b(self.corner));
        let mut changed = self.space.scale(reference, factors);
        if let Some(far) = far {
            let scaled = reference + (far - reference).component_mul(&factors);
            let corner = self.space.b2s(scaled);
            // dimensions carry no sign: a negative factor mirrors the frame,
            // not the box extent
            changed |= self.set_corner(Point::new(corner.x.abs(), corner.y.abs(), corner.z.abs()));
        }
        changed
    }

    /// The 8 corners of the box, in base-frame coordinates.
    pub fn base_corners(&self) -> [Point; 8] {
        let c = self.corner;
        let mut out = [self.space.s2b(Point::origin()); 8];
        for (i, (z, y, x)) in iproduct!([0.0, c.z], [0.0, c.y], [0.0, c.x]).enumerate() {
            out[i] = self.space.s2b(Point::new(x, y, z));
        }
        out
    }

    /// The (min, max) corners, in `space`'s coordinates, of the smallest
    /// axis-aligned box that encloses this (possibly rotated) volume.
    /// `None` if no box has been established.
    pub fn enclosing_corners(&self, space: &Space) -> Option<(Point, Point)> {
        if !self.valid { return None; }
        let mut lo = space.b2s(self.space.s2b(Point::origin()));
        let mut hi = lo;
        for corner in self.base_corners() {
            let q = space.b2s(corner);
            lo = component_min(&lo, &q);
            hi = component_max(&hi, &q);
        }
        Some((lo, hi))
    }

    /// The (min, max) corners, in this volume's own coordinates, of the
    /// axis-aligned box enclosing the intersection of the two volumes,
    /// clamped to this volume's box. `None` if the intersection is empty or
    /// degenerate (zero width along any axis).
    pub fn intersection_corners(&self, other: &Volume) -> Option<(Point, Point)> {
        if !self.valid { return None; }
        let (lo, hi) = other.enclosing_corners(&self.space)?;
        let lo = component_max(&lo, &Point::origin());
        let hi = component_min(&hi, &self.corner);
        if lo.x >= hi.x || lo.y >= hi.y || lo.z >= hi.z { return None; }
        Some((lo, hi))
    }
}

// ------------------------------ TESTS ------------------------------
#[cfg(test)]
mod test {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use float_eq::assert_float_eq;
    use rstest::rstest;
    use std::f64::consts::FRAC_PI_4;

    const TOL: f64 = 1e-9;

    #[test]
    fn set_corner_reports_change_only_when_something_changed() {
        let mut volume = Volume::new();
        assert!(!volume.is_valid());
        // first set always counts, even if the value is the default corner
        assert!( volume.set_corner(Point::origin()));
        assert!( volume.is_valid());
        assert!(!volume.set_corner(Point::origin()));
        assert!( volume.set_corner(Point::new(1.0, 2.0, 3.0)));
        assert!(!volume.set_corner(Point::new(1.0, 2.0, 3.0)));
    }

    #[test]
    #[should_panic]
    fn negative_corner_components_are_a_contract_violation() {
        Volume::new().set_corner(Point::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn center_is_the_box_midpoint_in_base_coordinates() {
        let mut volume = Volume::new();
        volume.space_mut().shift(Vector::new(10.0, 0.0, 0.0));
        volume.set_corner(Point::new(2.0, 4.0, 6.0));
        let c = volume.center();
        assert_float_eq!(c.x, 11.0, abs <= TOL);
        assert_float_eq!(c.y,  2.0, abs <= TOL);
        assert_float_eq!(c.z,  3.0, abs <= TOL);
    }

    #[test]
    fn scale_rescales_corner_about_the_reference() {
        let mut volume = Volume::new();
        volume.space_mut().shift(Vector::new(1.0, 0.0, 0.0));
        volume.set_corner(Point::new(1.0, 1.0, 1.0));
        volume.scale(Point::origin(), Vector::new(2.0, 2.0, 2.0));
        let c = volume.corner();
        assert_float_eq!(c.x, 2.0, abs <= TOL);
        assert_float_eq!(c.y, 2.0, abs <= TOL);
        assert_float_eq!(c.z, 2.0, abs <= TOL);
        assert_float_eq!(volume.space().offset().x, 2.0, abs <= TOL);
    }

    #[test]
    fn enclosing_corners_of_a_rotated_cube() {
        // A cube of side 2, rotated 45 degrees about its own center: the
        // enclosing box in the base frame has x/y extent 2*sqrt(2).
        let side = 2.0;
        let mut volume = Volume::new();
        volume.set_corner(Point::new(side, side, side));
        let center = volume.center();
        volume.space_mut().rotate_on_vector(Vector::z(), FRAC_PI_4, center);
        let (lo, hi) = volume.enclosing_corners(&Space::new()).unwrap();
        let diagonal = side * 2.0_f64.sqrt();
        assert_float_eq!(hi.x - lo.x, diagonal, abs <= TOL);
        assert_float_eq!(hi.y - lo.y, diagonal, abs <= TOL);
        assert_float_eq!(hi.z - lo.z, side,     abs <= TOL);
    }

    #[test]
    fn enclosing_corners_of_an_invalid_volume_is_none() {
        assert_eq!(Volume::new().enclosing_corners(&Space::new()), None);
    }

    // --------------------------------------------------------------------------------
    // Intersections: b is a unit-ish box shifted relative to a 10x10x10 box a.
    #[rstest(/**/  b_shift          , b_corner        ,      expected                    ,
             case(( 0.0,  0.0,  0.0), (4.0, 4.0, 4.0), Some(((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)))),
             case((-2.0, -2.0, -2.0), (4.0, 4.0, 4.0), Some(((0.0, 0.0, 0.0), (2.0, 2.0, 2.0)))),
             case(( 8.0,  8.0,  8.0), (4.0, 4.0, 4.0), Some(((8.0, 8.0, 8.0), (10.0, 10.0, 10.0)))),
             // sharing only a face is a degenerate, zero-width overlap
             case((10.0,  0.0,  0.0), (4.0, 4.0, 4.0), None),
             case((11.0,  0.0,  0.0), (4.0, 4.0, 4.0), None),
             case((-4.0,  0.0,  0.0), (4.0, 4.0, 4.0), None),
    )]
    fn intersection_corners_clamped_to_own_box(
        b_shift: (f64, f64, f64),
        b_corner: (f64, f64, f64),
        expected: Option<((f64, f64, f64), (f64, f64, f64))>,
    ) {
        let mut a = Volume::new();
        a.set_corner(Point::new(10.0, 10.0, 10.0));
        let mut b = Volume::new();
        b.space_mut().shift(Vector::new(b_shift.0, b_shift.1, b_shift.2));
        b.set_corner(Point::new(b_corner.0, b_corner.1, b_corner.2));
        match (a.intersection_corners(&b), expected) {
            (None, None) => (),
            (Some((lo, hi)), Some((elo, ehi))) => {
                assert_float_eq!(lo.x, elo.0, abs <= TOL);
                assert_float_eq!(lo.y, elo.1, abs <= TOL);
                assert_float_eq!(lo.z, elo.2, abs <= TOL);
                assert_float_eq!(hi.x, ehi.0, abs <= TOL);
                assert_float_eq!(hi.y, ehi.1, abs <= TOL);
                assert_float_eq!(hi.z, ehi.2, abs <= TOL);
            }
            (got, want) => panic!("got {got:?}, wanted {want:?}"),
        }
    }
}
