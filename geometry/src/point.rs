use nalgebra as na;

/// A position in 3D. Dimensionless reals: callers decide what a unit means.
pub type Point = na::Point3<f64>;

/// Componentwise minimum of two points.
pub fn component_min(a: &Point, b: &Point) -> Point {
    Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

/// Componentwise maximum of two points.
pub fn component_max(a: &Point, b: &Point) -> Point {
    Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

pub fn point_is_finite(p: &Point) -> bool {
    crate::vector_is_finite(&p.coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;

    #[rstest(/**/       a         ,         b         ,        lo         ,        hi        ,
             case((1.0, 2.0,  3.0), ( 3.0, 2.0,  1.0), ( 1.0, 2.0,  1.0), (3.0, 2.0, 3.0)),
             case((0.0, 0.0,  0.0), (-1.0, 1.0, -1.0), (-1.0, 0.0, -1.0), (0.0, 1.0, 0.0)),
             case((5.0, 5.0,  5.0), ( 5.0, 5.0,  5.0), ( 5.0, 5.0,  5.0), (5.0, 5.0, 5.0)),
    )]
    fn min_max_componentwise(a: (f64, f64, f64), b: (f64, f64, f64),
                             lo: (f64, f64, f64), hi: (f64, f64, f64)) {
        let a = Point::new(a.0, a.1, a.2);
        let b = Point::new(b.0, b.1, b.2);
        assert_eq!(component_min(&a, &b), Point::new(lo.0, lo.1, lo.2));
        assert_eq!(component_max(&a, &b), Point::new(hi.0, hi.1, hi.2));
    }

    #[test]
    fn finite_detects_nan_and_inf() {
        assert!( point_is_finite(&Point::new(1.0, 2.0, 3.0)));
        assert!(!point_is_finite(&Point::new(f64::NAN, 2.0, 3.0)));
        assert!(!point_is_finite(&Point::new(1.0, f64::INFINITY, 3.0)));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn min_never_exceeds_max(
            ax in -1e6..1e6f64, ay in -1e6..1e6f64, az in -1e6..1e6f64,
            bx in -1e6..1e6f64, by in -1e6..1e6f64, bz in -1e6..1e6f64,
        ) {
            let a = Point::new(ax, ay, az);
            let b = Point::new(bx, by, bz);
            let lo = component_min(&a, &b);
            let hi = component_max(&a, &b);
            prop_assert!(lo.x <= hi.x && lo.y <= hi.y && lo.z <= hi.z);
        }
    }
}
