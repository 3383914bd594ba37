use nalgebra as na;

/// A displacement or size in 3D. Dimensionless reals.
pub type Vector = na::Vector3<f64>;

pub fn vector_is_finite(v: &Vector) -> bool {
    v.iter().all(|c| c.is_finite())
}
