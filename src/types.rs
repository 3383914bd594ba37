pub type Length    = f64;
pub type Weight    = f64;
pub type Fraction  = f64;
pub type Intensity = f64;

pub use geometry::{Point, Vector};

pub use crate::index::{Index1, Index3, BoxDim};
