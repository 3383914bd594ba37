mod types;
pub use types::*;

pub mod analysis;
pub mod dataset;
pub mod index;
pub mod io;
pub mod roi;
pub mod space;
pub mod utils;
pub mod volume;
