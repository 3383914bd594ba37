//! Per-voxel classification of a data set against an ROI.
//!
//! For every voxel of the target data set that can geometrically overlap
//! the ROI, decide what fraction of it lies inside and hand
//! `(index, value, fraction)` to the caller's accumulator. Two modes:
//!
//! * *fast* — one sample per voxel (its center, converted into the ROI's
//!   frame): closed-form shapes yield 0 or 1, mask shapes 0, 0.5 or 1.
//!
//! * *accurate* — each voxel is subdivided `GRANULARITY` times per axis and
//!   the fraction is the proportion of sub-samples inside. 64x the
//!   predicate evaluations, but the fractions vary smoothly across the
//!   boundary, which quantitative statistics need.
//!
//! The voxel walk is restricted to the box where data set and ROI can
//! intersect, except under `inverse`, where the whole grid must be walked
//! and the fraction complemented.
//!
//! The sample point is advanced through the ROI's frame incrementally,
//! with the per-axis steps hoisted out of the loop: this function sits in
//! the innermost loop of every statistics pass, and transforming each voxel
//! center from scratch has a noticeable impact on performance.

use crate::dataset::DataSet;
use crate::index::Index3;
use crate::types::{Fraction, Intensity, Point, Vector};

use super::{mask, Roi, Shape};

/// Per-axis sub-voxel subdivision used by accurate mode.
pub const GRANULARITY: usize = 4;

/// Classify `ds`'s voxels against `roi`, invoking `each_voxel` per visited
/// voxel. Returns `false` without visiting anything if the ROI is undrawn
/// or cannot overlap the data set.
///
/// `progress` is polled once per z-slice with the completed fraction; the
/// walk itself always runs to completion (cancellation happens between
/// whole-ROI calls, by the caller).
#[allow(clippy::too_many_arguments)]
pub fn calculate_on_data_set(
    roi: &Roi,
    ds: &DataSet,
    frame: usize,
    gate: usize,
    inverse: bool,
    accurate: bool,
    progress: Option<&mut dyn FnMut(Option<&str>, f64) -> bool>,
    each_voxel: impl FnMut(Index3, Intensity, Fraction),
) -> bool {
    let granularity = if accurate { GRANULARITY } else { 1 };
    calculate_with_granularity(roi, ds, frame, gate, inverse, granularity, progress, each_voxel)
}

/// As `calculate_on_data_set`, with an explicit sub-voxel granularity
/// (1 = fast mode).
#[allow(clippy::too_many_arguments)]
pub fn calculate_with_granularity(
    roi: &Roi,
    ds: &DataSet,
    frame: usize,
    gate: usize,
    inverse: bool,
    granularity: usize,
    mut progress: Option<&mut dyn FnMut(Option<&str>, f64) -> bool>,
    mut each_voxel: impl FnMut(Index3, Intensity, Fraction),
) -> bool {
    assert!(granularity >= 1, "granularity must be at least 1");
    assert!(frame < ds.num_frames() && gate < ds.num_gates(),
            "frame/gate ({frame}, {gate}) outside data set");
    if !roi.is_drawn() { return false; }

    let [nx, ny, nz] = ds.dim();
    let vs = ds.voxel_size();

    // Voxel index bounds of the walk. The non-inverse walk only needs to
    // cover the box where the two volumes intersect, padded by one voxel so
    // that sub-samples of straddling voxels are not missed.
    let (lo, hi) = if inverse {
        ([0, 0, 0], [nx, ny, nz])
    } else {
        let Some((cmin, cmax)) = ds.volume().intersection_corners(roi.volume())
        else { return false };
        let pad_lo = |c: f64, s: f64| ((c / s).floor() as i64 - 1).max(0) as usize;
        let pad_hi = |c: f64, s: f64, n: usize| ((c / s).ceil() as i64 + 1).min(n as i64) as usize;
        ([pad_lo(cmin.x, vs.x), pad_lo(cmin.y, vs.y), pad_lo(cmin.z, vs.z)],
         [pad_hi(cmax.x, vs.x, nx), pad_hi(cmax.y, vs.y, ny), pad_hi(cmax.z, vs.z, nz)])
    };

    let fraction_of = point_fraction(roi);

    // Voxel centers mapped into the ROI's frame: both conversions are
    // affine, so one converted origin plus three step vectors cover the
    // whole grid exactly.
    let ds_space = ds.volume().space();
    let roi_space = roi.volume().space();
    let to_roi = |p: Point| roi_space.b2s(ds_space.s2b(p));
    let first = ds.voxel_center(lo);
    let p0 = to_roi(first);
    let step_x = to_roi(first + Vector::new(vs.x, 0.0, 0.0)) - p0;
    let step_y = to_roi(first + Vector::new(0.0, vs.y, 0.0)) - p0;
    let step_z = to_roi(first + Vector::new(0.0, 0.0, vs.z)) - p0;

    // Sub-sample positions within a voxel, as offsets from its center in
    // units of one voxel step.
    let offsets: Vec<f64> = (0..granularity)
        .map(|g| (g as f64 + 0.5) / granularity as f64 - 0.5)
        .collect();
    let samples_per_voxel = (granularity * granularity * granularity) as f64;

    let n_slices = (hi[2] - lo[2]).max(1);
    let mut p_z = p0;
    for (slice, iz) in (lo[2]..hi[2]).enumerate() {
        if let Some(ref mut report) = progress {
            let message = (slice == 0).then(|| format!("classifying '{}'", roi.name()));
            // the return value is deliberately not consulted: a started ROI
            // runs to completion (cancellation is the caller's, between ROIs)
            let _ = report(message.as_deref(), slice as f64 / n_slices as f64);
        }
        let mut p_y = p_z;
        for iy in lo[1]..hi[1] {
            let mut p = p_y;
            for ix in lo[0]..hi[0] {
                let fraction = if granularity == 1 {
                    fraction_of(p)
                } else {
                    let mut inside = 0.0;
                    for &oz in &offsets {
                        for &oy in &offsets {
                            for &ox in &offsets {
                                inside += fraction_of(p + step_x * ox + step_y * oy + step_z * oz);
                            }
                        }
                    }
                    inside / samples_per_voxel
                };
                let fraction = if inverse { 1.0 - fraction } else { fraction };
                each_voxel([ix, iy, iz], ds.value(frame, gate, [ix, iy, iz]), fraction);
                p += step_x;
            }
            p_y += step_y;
        }
        p_z += step_z;
    }
    if let Some(ref mut report) = progress {
        let _ = report(None, 1.0);
    }
    true
}

/// The point-in-shape fraction for a point in the ROI's own frame.
/// Dispatched once per classification, not per voxel.
pub(super) fn point_fraction(roi: &Roi) -> Box<dyn Fn(Point) -> Fraction> {
    let corner = roi.volume().corner();
    match roi.shape() {
        // corner = diameters; centered at corner/2
        Shape::Ellipsoid => {
            let r = corner.coords / 2.0;
            Box::new(move |p| {
                let dx = (p.x - r.x) / r.x;
                let dy = (p.y - r.y) / r.y;
                let dz = (p.z - r.z) / r.z;
                if dx * dx + dy * dy + dz * dz <= 1.0 { 1.0 } else { 0.0 }
            })
        }
        // elliptic cross-section in x/y, extruded along the frame's z
        Shape::Cylinder => {
            let r = corner.coords / 2.0;
            let height = corner.z;
            Box::new(move |p| {
                let dx = (p.x - r.x) / r.x;
                let dy = (p.y - r.y) / r.y;
                if dx * dx + dy * dy <= 1.0 && p.z >= 0.0 && p.z <= height { 1.0 } else { 0.0 }
            })
        }
        Shape::Box => Box::new(move |p| {
            if p.x >= 0.0 && p.x <= corner.x &&
               p.y >= 0.0 && p.y <= corner.y &&
               p.z >= 0.0 && p.z <= corner.z { 1.0 } else { 0.0 }
        }),
        shape => {
            let mask = shape.mask()
                .expect("closed-form shapes are handled above")
                .clone();
            Box::new(move |p| mask::weight_of(mask.sample(p)))
        }
    }
}
