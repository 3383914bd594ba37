//! Where an ROI crosses a display slice.
//!
//! This is the interactive-redraw path, separate from classification: it is
//! re-run on every pan/zoom, so it works at display-pixel resolution rather
//! than data-voxel resolution.
//!
//! Closed-form shapes produce an ordered boundary polyline: the slice's
//! pixel grid is classified with the shape predicate and the in/out
//! boundary is marched cell by cell, linking the crossing segments into a
//! curve. Mask shapes produce a resampled 2-d mask slice instead; the
//! renderer fills or outlines it as it sees fit.

use std::collections::HashMap;

use ndarray::Array2;

use crate::types::Point;
use crate::volume::Volume;

use super::classify::point_fraction;
use super::{Roi, Shape};

/// A pixel-grid edge carrying one boundary crossing: horizontal edges run
/// from node (i, j) to (i+1, j), vertical ones from (i, j) to (i, j+1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Edge {
    H(usize, usize),
    V(usize, usize),
}

impl Edge {
    /// Crossing position (edge midpoint) in slice-plane pixel units.
    fn midpoint(self) -> (f64, f64) {
        match self {
            Edge::H(i, j) => (i as f64 + 0.5, j as f64),
            Edge::V(i, j) => (i as f64, j as f64 + 0.5),
        }
    }
}

/// Ordered polyline (base-frame points) of a closed-form ROI's boundary
/// across the cutting volume `view`. Empty if the ROI is undrawn or misses
/// the slice. Mask-shaped ROIs have no boundary curve; asking for one is a
/// programming error.
pub fn intersection_line(roi: &Roi, view: &Volume, pixel_size: (f64, f64)) -> Vec<Point> {
    match roi.shape() {
        Shape::Ellipsoid | Shape::Cylinder | Shape::Box => (),
        other => panic!("intersection_line on a mask ROI variant: {other:?}"),
    }
    if !roi.is_drawn() || !view.is_valid() { return vec![]; }

    let (px, py) = pixel_size;
    assert!(px > 0.0 && py > 0.0, "pixel size must be positive");
    let corner = view.corner();
    let nx = (corner.x / px).ceil() as usize;
    let ny = (corner.y / py).ceil() as usize;
    if nx == 0 || ny == 0 { return vec![]; }

    // Classify the slice's pixel-grid nodes at mid-thickness.
    let fraction_of = point_fraction(roi);
    let mid_z = corner.z / 2.0;
    let to_roi = |x: f64, y: f64| {
        roi.volume().space().b2s(view.space().s2b(Point::new(x, y, mid_z)))
    };
    let mut inside = Array2::from_elem((ny + 1, nx + 1), false);
    for j in 0..=ny {
        for i in 0..=nx {
            inside[[j, i]] = fraction_of(to_roi(i as f64 * px, j as f64 * py)) > 0.0;
        }
    }

    // March the cells, emitting one or two crossing segments each.
    let mut segments: Vec<(Edge, Edge)> = vec![];
    for j in 0..ny {
        for i in 0..nx {
            let case = (inside[[j, i]] as u8)
                | (inside[[j, i + 1]] as u8) << 1
                | (inside[[j + 1, i + 1]] as u8) << 2
                | (inside[[j + 1, i]] as u8) << 3;
            let bottom = Edge::H(i, j);
            let top    = Edge::H(i, j + 1);
            let left   = Edge::V(i, j);
            let right  = Edge::V(i + 1, j);
            match case {
                0 | 15 => (),
                1  | 14 => segments.push((left, bottom)),
                2  | 13 => segments.push((bottom, right)),
                3  | 12 => segments.push((left, right)),
                4  | 11 => segments.push((right, top)),
                6  | 9  => segments.push((bottom, top)),
                7  | 8  => segments.push((left, top)),
                // the two ambiguous saddles: resolved as separate corners
                5  => { segments.push((left, bottom)); segments.push((right, top)); }
                10 => { segments.push((bottom, right)); segments.push((left, top)); }
                _  => unreachable!(),
            }
        }
    }
    if segments.is_empty() { return vec![]; }

    let path = link_segments(&segments);

    // Crossings back out to base coordinates.
    path.into_iter()
        .map(|edge| {
            let (i, j) = edge.midpoint();
            view.space().s2b(Point::new(i * px, j * py, mid_z))
        })
        .collect()
}

/// Chain crossing segments into the longest connected path. Starts from a
/// loose end if the curve is clipped by the slice border, otherwise walks
/// the loop and repeats the first crossing to close it.
fn link_segments(segments: &[(Edge, Edge)]) -> Vec<Edge> {
    let mut neighbours: HashMap<Edge, Vec<Edge>> = HashMap::new();
    for &(a, b) in segments {
        neighbours.entry(a).or_default().push(b);
        neighbours.entry(b).or_default().push(a);
    }

    let mut best: Vec<Edge> = vec![];
    let mut visited: HashMap<Edge, bool> = HashMap::new();
    let mut starts: Vec<Edge> = neighbours.iter()
        .filter(|(_, n)| n.len() == 1)
        .map(|(&e, _)| e)
        .collect();
    starts.extend(neighbours.keys().copied());

    for start in starts {
        if visited.get(&start).copied().unwrap_or(false) { continue; }
        let mut path = vec![start];
        visited.insert(start, true);
        let mut current = start;
        loop {
            let next = neighbours[&current].iter()
                .find(|&&e| !visited.get(&e).copied().unwrap_or(false))
                .copied();
            match next {
                Some(e) => {
                    visited.insert(e, true);
                    path.push(e);
                    current = e;
                }
                None => break,
            }
        }
        // a loop closes back onto its start
        if neighbours[&current].contains(&start) && path.len() > 2 {
            path.push(start);
        }
        if path.len() > best.len() { best = path; }
    }
    best
}

/// The mask of a mask-shaped ROI, resampled onto `view`'s pixel grid
/// (nearest neighbor, `[y, x]` layout). Sampling steps through the slice
/// thickness and keeps the strongest cell state per pixel. Closed-form
/// ROIs have no mask to resample; asking is a programming error.
pub fn intersection_slice(roi: &Roi, view: &Volume, pixel_size: (f64, f64)) -> Array2<u8> {
    let mask = match roi.shape().mask() {
        Some(mask) => mask,
        None => panic!("intersection_slice on a closed-form ROI variant: {:?}", roi.shape()),
    };
    if !roi.is_drawn() || !view.is_valid() { return Array2::zeros((0, 0)); }

    let (px, py) = pixel_size;
    assert!(px > 0.0 && py > 0.0, "pixel size must be positive");
    let corner = view.corner();
    let nx = (corner.x / px).ceil() as usize;
    let ny = (corner.y / py).ceil() as usize;

    let thickness = corner.z;
    // at most 16 sample planes through the slice thickness
    let z_samples = ((thickness / mask.voxel_size().z).round() as usize).clamp(1, 16);

    let mut out = Array2::zeros((ny, nx));
    for j in 0..ny {
        for i in 0..nx {
            let mut strongest = super::mask::OUTSIDE;
            for k in 0..z_samples {
                let p = Point::new((i as f64 + 0.5) * px,
                                   (j as f64 + 0.5) * py,
                                   (k as f64 + 0.5) * thickness / z_samples as f64);
                let v = mask.sample(roi.volume().space().b2s(view.space().s2b(p)));
                strongest = strongest.max(v);
            }
            out[[j, i]] = strongest;
        }
    }
    out
}
