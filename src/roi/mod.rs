//! Regions of interest.
//!
//! An ROI is a `Volume` specialized by a shape variant: three closed-form
//! shapes fully determined by the inherited far corner (the ellipsoid and
//! cylinder read it as twice their radii / their height, the box as its
//! extent), and four mask shapes carrying an explicit tri-state cell grid.
//! The variant set is closed; shape-specific behavior is dispatched by
//! matching, and an impossible variant at a dispatch point is a bug, not a
//! recoverable condition.

pub mod classify;
pub mod mask;
pub mod outline;

pub use classify::{calculate_on_data_set, calculate_with_granularity, GRANULARITY};
pub use mask::Mask;
pub use outline::{intersection_line, intersection_slice};

use ndarray::Array3;
use thiserror::Error;

use crate::dataset::DataSet;
use crate::index::Index3;
use crate::space::Axis;
use crate::types::{Point, Vector};
use crate::volume::Volume;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Ellipsoid,
    Cylinder,
    Box,
    Isocontour2D,
    Isocontour3D,
    Freehand2D,
    Freehand3D,
}

impl Kind {
    /// Mask kinds carry a voxel grid; the others are closed-form.
    pub fn is_mask(self) -> bool {
        use Kind::*;
        matches!(self, Isocontour2D | Isocontour3D | Freehand2D | Freehand3D)
    }
}

/// How an isocontour mask was thresholded from its source data. Kept for
/// provenance and redraw; classification never consults it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Isocontour {
    pub min_value: f64,
    pub max_value: f64,
    pub range: IsocontourRange,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IsocontourRange {
    #[default]
    AboveMin,
    BelowMax,
    BetweenMinMax,
}

impl Isocontour {
    pub fn contains(&self, value: f64) -> bool {
        match self.range {
            IsocontourRange::AboveMin      => value >= self.min_value,
            IsocontourRange::BelowMax      => value <= self.max_value,
            IsocontourRange::BetweenMinMax => value >= self.min_value && value <= self.max_value,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Shape {
    Ellipsoid,
    Cylinder,
    Box,
    Isocontour2D { mask: Mask, params: Isocontour },
    Isocontour3D { mask: Mask, params: Isocontour },
    Freehand2D { mask: Mask },
    Freehand3D { mask: Mask },
}

impl Shape {
    pub fn mask(&self) -> Option<&Mask> {
        use Shape::*;
        match self {
            Isocontour2D { mask, .. } | Isocontour3D { mask, .. }
            | Freehand2D { mask } | Freehand3D { mask } => Some(mask),
            Ellipsoid | Cylinder | Box => None,
        }
    }

    fn mask_mut(&mut self) -> Option<&mut Mask> {
        use Shape::*;
        match self {
            Isocontour2D { mask, .. } | Isocontour3D { mask, .. }
            | Freehand2D { mask } | Freehand3D { mask } => Some(mask),
            Ellipsoid | Cylinder | Box => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RoiError {
    #[error("cannot retype {from:?} ROI as {to:?}: the closed-form/mask family is fixed at creation")]
    KindMismatch { from: Kind, to: Kind },
    #[error("a 2-d mask ROI requires a single-plane mask, but this one has {nz} planes")]
    MaskNot2D { nz: usize },
}

/// A region of interest: a positioned box plus a shape variant.
///
/// Cloning duplicates the ROI without redrawing it; mask storage stays
/// shared between the copies until one of them is edited.
#[derive(Clone, Debug)]
pub struct Roi {
    name: String,
    volume: Volume,
    shape: Shape,
}

impl Roi {

    /// Create an empty (undrawn) ROI of the given kind.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        let unit = Vector::new(1.0, 1.0, 1.0);
        let shape = match kind {
            Kind::Ellipsoid    => Shape::Ellipsoid,
            Kind::Cylinder     => Shape::Cylinder,
            Kind::Box          => Shape::Box,
            Kind::Isocontour2D => Shape::Isocontour2D { mask: Mask::empty(unit), params: Isocontour::default() },
            Kind::Isocontour3D => Shape::Isocontour3D { mask: Mask::empty(unit), params: Isocontour::default() },
            Kind::Freehand2D   => Shape::Freehand2D { mask: Mask::empty(unit) },
            Kind::Freehand3D   => Shape::Freehand3D { mask: Mask::empty(unit) },
        };
        Roi { name: name.into(), volume: Volume::new(), shape }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn shape(&self) -> &Shape { &self.shape }
    pub fn volume(&self) -> &Volume { &self.volume }
    pub fn volume_mut(&mut self) -> &mut Volume { &mut self.volume }
    pub fn mask(&self) -> Option<&Mask> { self.shape.mask() }

    pub fn kind(&self) -> Kind {
        match self.shape {
            Shape::Ellipsoid          => Kind::Ellipsoid,
            Shape::Cylinder           => Kind::Cylinder,
            Shape::Box                => Kind::Box,
            Shape::Isocontour2D { .. } => Kind::Isocontour2D,
            Shape::Isocontour3D { .. } => Kind::Isocontour3D,
            Shape::Freehand2D { .. }   => Kind::Freehand2D,
            Shape::Freehand3D { .. }   => Kind::Freehand3D,
        }
    }

    /// An ROI is drawn once it describes an actual region: a non-empty box
    /// for closed-form kinds, a painted/thresholded mask for mask kinds.
    pub fn is_drawn(&self) -> bool { self.volume.is_valid() }

    pub fn isocontour_params(&self) -> Option<Isocontour> {
        match self.shape {
            Shape::Isocontour2D { params, .. } | Shape::Isocontour3D { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Retype within the same family. Crossing the closed-form/mask divide
    /// is refused: a mask cannot be conjured for a closed shape, nor a
    /// closed formula for a painted mask.
    pub fn set_kind(&mut self, kind: Kind) -> Result<bool, RoiError> {
        if kind == self.kind() { return Ok(false); }
        if kind.is_mask() != self.kind().is_mask() {
            return Err(RoiError::KindMismatch { from: self.kind(), to: kind });
        }
        if !kind.is_mask() {
            self.shape = match kind {
                Kind::Ellipsoid => Shape::Ellipsoid,
                Kind::Cylinder  => Shape::Cylinder,
                Kind::Box       => Shape::Box,
                _ => unreachable!(),
            };
            return Ok(true);
        }
        let nz = self.shape.mask().map(|m| m.dim()[2]).unwrap_or(0);
        if matches!(kind, Kind::Isocontour2D | Kind::Freehand2D) && nz > 1 {
            return Err(RoiError::MaskNot2D { nz });
        }
        let (mask, params) = match std::mem::replace(&mut self.shape, Shape::Box) {
            Shape::Isocontour2D { mask, params } | Shape::Isocontour3D { mask, params } => (mask, params),
            Shape::Freehand2D { mask } | Shape::Freehand3D { mask } => (mask, Isocontour::default()),
            _ => unreachable!("mask family invariant violated"),
        };
        self.shape = match kind {
            Kind::Isocontour2D => Shape::Isocontour2D { mask, params },
            Kind::Isocontour3D => Shape::Isocontour3D { mask, params },
            Kind::Freehand2D   => Shape::Freehand2D { mask },
            Kind::Freehand3D   => Shape::Freehand3D { mask },
            _ => unreachable!(),
        };
        Ok(true)
    }

    /// Set the extent of a closed-form ROI; a zero extent resets it to the
    /// undrawn state. The far corner of a mask ROI is derived from its mask
    /// and may not be set independently.
    pub fn set_corner(&mut self, corner: Point) -> bool {
        assert!(!self.kind().is_mask(),
                "the far corner of a mask ROI is derived from its mask");
        if corner == Point::origin() {
            return self.volume.invalidate();
        }
        self.volume.set_corner(corner)
    }

    /// Install a whole mask (freehand drawing, or deserialized cells).
    pub fn set_mask(&mut self, cells: Array3<u8>, voxel_size: Vector) -> bool {
        if matches!(self.kind(), Kind::Isocontour2D | Kind::Freehand2D) {
            let nz = cells.dim().0;
            assert!(nz <= 1, "2-d mask ROIs hold a single plane, got {nz}");
        }
        let mask = self.shape.mask_mut()
            .unwrap_or_else(|| panic!("set_mask called on a closed-form ROI"));
        *mask = Mask::new(cells, voxel_size);
        self.refresh_corner();
        true
    }

    /// Edit one mask cell. Triggers copy-on-write if the mask is shared
    /// with a duplicate.
    pub fn paint(&mut self, cell: Index3, value: u8) -> bool {
        let mask = self.shape.mask_mut()
            .unwrap_or_else(|| panic!("paint called on a closed-form ROI"));
        mask.paint(cell, value)
    }

    /// Resize the mask's cells; the far corner follows.
    pub fn set_mask_voxel_size(&mut self, voxel_size: Vector) -> bool {
        let mask = self.shape.mask_mut()
            .unwrap_or_else(|| panic!("set_mask_voxel_size called on a closed-form ROI"));
        let changed = mask.set_voxel_size(voxel_size);
        if changed && !mask.is_empty() {
            self.refresh_corner();
        }
        changed
    }

    /// Delete the mask, returning the ROI to the undrawn state.
    pub fn erase_mask(&mut self) -> bool {
        let voxel_size = match self.shape.mask() {
            Some(mask) => mask.voxel_size(),
            None => panic!("erase_mask called on a closed-form ROI"),
        };
        let mask = self.shape.mask_mut().unwrap();
        *mask = Mask::empty(voxel_size);
        self.volume.invalidate()
    }

    /// Center of the region in base coordinates: the mass-weighted mask
    /// centroid for mask shapes (lazily cached), the box midpoint otherwise.
    pub fn center(&self) -> Point {
        if let Some(mask) = self.shape.mask() {
            if let Some(com) = mask.center_of_mass() {
                return self.volume.space().s2b(com);
            }
        }
        self.volume.center()
    }

    /// Threshold an isocontour mask from `ds` by flood fill from `seed`.
    /// The fill is 6-connected (4-connected within the seed's plane for the
    /// 2-d variant) and iterative. Returns `false`, leaving the ROI
    /// untouched, if the seed itself fails the threshold.
    pub fn set_isocontour(&mut self,
                          ds: &DataSet,
                          frame: usize,
                          gate: usize,
                          seed: Index3,
                          params: Isocontour) -> bool {
        let two_d = match self.kind() {
            Kind::Isocontour2D => true,
            Kind::Isocontour3D => false,
            other => panic!("set_isocontour called on {other:?} ROI"),
        };
        let [nx, ny, nz] = ds.dim();
        assert!(frame < ds.num_frames() && gate < ds.num_gates(),
                "frame/gate ({frame}, {gate}) outside data set");
        assert!(seed[0] < nx && seed[1] < ny && seed[2] < nz,
                "seed {seed:?} outside data set dimensions");
        if !params.contains(ds.value(frame, gate, seed)) { return false; }

        let mz = if two_d { 1 } else { nz };
        let zof = |z: usize| if two_d { 0 } else { z };
        let mut cells = Array3::zeros((mz, ny, nx));

        // Fill the connected in-threshold region, with an explicit stack:
        // recursion depth would otherwise scale with the region size.
        let mut stack = vec![seed];
        cells[[zof(seed[2]), seed[1], seed[0]]] = mask::INSIDE;
        while let Some([x, y, z]) = stack.pop() {
            let neighbours = [
                (x.wrapping_sub(1), y, z), (x + 1, y, z),
                (x, y.wrapping_sub(1), z), (x, y + 1, z),
                (x, y, z.wrapping_sub(1)), (x, y, z + 1),
            ];
            let connectivity = if two_d { 4 } else { 6 };
            for &(cx, cy, cz) in neighbours.iter().take(connectivity) {
                // wrapping_sub turns 0-1 into a huge index, caught here
                if cx >= nx || cy >= ny || cz >= nz { continue; }
                if cells[[zof(cz), cy, cx]] != mask::OUTSIDE { continue; }
                if !params.contains(ds.value(frame, gate, [cx, cy, cz])) { continue; }
                cells[[zof(cz), cy, cx]] = mask::INSIDE;
                stack.push([cx, cy, cz]);
            }
        }

        // Demote filled cells that touch the outside (or the grid border)
        // to boundary cells.
        let filled = cells.clone();
        for ((k, j, i), &v) in filled.indexed_iter() {
            if v != mask::INSIDE { continue; }
            let pos  = [i, j, k];
            let dims = [nx, ny, mz];
            let axes = if two_d { 2 } else { 3 };
            let mut boundary = false;
            for axis in 0..axes {
                if pos[axis] == 0 || pos[axis] + 1 == dims[axis] {
                    boundary = true;
                    break;
                }
                let mut lo = pos; lo[axis] -= 1;
                let mut hi = pos; hi[axis] += 1;
                if filled[[lo[2], lo[1], lo[0]]] == mask::OUTSIDE
                    || filled[[hi[2], hi[1], hi[0]]] == mask::OUTSIDE {
                    boundary = true;
                    break;
                }
            }
            if boundary { cells[[k, j, i]] = mask::EDGE; }
        }

        // The mask inherits the data set's frame and cell size; the 2-d
        // variant sits on the seed's plane.
        let mut space = *ds.volume().space();
        if two_d {
            let plane_offset = seed[2] as f64 * ds.voxel_size().z;
            space.shift(space.axis(Axis::Z) * plane_offset);
        }
        *self.volume.space_mut() = space;
        match &mut self.shape {
            Shape::Isocontour2D { mask, params: p } | Shape::Isocontour3D { mask, params: p } => {
                *mask = Mask::new(cells, ds.voxel_size());
                *p = params;
            }
            _ => unreachable!(),
        }
        self.refresh_corner();
        true
    }

    /// Far corner of a mask ROI: always cell size times grid dimensions.
    fn refresh_corner(&mut self) {
        let mask = self.shape.mask().expect("only mask ROIs derive their corner");
        if mask.is_empty() {
            self.volume.invalidate();
        } else {
            let [nx, ny, nz] = mask.dim();
            let s = mask.voxel_size();
            self.volume.set_corner(Point::new(nx as f64 * s.x,
                                              ny as f64 * s.y,
                                              nz as f64 * s.z));
        }
    }
}
