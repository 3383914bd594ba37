//! End-to-end checks across the public API: draw an ROI, classify a data
//! set against it, accumulate statistics.

use float_eq::assert_float_eq;
use ndarray::Array5;
use std::collections::HashSet;
use std::f64::consts::FRAC_PI_2;

use amapola::analysis::analyze;
use amapola::dataset::DataSet;
use amapola::roi::{calculate_on_data_set, Isocontour, IsocontourRange, Kind, Roi};
use amapola::space::Space;
use amapola::{Point, Vector};

/// 16^3 unit-voxel data set: background 1.0, with a hot 6x6x6 block
/// (value 10.0) whose near corner sits at voxel (5, 5, 5).
fn hot_block_data_set() -> DataSet {
    let mut data = Array5::from_elem((1, 1, 16, 16, 16), 1.0);
    for z in 5..11 { for y in 5..11 { for x in 5..11 {
        data[[0, 0, z, y, x]] = 10.0;
    }}}
    DataSet::new(Space::new(), Vector::new(1.0, 1.0, 1.0), data)
}

#[test]
fn isocontour_roi_recovers_the_hot_block_statistics() {
    let ds = hot_block_data_set();
    let mut roi = Roi::new("hot", Kind::Isocontour3D);
    let params = Isocontour { min_value: 5.0, max_value: 0.0, range: IsocontourRange::AboveMin };
    assert!(roi.set_isocontour(&ds, 0, 0, [8, 8, 8], params));

    let stats = analyze(&roi, &ds, 0, 0, false).unwrap();
    // every selected voxel has value 10, whatever its boundary weight
    assert_float_eq!(stats.mean,   10.0, abs <= 1e-9);
    assert_float_eq!(stats.median, 10.0, abs <= 1e-9);
    assert_float_eq!(stats.min,    10.0, abs <= 1e-9);
    assert_float_eq!(stats.max,    10.0, abs <= 1e-9);
    // 6^3 block: 4^3 interior cells at weight 1, the shell at weight 0.5
    let interior = 4.0_f64.powi(3);
    let shell = 6.0_f64.powi(3) - interior;
    assert_float_eq!(stats.voxels, interior + 0.5 * shell, abs <= 1e-9);
}

#[test]
fn box_roi_over_the_block_matches_by_construction() {
    let ds = hot_block_data_set();
    let mut roi = Roi::new("block", Kind::Box);
    roi.volume_mut().space_mut().shift(Vector::new(5.0, 5.0, 5.0));
    roi.set_corner(Point::new(6.0, 6.0, 6.0));

    let stats = analyze(&roi, &ds, 0, 0, false).unwrap();
    assert_float_eq!(stats.mean, 10.0, abs <= 1e-9);
    assert_float_eq!(stats.voxels, 216.0, abs <= 1e-9);
    assert_float_eq!(stats.total, 2160.0, abs <= 1e-9);
    assert_float_eq!(stats.variance, 0.0, abs <= 1e-9);
}

#[test]
fn accurate_mode_sees_the_partially_covered_column() {
    let ds = hot_block_data_set();
    // cut through the block's voxel column at x = 8.4: voxel 8 is 40%
    // covered, its center (x = 8.5) is outside
    let mut roi = Roi::new("partial", Kind::Box);
    roi.volume_mut().space_mut().shift(Vector::new(5.0, 5.0, 5.0));
    roi.set_corner(Point::new(3.4, 6.0, 6.0));

    let fast = analyze(&roi, &ds, 0, 0, false).unwrap();
    let accurate = analyze(&roi, &ds, 0, 0, true).unwrap();
    // single-sample classification misses the cut column entirely
    assert_float_eq!(fast.voxels, 3.0 * 36.0, abs <= 1e-9);
    // 4 sub-samples per axis quantize the 0.4 overlap to 0.5
    assert_float_eq!(accurate.voxels, 3.5 * 36.0, abs <= 1e-9);
    assert_float_eq!(accurate.mean, 10.0, abs <= 1e-9);
}

#[test]
fn rotating_a_cube_about_its_center_changes_nothing() {
    let ds = hot_block_data_set();
    let selected = |roi: &Roi| {
        let mut inside = HashSet::new();
        calculate_on_data_set(roi, &ds, 0, 0, false, false, None, |i, _v, f| {
            if f > 0.0 { inside.insert(i); }
        });
        inside
    };

    let mut roi = Roi::new("cube", Kind::Box);
    roi.volume_mut().space_mut().shift(Vector::new(5.0, 5.0, 5.0));
    roi.set_corner(Point::new(6.0, 6.0, 6.0));
    let untouched = selected(&roi);

    let center = roi.volume().center();
    roi.volume_mut().space_mut().rotate_on_vector(Vector::z(), FRAC_PI_2, center);
    let rotated = selected(&roi);

    assert_eq!(untouched, rotated);
    assert_eq!(untouched.len(), 216);
}

#[test]
fn duplicating_and_editing_an_isocontour_leaves_the_original_intact() {
    let ds = hot_block_data_set();
    let mut roi = Roi::new("hot", Kind::Isocontour3D);
    let params = Isocontour { min_value: 5.0, max_value: 0.0, range: IsocontourRange::AboveMin };
    roi.set_isocontour(&ds, 0, 0, [8, 8, 8], params);

    let mut copy = roi.clone();
    let before = analyze(&roi, &ds, 0, 0, false).unwrap();
    // carve the whole block out of the copy
    for z in 5..11 { for y in 5..11 { for x in 5..11 {
        copy.paint([x, y, z], 0);
    }}}
    let after_copy = analyze(&copy, &ds, 0, 0, false).unwrap();
    let after_original = analyze(&roi, &ds, 0, 0, false).unwrap();

    assert_float_eq!(after_copy.voxels, 0.0, abs <= 1e-9);
    assert_float_eq!(after_original.voxels, before.voxels, abs <= 1e-9);
}
