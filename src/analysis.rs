//! Fraction-weighted statistics over the voxels an ROI selects.
//!
//! The classification engine hands over `(index, value, fraction)` per
//! voxel; this accumulator turns that stream into the usual quantitative
//! summary. Running sums feed a Welford-style incremental weighted
//! variance, divided by `sum_w - sum_w^2 / sum_w` for an unbiased weighted
//! estimator. The median needs the values kept around and sorted, which is
//! where large ROIs can exhaust memory; that allocation failure is
//! reported, not fatal, so the caller can retry at lower accuracy.

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::dataset::DataSet;
use crate::roi::{calculate_on_data_set, Roi};
use crate::types::{Intensity, Weight};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not grow the voxel accumulation buffer (holding {held} values)")]
    OutOfMemory { held: usize },
}

/// Summary statistics for one ROI over one (frame, gate) of a data set.
/// `voxels` is the fractional voxel count (the sum of overlap fractions),
/// `volume` that count times the voxel volume.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoiStats {
    pub voxels: f64,
    pub volume: f64,
    pub mean: Intensity,
    pub variance: Intensity,
    pub median: Intensity,
    pub min: Intensity,
    pub max: Intensity,
    pub total: Intensity,
}

#[derive(Default)]
struct Accumulator {
    sum_w: f64,
    sum_w2: f64,
    mean: f64,
    m2: f64,
    total: f64,
    min: Option<Intensity>,
    max: Option<Intensity>,
    values: Vec<(OrderedFloat<Intensity>, Weight)>,
}

impl Accumulator {

    fn push(&mut self, value: Intensity, weight: Weight) -> Result<(), AnalysisError> {
        if weight <= 0.0 { return Ok(()); }

        self.sum_w  += weight;
        self.sum_w2 += weight * weight;
        let delta = value - self.mean;
        self.mean += (weight / self.sum_w) * delta;
        self.m2 += weight * delta * (value - self.mean);
        self.total += weight * value;

        // min/max only consider voxels that are mostly inside; a sliver of
        // a hot neighbouring voxel should not become the ROI's maximum
        if weight >= 0.5 {
            self.min = Some(self.min.map_or(value, |m| m.min(value)));
            self.max = Some(self.max.map_or(value, |m| m.max(value)));
        }

        if self.values.len() == self.values.capacity() {
            let additional = self.values.len().max(64);
            self.values.try_reserve(additional)
                .map_err(|_| AnalysisError::OutOfMemory { held: self.values.len() })?;
        }
        self.values.push((OrderedFloat(value), weight));
        Ok(())
    }

    fn finish(mut self, voxel_volume: f64) -> RoiStats {
        if self.sum_w == 0.0 { return RoiStats::default(); }

        // weighted median: smallest value at which the cumulative weight
        // reaches half the total
        self.values.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let half = self.sum_w / 2.0;
        let mut cumulative = 0.0;
        let mut median = self.values.last().map_or(0.0, |(v, _)| v.into_inner());
        for &(value, weight) in &self.values {
            cumulative += weight;
            if cumulative >= half {
                median = value.into_inner();
                break;
            }
        }

        let denominator = self.sum_w - self.sum_w2 / self.sum_w;
        let variance = if denominator > 0.0 { self.m2 / denominator } else { 0.0 };

        RoiStats {
            voxels: self.sum_w,
            volume: self.sum_w * voxel_volume,
            mean: self.mean,
            variance,
            median,
            min: self.min.unwrap_or(0.0),
            max: self.max.unwrap_or(0.0),
            total: self.total,
        }
    }
}

/// Statistics for one ROI over one (frame, gate). An ROI that selects
/// nothing (undrawn, or disjoint from the data set) yields all-zero stats.
pub fn analyze(roi: &Roi,
               ds: &DataSet,
               frame: usize,
               gate: usize,
               accurate: bool) -> Result<RoiStats, AnalysisError> {
    let mut accumulator = Accumulator::default();
    let mut failure = None;
    calculate_on_data_set(roi, ds, frame, gate, false, accurate, None, |_index, value, fraction| {
        if failure.is_some() { return; }
        if let Err(e) = accumulator.push(value, fraction) {
            failure = Some(e);
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(accumulator.finish(ds.voxel_volume())),
    }
}

/// Statistics for every (frame, gate) of the data set, indexed
/// `[frame][gate]`.
///
/// `update` follows the progress convention: fraction < 0 means
/// indeterminate, > 1 means hide the indicator, and a `false` return
/// cancels the analysis — checked between whole-ROI classification calls,
/// never inside one. A cancelled run returns `Ok(None)`.
pub fn analyze_all(roi: &Roi,
                   ds: &DataSet,
                   accurate: bool,
                   update: &mut dyn FnMut(Option<&str>, f64) -> bool)
                   -> Result<Option<Vec<Vec<RoiStats>>>, AnalysisError> {
    let frames = ds.num_frames();
    let gates = ds.num_gates();
    let total = (frames * gates) as f64;

    let message = format!("analyzing '{}'", roi.name());
    let _ = update(Some(&message), -1.0);

    let mut out = Vec::with_capacity(frames);
    for frame in 0..frames {
        let mut row = Vec::with_capacity(gates);
        for gate in 0..gates {
            let done = (frame * gates + gate) as f64 / total;
            if !update(None, done) {
                let _ = update(None, 2.0);
                return Ok(None);
            }
            row.push(analyze(roi, ds, frame, gate, accurate)?);
        }
        out.push(row);
    }
    let _ = update(None, 2.0);
    Ok(Some(out))
}
