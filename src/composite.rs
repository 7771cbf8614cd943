//! Compositing of located sample intervals.
//!
//! Samples of a hole are re-binned into either fixed-length bins or bins
//! bounded by caller-supplied domain contacts. Every measured field is
//! aggregated as a length-weighted average over the part of each sample that
//! falls inside the bin:
//!
//! ```text
//! value = Σ(vᵢ · overlapᵢ) / Σ(overlapᵢ)     for samples where vᵢ is present
//! ```
//!
//! Depth not covered by any sample carries no weight. A bin with no coverage
//! is still emitted, with every field missing.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ConfigError, HoleError};
use crate::locate::LocatedInterval;
use crate::models::{CompositeInterval, HoleId};
use crate::survey::Trajectory;

/// Overlaps shorter than this are treated as touching, not overlapping.
const OVERLAP_EPSILON: f64 = 1e-9;

/// Fraction of a bin length under which a trailing residual is absorbed
/// into the previous bin instead of becoming a sliver.
const RESIDUAL_EPSILON: f64 = 1e-9;

/// Upper bound on the bins produced for one hole.
pub const MAX_COMPOSITES_PER_HOLE: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum CompositingStrategy {
    /// Contiguous bins of `length` from the first sampled depth; the last
    /// bin is truncated at the last sampled depth.
    FixedLength { length: f64 },
    /// Bins between consecutive boundaries, clipped to the sampled range.
    DomainBounded { boundaries: Vec<f64> },
}

impl CompositingStrategy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            CompositingStrategy::FixedLength { length } => {
                if !length.is_finite() || *length <= 0.0 {
                    return Err(ConfigError::Invalid {
                        field: "composite_length".to_string(),
                        message: format!("must be a positive number, got {}", length),
                    });
                }
            }
            CompositingStrategy::DomainBounded { boundaries } => {
                if boundaries.len() < 2 {
                    return Err(ConfigError::Invalid {
                        field: "domain_boundaries".to_string(),
                        message: "at least two boundaries are required".to_string(),
                    });
                }
                if boundaries.iter().any(|b| !b.is_finite() || *b < 0.0) {
                    return Err(ConfigError::Invalid {
                        field: "domain_boundaries".to_string(),
                        message: "boundaries must be non-negative numbers".to_string(),
                    });
                }
                if boundaries.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(ConfigError::Invalid {
                        field: "domain_boundaries".to_string(),
                        message: "boundaries must be strictly increasing".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Bin edges over the sampled range `[start, end]`.
    ///
    /// Fails with [`HoleError::LimitExceeded`] when the range would need more
    /// than [`MAX_COMPOSITES_PER_HOLE`] bins.
    pub fn bins(&self, start: f64, end: f64) -> Result<Vec<(f64, f64)>, HoleError> {
        match self {
            CompositingStrategy::FixedLength { length } => {
                let count = ((end - start) / length - RESIDUAL_EPSILON).ceil().max(1.0);
                if !count.is_finite() || count > MAX_COMPOSITES_PER_HOLE as f64 {
                    return Err(HoleError::LimitExceeded {
                        what: format!("composite length {} over [{}, {}]", length, start, end),
                        requested: count,
                        limit: MAX_COMPOSITES_PER_HOLE,
                    });
                }
                let count = count as usize;
                Ok((0..count)
                    .map(|i| {
                        let from = start + i as f64 * length;
                        let to = if i + 1 == count {
                            end
                        } else {
                            start + (i + 1) as f64 * length
                        };
                        (from, to)
                    })
                    .collect())
            }
            CompositingStrategy::DomainBounded { boundaries } => Ok(boundaries
                .windows(2)
                .map(|w| (w[0].max(start), w[1].min(end)))
                .filter(|(from, to)| to - from > OVERLAP_EPSILON)
                .collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOptions {
    pub strategy: CompositingStrategy,
    /// Minimum covered fraction of a bin for its values to be reported.
    pub min_coverage: f64,
}

impl CompositeOptions {
    pub fn fixed_length(length: f64) -> Self {
        CompositeOptions {
            strategy: CompositingStrategy::FixedLength { length },
            min_coverage: 0.0,
        }
    }

    pub fn domain_bounded(boundaries: Vec<f64>) -> Self {
        CompositeOptions {
            strategy: CompositingStrategy::DomainBounded { boundaries },
            min_coverage: 0.0,
        }
    }
}

/// Composite the located intervals of one hole.
///
/// Fails with [`HoleError::EmptyInput`] when there is nothing to composite.
pub fn composite(
    hole_id: &HoleId,
    trajectory: &Trajectory,
    intervals: &[LocatedInterval<'_>],
    options: &CompositeOptions,
) -> Result<Vec<CompositeInterval>, HoleError> {
    if intervals.is_empty() {
        return Err(HoleError::EmptyInput);
    }

    let start = intervals
        .iter()
        .map(|i| i.from())
        .fold(f64::INFINITY, f64::min);
    let end = intervals
        .iter()
        .map(|i| i.to())
        .fold(f64::NEG_INFINITY, f64::max);

    let fields: BTreeSet<&str> = intervals
        .iter()
        .flat_map(|i| i.sample.values.keys().map(String::as_str))
        .collect();

    let bins = options.strategy.bins(start, end)?;

    let mut sorted: Vec<&LocatedInterval<'_>> = intervals.iter().collect();
    sorted.sort_by(|a, b| a.from().total_cmp(&b.from()));
    // running maximum of `to`, non-decreasing so it can be searched
    let reach: Vec<f64> = sorted
        .iter()
        .scan(f64::NEG_INFINITY, |max, i| {
            *max = max.max(i.to());
            Some(*max)
        })
        .collect();

    bins.into_iter()
        .map(|(from, to)| -> Result<CompositeInterval, HoleError> {
            let first = reach.partition_point(|&r| r <= from);
            let bin = aggregate_bin(&sorted[first..], &fields, from, to, options.min_coverage);
            Ok(CompositeInterval {
                hole_id: hole_id.clone(),
                from,
                to,
                values: bin.values,
                sample_count: bin.sample_count,
                covered_length: bin.covered_length,
                start: trajectory.point_at(from)?,
                end: trajectory.point_at(to)?,
                midpoint: trajectory.point_at((from + to) / 2.0)?,
            })
        })
        .collect()
}

struct BinAggregate {
    values: BTreeMap<String, Option<f64>>,
    sample_count: u32,
    covered_length: f64,
}

fn aggregate_bin(
    sorted: &[&LocatedInterval<'_>],
    fields: &BTreeSet<&str>,
    from: f64,
    to: f64,
    min_coverage: f64,
) -> BinAggregate {
    // (weighted sum, weight) per field
    let mut sums: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    let mut pieces: Vec<(f64, f64)> = Vec::new();

    for interval in sorted.iter().take_while(|i| i.from() < to) {
        let lo = interval.from().max(from);
        let hi = interval.to().min(to);
        let overlap = hi - lo;
        if overlap <= OVERLAP_EPSILON {
            continue;
        }
        pieces.push((lo, hi));
        for (field, measurement) in &interval.sample.values {
            if let Some(v) = measurement.value {
                let entry = sums.entry(field.as_str()).or_insert((0.0, 0.0));
                entry.0 += v * overlap;
                entry.1 += overlap;
            }
        }
    }

    let covered_length = union_length(&pieces);
    let coverage = covered_length / (to - from);
    let report = coverage > 0.0 && coverage + OVERLAP_EPSILON >= min_coverage;

    let values = fields
        .iter()
        .map(|field| {
            let value = match sums.get(field) {
                Some(&(weighted, weight)) if report && weight > 0.0 => Some(weighted / weight),
                _ => None,
            };
            (field.to_string(), value)
        })
        .collect();

    BinAggregate {
        values,
        sample_count: pieces.len() as u32,
        covered_length,
    }
}

/// Total length of the union of `pieces`, which are sorted by start.
fn union_length(pieces: &[(f64, f64)]) -> f64 {
    let mut total = 0.0;
    let mut current: Option<(f64, f64)> = None;
    for &(lo, hi) in pieces {
        current = match current {
            Some((c_lo, c_hi)) if lo <= c_hi => Some((c_lo, c_hi.max(hi))),
            Some((c_lo, c_hi)) => {
                total += c_hi - c_lo;
                Some((lo, hi))
            }
            None => Some((lo, hi)),
        };
    }
    if let Some((lo, hi)) = current {
        total += hi - lo;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_all;
    use crate::models::{Hole, Measurement, Point3, SampleInterval, SurveyStation};
    use crate::survey::{DesurveyMethod, DipConvention};

    fn trajectory(depth: f64) -> Trajectory {
        let hole = Hole::new(
            "DH-C",
            Point3::new(0.0, 0.0, 0.0),
            vec![SurveyStation::new(0.0, 0.0, -90.0)],
        )
        .with_total_depth(depth);
        Trajectory::resolve(&hole, DesurveyMethod::MinimumCurvature, DipConvention::NegativeDown)
            .unwrap()
    }

    fn sample(from: f64, to: f64, grade: Option<f64>) -> SampleInterval {
        SampleInterval::new("DH-C", from, to).with_value("grade", Measurement::new(grade, None))
    }

    fn run(samples: &[SampleInterval], options: &CompositeOptions) -> Vec<CompositeInterval> {
        let t = trajectory(100.0);
        let (located, failures) = locate_all(&t, samples);
        assert!(failures.is_empty());
        composite(&HoleId::from("DH-C"), &t, &located, options).unwrap()
    }

    #[test]
    fn test_single_interval_spanning_bin_is_unchanged() {
        let out = run(&[sample(0.0, 2.0, Some(3.7))], &CompositeOptions::fixed_length(2.0));

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].from, 0.0);
        assert_eq!(out[0].to, 2.0);
        assert_eq!(out[0].value("grade"), Some(3.7));
        assert_eq!(out[0].sample_count, 1);
    }

    #[test]
    fn test_overlapping_intervals_are_length_weighted() {
        let out = run(
            &[sample(0.0, 1.0, Some(10.0)), sample(0.5, 1.5, Some(20.0))],
            &CompositeOptions::fixed_length(1.0),
        );

        assert_eq!(out.len(), 2);
        let first = out[0].value("grade").unwrap();
        assert!((first - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(out[0].sample_count, 2);
        assert!((out[0].covered_length - 1.0).abs() < 1e-12);

        // residual bin [1, 1.5] only sees the second sample
        assert_eq!(out[1].from, 1.0);
        assert_eq!(out[1].to, 1.5);
        assert_eq!(out[1].value("grade"), Some(20.0));
    }

    #[test]
    fn test_gap_bin_is_emitted_with_missing_value() {
        let out = run(
            &[sample(0.0, 1.0, Some(1.0)), sample(2.0, 3.0, Some(3.0))],
            &CompositeOptions::fixed_length(1.0),
        );

        assert_eq!(out.len(), 3);
        assert_eq!(out[1].from, 1.0);
        assert_eq!(out[1].values.get("grade"), Some(&None));
        assert_eq!(out[1].sample_count, 0);
        assert_eq!(out[1].covered_length, 0.0);
    }

    #[test]
    fn test_partial_coverage_excludes_uncovered_depth() {
        let out = run(
            &[sample(0.0, 0.5, Some(4.0)), sample(1.0, 2.0, Some(1.0))],
            &CompositeOptions::fixed_length(2.0),
        );

        assert_eq!(out.len(), 1);
        let value = out[0].value("grade").unwrap();
        assert!((value - (4.0 * 0.5 + 1.0) / 1.5).abs() < 1e-12);
        assert!((out[0].covered_length - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_carry_no_weight() {
        let out = run(
            &[sample(0.0, 1.0, None), sample(1.0, 2.0, Some(5.0))],
            &CompositeOptions::fixed_length(2.0),
        );
        assert_eq!(out[0].value("grade"), Some(5.0));

        let out = run(
            &[sample(0.0, 1.0, None), sample(1.0, 2.0, None)],
            &CompositeOptions::fixed_length(2.0),
        );
        assert_eq!(out[0].values.get("grade"), Some(&None));
        assert_eq!(out[0].sample_count, 2);
    }

    #[test]
    fn test_fields_aggregate_independently() {
        let samples = vec![
            SampleInterval::new("DH-C", 0.0, 1.0)
                .with_value("au", Measurement::value(2.0))
                .with_value("cu", Measurement::value(0.1)),
            SampleInterval::new("DH-C", 1.0, 2.0).with_value("au", Measurement::value(4.0)),
        ];
        let out = run(&samples, &CompositeOptions::fixed_length(2.0));

        assert_eq!(out[0].value("au"), Some(3.0));
        assert_eq!(out[0].value("cu"), Some(0.1));
    }

    #[test]
    fn test_fixed_bins_cover_sampled_range() {
        let out = run(
            &[sample(3.0, 4.2, Some(1.0)), sample(4.2, 10.1, Some(2.0))],
            &CompositeOptions::fixed_length(1.5),
        );

        assert_eq!(out.first().unwrap().from, 3.0);
        assert_eq!(out.last().unwrap().to, 10.1);
        for pair in out.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
        assert!((out.last().unwrap().length() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_no_sliver_bin_from_rounding() {
        let strategy = CompositingStrategy::FixedLength { length: 0.1 };
        let bins = strategy.bins(0.0, 0.3).unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[2].1, 0.3);
    }

    #[test]
    fn test_bin_count_is_bounded() {
        let strategy = CompositingStrategy::FixedLength { length: 1e-300 };
        assert!(strategy.validate().is_ok());

        let err = strategy.bins(0.0, 100.0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_late_bins_skip_finished_samples() {
        let out = run(
            &[
                sample(0.0, 9.0, Some(1.0)),
                sample(1.0, 2.0, Some(5.0)),
                sample(9.0, 10.0, Some(3.0)),
            ],
            &CompositeOptions::fixed_length(1.0),
        );

        assert_eq!(out.len(), 10);
        // long first sample still reaches the bin after the short one ends
        assert_eq!(out[1].value("grade"), Some(3.0));
        assert_eq!(out[8].value("grade"), Some(1.0));
        assert_eq!(out[9].value("grade"), Some(3.0));
        assert_eq!(out[9].sample_count, 1);
    }

    #[test]
    fn test_domain_bounded_bins_clip_to_sampled_range() {
        let out = run(
            &[sample(2.0, 8.0, Some(1.0)), sample(8.0, 14.0, Some(3.0))],
            &CompositeOptions::domain_bounded(vec![0.0, 5.0, 11.0, 20.0, 30.0]),
        );

        let edges: Vec<(f64, f64)> = out.iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(edges, vec![(2.0, 5.0), (5.0, 11.0), (11.0, 14.0)]);
        assert_eq!(out[0].value("grade"), Some(1.0));
        assert_eq!(out[1].value("grade"), Some(2.0));
        assert_eq!(out[2].value("grade"), Some(3.0));
    }

    #[test]
    fn test_min_coverage_nulls_sparse_bins() {
        let mut options = CompositeOptions::fixed_length(2.0);
        options.min_coverage = 0.5;

        let out = run(
            &[sample(0.0, 0.5, Some(4.0)), sample(2.0, 4.0, Some(1.0))],
            &options,
        );

        assert_eq!(out[0].values.get("grade"), Some(&None));
        assert_eq!(out[0].sample_count, 1);
        assert_eq!(out[1].value("grade"), Some(1.0));
    }

    #[test]
    fn test_composites_carry_geometry() {
        let out = run(&[sample(0.0, 10.0, Some(1.0))], &CompositeOptions::fixed_length(5.0));

        assert!(out[1].start.distance(&Point3::new(0.0, 0.0, -5.0)) < 1e-9);
        assert!(out[1].end.distance(&Point3::new(0.0, 0.0, -10.0)) < 1e-9);
        assert!(out[1].midpoint.distance(&Point3::new(0.0, 0.0, -7.5)) < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let t = trajectory(10.0);
        let result = composite(
            &HoleId::from("DH-C"),
            &t,
            &[],
            &CompositeOptions::fixed_length(1.0),
        );
        assert_eq!(result, Err(HoleError::EmptyInput));
    }

    #[test]
    fn test_strategy_validation() {
        assert!(CompositingStrategy::FixedLength { length: 0.0 }.validate().is_err());
        assert!(CompositingStrategy::FixedLength { length: f64::NAN }
            .validate()
            .is_err());
        assert!(CompositingStrategy::DomainBounded {
            boundaries: vec![5.0]
        }
        .validate()
        .is_err());
        assert!(CompositingStrategy::DomainBounded {
            boundaries: vec![0.0, 5.0, 5.0]
        }
        .validate()
        .is_err());
        assert!(CompositingStrategy::DomainBounded {
            boundaries: vec![0.0, 5.0, 9.5]
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_union_length() {
        assert_eq!(union_length(&[]), 0.0);
        assert_eq!(union_length(&[(0.0, 1.0), (0.5, 1.5), (2.0, 3.0)]), 2.5);
    }
}
