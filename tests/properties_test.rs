//! Property tests for desurveying, locating and compositing.

use drillhole_compute::{
    composite, locate, locate_all, CompositeOptions, DesurveyMethod, DipConvention, Hole,
    Measurement, Point3, SampleInterval, SurveyStation, Trajectory,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_method() -> impl Strategy<Value = DesurveyMethod> {
    prop_oneof![
        Just(DesurveyMethod::MinimumCurvature),
        Just(DesurveyMethod::BalancedTangent),
    ]
}

/// A hole with 1..6 stations at strictly increasing depths.
fn arb_hole() -> impl Strategy<Value = Hole> {
    prop::collection::vec((1.0f64..60.0, 0.0f64..360.0, -89.0f64..-10.0), 1..6).prop_map(
        |legs| {
            let mut depth = 0.0;
            let stations = legs
                .into_iter()
                .map(|(leg, azimuth, dip)| {
                    let station = SurveyStation::new(depth, azimuth, dip);
                    depth += leg;
                    station
                })
                .collect::<Vec<_>>();
            let total_depth = depth;
            Hole::new("DH-P", Point3::new(500.0, 500.0, 100.0), stations)
                .with_total_depth(total_depth)
        },
    )
}

/// Contiguous or gapped samples over `[0, depth)`.
fn arb_samples(depth: f64) -> impl Strategy<Value = Vec<SampleInterval>> {
    prop::collection::vec((0.2f64..5.0, 0.0f64..2.0, 0.0f64..100.0), 1..20).prop_map(
        move |parts| {
            let mut from = 0.0;
            let mut samples = Vec::new();
            for (length, gap, value) in parts {
                let to = (from + length).min(depth);
                if to - from <= 1e-6 {
                    break;
                }
                samples.push(
                    SampleInterval::new("DH-P", from, to)
                        .with_value("au", Measurement::value(value)),
                );
                from = to + gap;
            }
            samples
        },
    )
}

fn resolve(hole: &Hole, method: DesurveyMethod) -> Trajectory {
    Trajectory::resolve(hole, method, DipConvention::NegativeDown).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Neighbouring depths give neighbouring points, and no step is longer
    /// than the depth travelled.
    #[test]
    fn trajectory_is_continuous(hole in arb_hole(), method in arb_method()) {
        let trajectory = resolve(&hole, method);
        let max = trajectory.max_depth();
        let steps = 200;
        let mut previous = trajectory.point_at(0.0).unwrap();
        for i in 1..=steps {
            let depth = max * i as f64 / steps as f64;
            let point = trajectory.point_at(depth).unwrap();
            let travelled = max / steps as f64;
            prop_assert!(point.distance(&previous) <= travelled + 1e-6);
            previous = point;
        }
    }

    #[test]
    fn trajectory_starts_at_collar(hole in arb_hole(), method in arb_method()) {
        let trajectory = resolve(&hole, method);
        let start = trajectory.point_at(0.0).unwrap();
        prop_assert!(start.distance(&hole.collar) < 1e-9);
        prop_assert!(trajectory.point_at(trajectory.max_depth() + 1.0).is_err());
    }

    #[test]
    fn located_endpoints_match_trajectory(hole in arb_hole(), method in arb_method()) {
        let trajectory = resolve(&hole, method);
        let max = trajectory.max_depth();
        let (from, to) = (max * 0.25, max * 0.75);
        let sample = SampleInterval::new("DH-P", from, to);

        let located = locate(&trajectory, &sample).unwrap();

        prop_assert_eq!(located.start, trajectory.point_at(from).unwrap());
        prop_assert_eq!(located.end, trajectory.point_at(to).unwrap());
        prop_assert_eq!(located.midpoint, trajectory.point_at((from + to) / 2.0).unwrap());
    }

    /// Fixed-length bins tile the sampled range without gaps or overlaps.
    #[test]
    fn fixed_bins_tile_sampled_range(
        (hole, samples) in arb_hole().prop_flat_map(|h| {
            let depth = h.total_depth.unwrap_or(0.0);
            (Just(h), arb_samples(depth))
        }),
        length in 0.5f64..10.0,
    ) {
        prop_assume!(!samples.is_empty());
        let trajectory = resolve(&hole, DesurveyMethod::MinimumCurvature);
        let (located, failures) = locate_all(&trajectory, &samples);
        prop_assert!(failures.is_empty());

        let composites = composite(
            &hole.id,
            &trajectory,
            &located,
            &CompositeOptions::fixed_length(length),
        )
        .unwrap();

        let first = samples.first().unwrap().from;
        let last = samples.iter().map(|s| s.to).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((composites[0].from - first).abs() < 1e-9);
        prop_assert!((composites[composites.len() - 1].to - last).abs() < 1e-9);
        for pair in composites.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
        for c in &composites {
            prop_assert!(c.to > c.from);
            prop_assert!(c.length() <= length + 1e-6);
            prop_assert!(c.covered_length <= c.length() + 1e-9);
            if let Some(v) = c.value("au") {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    /// A contiguous run of equal-length samples composited at that length
    /// reproduces the samples.
    #[test]
    fn compositing_at_sample_length_is_identity(
        values in prop::collection::vec(0.0f64..50.0, 1..10),
        length in 0.5f64..4.0,
    ) {
        let depth = values.len() as f64 * length;
        let hole = Hole::new(
            "DH-P",
            Point3::new(0.0, 0.0, 0.0),
            vec![SurveyStation::new(0.0, 90.0, -60.0)],
        )
        .with_total_depth(depth);
        let trajectory = resolve(&hole, DesurveyMethod::MinimumCurvature);
        let samples: Vec<SampleInterval> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                SampleInterval::new("DH-P", i as f64 * length, (i + 1) as f64 * length)
                    .with_value("au", Measurement::value(v))
            })
            .collect();
        let (located, _) = locate_all(&trajectory, &samples);

        let composites = composite(
            &hole.id,
            &trajectory,
            &located,
            &CompositeOptions::fixed_length(length),
        )
        .unwrap();

        prop_assert_eq!(composites.len(), values.len());
        for (c, v) in composites.iter().zip(&values) {
            prop_assert!((c.value("au").unwrap() - v).abs() < 1e-9);
            prop_assert_eq!(c.sample_count, 1);
        }
    }
}
