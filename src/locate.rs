//! Placing down-hole sample intervals in 3D space.

use crate::error::HoleError;
use crate::models::{Point3, SampleInterval};
use crate::survey::Trajectory;

/// A sample interval with its resolved geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedInterval<'a> {
    pub sample: &'a SampleInterval,
    pub start: Point3,
    pub end: Point3,
    /// Point halfway along the hole between `start` and `end`
    pub midpoint: Point3,
}

impl LocatedInterval<'_> {
    pub fn from(&self) -> f64 {
        self.sample.from
    }

    pub fn to(&self) -> f64 {
        self.sample.to
    }

    pub fn length(&self) -> f64 {
        self.sample.length()
    }
}

/// An interval that could not be located, with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalFailure {
    pub index: usize,
    pub from: f64,
    pub to: f64,
    pub error: HoleError,
}

/// Locate one interval. Requires `from < to`, both inside the trajectory.
pub fn locate<'a>(
    trajectory: &Trajectory,
    sample: &'a SampleInterval,
) -> Result<LocatedInterval<'a>, HoleError> {
    let out_of_range = || HoleError::DepthOutOfRange {
        from: sample.from,
        to: sample.to,
        max_depth: trajectory.max_depth(),
    };
    if !(sample.from < sample.to)
        || !trajectory.contains(sample.from)
        || !trajectory.contains(sample.to)
    {
        return Err(out_of_range());
    }

    let start = trajectory.point_at(sample.from)?;
    let end = trajectory.point_at(sample.to)?;
    let midpoint = trajectory.point_at((sample.from + sample.to) / 2.0)?;
    Ok(LocatedInterval {
        sample,
        start,
        end,
        midpoint,
    })
}

/// Locate every interval of a hole. Failures are collected per interval and
/// never abort the others.
pub fn locate_all<'a>(
    trajectory: &Trajectory,
    samples: &'a [SampleInterval],
) -> (Vec<LocatedInterval<'a>>, Vec<IntervalFailure>) {
    let mut located = Vec::with_capacity(samples.len());
    let mut failures = Vec::new();
    for (index, sample) in samples.iter().enumerate() {
        match locate(trajectory, sample) {
            Ok(interval) => located.push(interval),
            Err(error) => failures.push(IntervalFailure {
                index,
                from: sample.from,
                to: sample.to,
                error,
            }),
        }
    }
    (located, failures)
}
