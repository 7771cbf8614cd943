//! Batch results.
//!
//! Every hole submitted to a batch appears exactly once in the report, in
//! input order, either with its composites or with the error that stopped it.

use std::collections::BTreeMap;

use crate::error::{ErrorKind, HoleError};
use crate::locate::IntervalFailure;
use crate::models::{CompositeInterval, HoleId};

#[derive(Debug, Clone, PartialEq)]
pub struct HoleSuccess {
    pub composites: Vec<CompositeInterval>,
    /// Intervals that could not be located and were left out of compositing
    pub skipped_intervals: Vec<IntervalFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoleFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&HoleError> for HoleFailure {
    fn from(err: &HoleError) -> Self {
        HoleFailure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoleOutcome {
    Success(HoleSuccess),
    Failure(HoleFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoleReport {
    pub hole_id: HoleId,
    pub outcome: HoleOutcome,
}

impl HoleReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, HoleOutcome::Success(_))
    }

    pub fn composites(&self) -> Option<&[CompositeInterval]> {
        match &self.outcome {
            HoleOutcome::Success(success) => Some(&success.composites),
            HoleOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&HoleFailure> {
        match &self.outcome {
            HoleOutcome::Success(_) => None,
            HoleOutcome::Failure(failure) => Some(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub holes: Vec<HoleReport>,
    /// Samples whose hole identifier matched no hole in the batch
    pub orphan_samples: usize,
}

impl BatchReport {
    pub fn new(holes: Vec<HoleReport>) -> Self {
        BatchReport {
            holes,
            orphan_samples: 0,
        }
    }

    /// First report entry for `hole_id`.
    pub fn get(&self, hole_id: &str) -> Option<&HoleReport> {
        self.holes.iter().find(|h| h.hole_id.0 == hole_id)
    }

    pub fn successes(&self) -> impl Iterator<Item = &HoleReport> {
        self.holes.iter().filter(|h| h.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &HoleReport> {
        self.holes.iter().filter(|h| !h.is_success())
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total_holes: self.holes.len(),
            orphan_samples: self.orphan_samples,
            ..Default::default()
        };
        for hole in &self.holes {
            match &hole.outcome {
                HoleOutcome::Success(success) => {
                    summary.succeeded += 1;
                    summary.composites += success.composites.len();
                    summary.skipped_intervals += success.skipped_intervals.len();
                }
                HoleOutcome::Failure(failure) => {
                    summary.failed += 1;
                    *summary.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
                }
            }
        }
        summary
    }
}

/// Aggregate counts over a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total_holes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub composites: usize,
    pub skipped_intervals: usize,
    pub orphan_samples: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
}
